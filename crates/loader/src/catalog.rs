//! Resources linked into the binary.
//!
//! Built-in resources are collected with `inventory`, so a crate only has to
//! declare them with [`builtin_resource!`](crate::builtin_resource) to make
//! them loadable through [`StaticLoader`].

use async_trait::async_trait;

use crate::injector::{ResourceDescriptor, ResourceLoader};
use crate::registry::ModuleRegistry;
use crate::{LoadError, Result};

/// Installs a built-in resource's module(s) into a registry.
pub type InstallFn = fn(&ModuleRegistry) -> Result<()>;

/// A built-in resource, addressed by locator.
pub struct ResourceReg {
	/// Locator the resource answers to (e.g. `builtin:home`).
	pub locator: &'static str,
	/// Registers the resource's module.
	pub install: InstallFn,
}
inventory::collect!(ResourceReg);

/// Finds a built-in resource by locator.
pub fn find_builtin(locator: &str) -> Option<&'static ResourceReg> {
	inventory::iter::<ResourceReg>().find(|reg| reg.locator == locator)
}

/// Loader for resources declared with [`builtin_resource!`](crate::builtin_resource).
///
/// A locator with no built-in resource behind it fails the load.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticLoader;

#[async_trait]
impl ResourceLoader for StaticLoader {
	async fn load(&self, resource: &ResourceDescriptor, registry: &ModuleRegistry) -> Result<()> {
		let reg = find_builtin(&resource.locator).ok_or_else(|| LoadError::ResourceFailed {
			name: resource.name.clone(),
			reason: format!("no built-in resource at {}", resource.locator),
		})?;
		(reg.install)(registry)
	}
}

/// Declares a built-in resource.
///
/// ```ignore
/// fn install(registry: &ModuleRegistry) -> trellis_loader::Result<()> {
///     registry.register(ModuleDescriptor::new("home", || Instance::plain(Home)))
/// }
/// trellis_loader::builtin_resource!("builtin:home", install);
/// ```
#[macro_export]
macro_rules! builtin_resource {
	($locator:expr, $install:path) => {
		$crate::__inventory::submit! {
			$crate::ResourceReg {
				locator: $locator,
				install: $install,
			}
		}
	};
}
