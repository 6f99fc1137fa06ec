//! Instantiates registered modules into the namespace.
//!
//! Composition is synchronous and total: [`Composer::compose`] resolves,
//! constructs, attaches and initializes one path before returning. Nested
//! paths require their area to be composed first; the area is never created
//! implicitly.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::module::{Instance, ModuleObject};
use crate::namespace::Namespace;
use crate::page::PageContext;
use crate::path::ModulePath;
use crate::registry::ModuleRegistry;
use crate::{LoadError, Result};

/// Outcome of composing one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composed {
	/// The module was constructed and attached.
	Attached,
	/// The module's guard rejected the page; a vacant node was attached.
	Vacant,
}

/// Builds the namespace from the module registry.
pub struct Composer {
	registry: Arc<ModuleRegistry>,
	namespace: Namespace,
	page: PageContext,
	services: HashMap<TypeId, ModuleObject>,
	/// Paths whose initializer is currently running.
	composing: Vec<ModulePath>,
}

impl Composer {
	/// Creates a composer over `registry` for `page`.
	pub fn new(registry: Arc<ModuleRegistry>, page: PageContext) -> Self {
		Self {
			registry,
			namespace: Namespace::new(),
			page,
			services: HashMap::new(),
			composing: Vec::new(),
		}
	}

	/// Makes a shared service available to initializers, keyed by its type.
	pub fn provide<T: Any + Send + Sync>(&mut self, service: Arc<T>) -> &mut Self {
		self.services.insert(TypeId::of::<T>(), service);
		self
	}

	/// Returns the composed namespace.
	pub fn namespace(&self) -> &Namespace {
		&self.namespace
	}

	/// Consumes the composer, returning the namespace.
	pub fn into_namespace(self) -> Namespace {
		self.namespace
	}

	/// Returns the page the composer was created for.
	pub fn page(&self) -> &PageContext {
		&self.page
	}

	/// Returns the registry modules are resolved from.
	pub fn registry(&self) -> &Arc<ModuleRegistry> {
		&self.registry
	}

	/// Composes the module registered under `path`.
	///
	/// # Errors
	///
	/// - [`LoadError::ReentrantCompose`] when `path`, or the area of a path, is
	///   still initializing.
	/// - [`LoadError::ModuleNotFound`] when nothing is registered under `path`.
	/// - [`LoadError::ParentNotComposed`] when `path` is nested and its area is missing.
	/// - [`LoadError::Init`] when the module's initializer fails. The module is
	///   detached again.
	pub fn compose(&mut self, path: &ModulePath) -> Result<Composed> {
		// Re-attaching an area would drop any child still initializing under it.
		let busy = self
			.composing
			.iter()
			.any(|busy| busy == path || (path.key().is_none() && busy.area_name() == path.area_name()));
		if busy {
			return Err(LoadError::ReentrantCompose(path.to_string()));
		}

		let descriptor = self.registry.resolve(&path.to_string())?;

		if let Some(parent) = path.parent()
			&& !self.namespace.contains(&parent)
		{
			return Err(LoadError::ParentNotComposed {
				area: parent.area_name().to_string(),
				key: path.key().unwrap_or_default().to_string(),
			});
		}

		if let Some(guard) = descriptor.guard()
			&& !guard.allows(&self.page)
		{
			debug!(%path, ?guard, "compose.skipped");
			self.namespace.attach(path, None)?;
			return Ok(Composed::Vacant);
		}

		let instance = descriptor.construct();
		self.namespace.attach(path, Some(instance.object().clone()))?;
		trace!(%path, "compose.attached");

		if let Instance::WithInit { init, .. } = instance {
			self.composing.push(path.clone());
			let result = init.init(&mut InitContext { composer: self, path });
			self.composing.pop();
			if let Err(source) = result {
				self.namespace.detach(path);
				debug!(%path, "compose.detached");
				return Err(LoadError::Init {
					path: path.to_string(),
					source,
				});
			}
		}

		debug!(%path, "compose.done");
		Ok(Composed::Attached)
	}

	/// Parses and composes a dotted path.
	///
	/// # Errors
	///
	/// [`LoadError::InvalidPath`] for malformed paths, otherwise as [`Composer::compose`].
	pub fn compose_str(&mut self, path: &str) -> Result<Composed> {
		self.compose(&path.parse()?)
	}
}

/// View of the composer handed to module initializers.
pub struct InitContext<'a> {
	composer: &'a mut Composer,
	path: &'a ModulePath,
}

impl InitContext<'_> {
	/// Path the initializing module was attached at.
	pub fn path(&self) -> &ModulePath {
		self.path
	}

	/// The namespace as composed so far, including the initializing module.
	pub fn namespace(&self) -> &Namespace {
		&self.composer.namespace
	}

	/// Page the namespace is being composed for.
	pub fn page(&self) -> &PageContext {
		&self.composer.page
	}

	/// Looks up a composed module by concrete type.
	pub fn get<T: Any + Send + Sync>(&self, path: &ModulePath) -> Option<Arc<T>> {
		self.composer.namespace.get_as(path)
	}

	/// Returns a service registered with [`Composer::provide`].
	pub fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		self.composer.services.get(&TypeId::of::<T>())?.clone().downcast::<T>().ok()
	}

	/// Composes another path from inside an initializer.
	///
	/// # Errors
	///
	/// As [`Composer::compose`]; composing a path that is still initializing,
	/// or the area of one, fails with [`LoadError::ReentrantCompose`].
	pub fn compose(&mut self, path: &ModulePath) -> Result<Composed> {
		self.composer.compose(path)
	}
}

#[cfg(test)]
mod tests;
