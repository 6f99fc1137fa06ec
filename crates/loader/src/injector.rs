//! Resource injection and completion tracking.
//!
//! Injecting a resource starts its load immediately on the tokio runtime. Each
//! load resolves a completion channel once the loader finished *and* the
//! registry holds a module named after the resource, or fails it when the
//! loader reports an error. The [`BootstrapCoordinator`](crate::BootstrapCoordinator)
//! fans these completions in before composing anything.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::page::PageContext;
use crate::registry::ModuleRegistry;
use crate::{LoadError, Result};

/// An externally loaded unit expected to register one module under its name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceDescriptor {
	/// Resource name; also the module name it must register.
	pub name: String,
	/// Where the loader finds the resource.
	pub locator: String,
	/// Page conditions under which the resource is injected.
	#[serde(default)]
	pub filter: Option<ResourceFilter>,
}

impl ResourceDescriptor {
	/// Creates an unfiltered descriptor.
	pub fn new(name: impl Into<String>, locator: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			locator: locator.into(),
			filter: None,
		}
	}

	/// Restricts injection to pages admitted by `filter`.
	pub fn filter(mut self, filter: ResourceFilter) -> Self {
		self.filter = Some(filter);
		self
	}
}

/// Page conditions for injecting a resource. Empty conditions admit every page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResourceFilter {
	/// Only inject on one of these page paths.
	#[serde(default)]
	pub path_in: Vec<String>,
	/// Only inject when the user holds this role.
	#[serde(default)]
	pub requires_role: Option<String>,
}

impl ResourceFilter {
	/// Returns true if the resource should be injected on `page`.
	pub fn admits(&self, page: &PageContext) -> bool {
		let path_ok = self.path_in.is_empty() || self.path_in.iter().any(|p| *p == page.path);
		let role_ok = self.requires_role.as_deref().is_none_or(|role| page.has_role(role));
		path_ok && role_ok
	}
}

/// Load state of an injected resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
	/// Loading, or loaded but not yet registered.
	Pending,
	/// The resource's module is in the registry.
	Registered,
	/// The loader reported a failure.
	Failed(String),
}

/// Snapshot of one injected resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResource {
	/// Resource name.
	pub name: String,
	/// Current state.
	pub state: ResourceState,
}

/// Executes resources so they can register their modules.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
	/// Loads `resource`. A successful load is expected to register (now or
	/// later) a module named `resource.name` in `registry`.
	async fn load(&self, resource: &ResourceDescriptor, registry: &ModuleRegistry) -> Result<()>;
}

type Completion = (String, oneshot::Receiver<Result<()>>);

/// Starts resource loads and tracks their completion.
pub struct ResourceInjector {
	registry: Arc<ModuleRegistry>,
	loader: Arc<dyn ResourceLoader>,
	resources: Arc<Mutex<Vec<PendingResource>>>,
	completions: Vec<Completion>,
}

impl ResourceInjector {
	/// Creates an injector that loads into `registry` through `loader`.
	pub fn new(registry: Arc<ModuleRegistry>, loader: Arc<dyn ResourceLoader>) -> Self {
		Self {
			registry,
			loader,
			resources: Arc::new(Mutex::new(Vec::new())),
			completions: Vec::new(),
		}
	}

	/// Returns the registry resources load into.
	pub fn registry(&self) -> &Arc<ModuleRegistry> {
		&self.registry
	}

	/// Injects every resource admitted on `page`, returning how many loads started.
	///
	/// Resources that are already tracked are not injected twice.
	///
	/// # Panics
	///
	/// Panics if called outside a tokio runtime.
	pub fn inject(&mut self, resources: &[ResourceDescriptor], page: &PageContext) -> usize {
		let mut started = 0;
		for resource in resources {
			if let Some(filter) = &resource.filter
				&& !filter.admits(page)
			{
				debug!(resource = %resource.name, page = %page.path, "inject.filtered");
				continue;
			}

			{
				let mut tracked = self.resources.lock();
				if tracked.iter().any(|r| r.name == resource.name) {
					continue;
				}
				tracked.push(PendingResource {
					name: resource.name.clone(),
					state: ResourceState::Pending,
				});
			}

			let (tx, rx) = oneshot::channel();
			self.completions.push((resource.name.clone(), rx));
			tokio::spawn(load_resource(
				resource.clone(),
				Arc::clone(&self.registry),
				Arc::clone(&self.loader),
				Arc::clone(&self.resources),
				tx,
			));
			debug!(resource = %resource.name, locator = %resource.locator, "inject.started");
			started += 1;
		}
		started
	}

	/// Returns a snapshot of every injected resource, in injection order.
	pub fn pending(&self) -> Vec<PendingResource> {
		self.resources.lock().clone()
	}

	/// Names of resources that have not registered or failed yet.
	pub fn outstanding(&self) -> Vec<String> {
		self.resources
			.lock()
			.iter()
			.filter(|r| r.state == ResourceState::Pending)
			.map(|r| r.name.clone())
			.collect()
	}

	pub(crate) fn take_completions(&mut self) -> Vec<Completion> {
		std::mem::take(&mut self.completions)
	}
}

async fn load_resource(
	resource: ResourceDescriptor,
	registry: Arc<ModuleRegistry>,
	loader: Arc<dyn ResourceLoader>,
	resources: Arc<Mutex<Vec<PendingResource>>>,
	done: oneshot::Sender<Result<()>>,
) {
	let result = match loader.load(&resource, &registry).await {
		Ok(()) => {
			registry.wait_for(&resource.name).await;
			Ok(())
		}
		Err(err @ (LoadError::ResourceFailed { .. } | LoadError::ModuleAlreadyRegistered(_) | LoadError::ModuleNotFound(_))) => Err(err),
		Err(err) => Err(LoadError::ResourceFailed {
			name: resource.name.clone(),
			reason: err.to_string(),
		}),
	};

	let state = match &result {
		Ok(()) => ResourceState::Registered,
		Err(err) => {
			warn!(resource = %resource.name, error = %err, "inject.failed");
			ResourceState::Failed(err.to_string())
		}
	};
	if let Some(entry) = resources.lock().iter_mut().find(|r| r.name == resource.name) {
		entry.state = state;
	}
	let _ = done.send(result);
}

#[cfg(test)]
pub(crate) mod tests;
