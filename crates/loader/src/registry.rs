//! Process-wide table of module constructors.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::debug;

use crate::module::ModuleDescriptor;
use crate::{LoadError, Result};

/// Registry mapping unique module names to their descriptors.
///
/// Registration bumps a generation counter so that waiters can observe new
/// modules without polling. Thread-safe; share via `Arc<ModuleRegistry>`.
pub struct ModuleRegistry {
	modules: RwLock<HashMap<String, Arc<ModuleDescriptor>>>,
	generation: watch::Sender<u64>,
}

impl Default for ModuleRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl ModuleRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self {
			modules: RwLock::new(HashMap::new()),
			generation: watch::Sender::new(0),
		}
	}

	/// Registers a module.
	///
	/// # Errors
	///
	/// Returns [`LoadError::ModuleAlreadyRegistered`] if the name is taken; the
	/// existing registration is left untouched.
	pub fn register(&self, descriptor: ModuleDescriptor) -> Result<()> {
		{
			let mut modules = self.modules.write();
			if modules.contains_key(descriptor.name()) {
				return Err(LoadError::ModuleAlreadyRegistered(descriptor.name().to_string()));
			}
			debug!(module = descriptor.name(), "module.register");
			modules.insert(descriptor.name().to_string(), Arc::new(descriptor));
		}
		self.generation.send_modify(|g| *g += 1);
		Ok(())
	}

	/// Resolves a module by name.
	///
	/// # Errors
	///
	/// Returns [`LoadError::ModuleNotFound`] if nothing is registered under `name`.
	pub fn resolve(&self, name: &str) -> Result<Arc<ModuleDescriptor>> {
		self.modules
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| LoadError::ModuleNotFound(name.to_string()))
	}

	/// Returns true if `name` is registered.
	pub fn contains(&self, name: &str) -> bool {
		self.modules.read().contains_key(name)
	}

	/// Lists registered names, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<_> = self.modules.read().keys().cloned().collect();
		names.sort();
		names
	}

	/// Returns the number of registered modules.
	pub fn len(&self) -> usize {
		self.modules.read().len()
	}

	/// Returns true if nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.modules.read().is_empty()
	}

	/// Resolves once `name` is registered.
	pub async fn wait_for(&self, name: &str) {
		let mut generation = self.generation.subscribe();
		while !self.contains(name) {
			if generation.changed().await.is_err() {
				break;
			}
		}
	}
}

#[cfg(test)]
mod tests;
