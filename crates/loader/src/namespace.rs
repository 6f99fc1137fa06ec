//! The composed object graph.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::module::ModuleObject;
use crate::path::ModulePath;
use crate::{LoadError, Result};

/// One top-level area and the keys nested under it.
#[derive(Default)]
struct AreaNode {
	/// `None` when the area's guard skipped construction.
	object: Option<ModuleObject>,
	children: HashMap<String, Option<ModuleObject>>,
}

/// Root of the composed module graph, addressed by [`ModulePath`].
#[derive(Default)]
pub struct Namespace {
	areas: HashMap<String, AreaNode>,
}

impl Namespace {
	/// Creates an empty namespace.
	pub fn new() -> Self {
		Self::default()
	}

	/// Attaches `object` at `path`. `None` attaches a vacant node.
	///
	/// Attaching an area replaces the whole area node, including anything
	/// nested under it.
	///
	/// # Errors
	///
	/// Returns [`LoadError::ParentNotComposed`] when a nested path is attached
	/// before its area.
	pub(crate) fn attach(&mut self, path: &ModulePath, object: Option<ModuleObject>) -> Result<()> {
		match path.key() {
			None => {
				let previous = self.areas.insert(path.area_name().to_string(), AreaNode {
					object,
					children: HashMap::new(),
				});
				if let Some(previous) = previous
					&& !previous.children.is_empty()
				{
					warn!(area = path.area_name(), dropped = previous.children.len(), "namespace.area_replaced");
				}
				Ok(())
			}
			Some(key) => {
				let area = self.areas.get_mut(path.area_name()).ok_or_else(|| LoadError::ParentNotComposed {
					area: path.area_name().to_string(),
					key: key.to_string(),
				})?;
				area.children.insert(key.to_string(), object);
				Ok(())
			}
		}
	}

	/// Removes the node at `path`. Removing an area removes its children.
	pub(crate) fn detach(&mut self, path: &ModulePath) {
		match path.key() {
			None => {
				self.areas.remove(path.area_name());
			}
			Some(key) => {
				if let Some(area) = self.areas.get_mut(path.area_name()) {
					area.children.remove(key);
				}
			}
		}
	}

	fn slot(&self, path: &ModulePath) -> Option<&Option<ModuleObject>> {
		let area = self.areas.get(path.area_name())?;
		match path.key() {
			None => Some(&area.object),
			Some(key) => area.children.get(key),
		}
	}

	/// Returns true if a node (possibly vacant) exists at `path`.
	pub fn contains(&self, path: &ModulePath) -> bool {
		self.slot(path).is_some()
	}

	/// Returns true if `path` exists but its guard skipped construction.
	pub fn is_vacant(&self, path: &ModulePath) -> bool {
		matches!(self.slot(path), Some(None))
	}

	/// Returns the instance at `path`.
	pub fn get(&self, path: &ModulePath) -> Option<&ModuleObject> {
		self.slot(path)?.as_ref()
	}

	/// Returns the instance at `path` as its concrete type.
	pub fn get_as<T: Any + Send + Sync>(&self, path: &ModulePath) -> Option<Arc<T>> {
		self.get(path)?.clone().downcast::<T>().ok()
	}

	/// Lists every attached path, areas before their children, sorted.
	pub fn paths(&self) -> Vec<ModulePath> {
		let mut areas: Vec<_> = self.areas.iter().collect();
		areas.sort_by(|a, b| a.0.cmp(b.0));

		let mut paths = Vec::new();
		for (name, node) in areas {
			paths.push(ModulePath::area(name.clone()));
			let mut keys: Vec<_> = node.children.keys().collect();
			keys.sort();
			paths.extend(keys.into_iter().map(|key| ModulePath::nested(name.clone(), key.clone())));
		}
		paths
	}

	/// Returns the number of attached nodes.
	pub fn len(&self) -> usize {
		self.areas.values().map(|area| 1 + area.children.len()).sum()
	}

	/// Returns true if nothing has been attached.
	pub fn is_empty(&self) -> bool {
		self.areas.is_empty()
	}
}
