//! Flat tables of response callbacks and user-triggered methods.
//!
//! Both tables are last-write-wins. Lookups of absent names are hard errors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::wire::Reply;
use crate::{Error, Result};

/// Handler invoked with a response.
pub type CallbackFn = Arc<dyn Fn(&Reply) + Send + Sync>;

/// Handler invoked for a user action.
pub type MethodFn = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// How long a callback entry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
	/// Removed after its first invocation. Used for inline handlers.
	Once,
	/// Kept until replaced or removed. Used for named callbacks.
	Durable,
}

#[derive(Clone)]
struct CallbackEntry {
	handler: CallbackFn,
	lifetime: Lifetime,
}

/// Registry of callbacks keyed by callback id and methods keyed by name.
///
/// Handlers are cloned out of the table before they run, so a handler may
/// register or remove entries without deadlocking.
#[derive(Default)]
pub struct CallbackRegistry {
	callbacks: RwLock<HashMap<String, CallbackEntry>>,
	methods: RwLock<HashMap<String, MethodFn>>,
}

impl fmt::Debug for CallbackRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CallbackRegistry")
			.field("callbacks", &self.callbacks.read().len())
			.field("methods", &self.methods.read().len())
			.finish()
	}
}

impl CallbackRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a durable callback under `id`, replacing any existing entry.
	///
	/// Returns true if an entry was replaced.
	pub fn register_callback(&self, id: impl Into<String>, handler: impl Fn(&Reply) + Send + Sync + 'static) -> bool {
		self.insert_callback(id.into(), Arc::new(handler), Lifetime::Durable)
	}

	/// Registers a callback removed after its first invocation.
	pub(crate) fn register_once(&self, id: impl Into<String>, handler: CallbackFn) -> bool {
		self.insert_callback(id.into(), handler, Lifetime::Once)
	}

	fn insert_callback(&self, id: String, handler: CallbackFn, lifetime: Lifetime) -> bool {
		debug!(%id, ?lifetime, "registry.callback_registered");
		self.callbacks.write().insert(id, CallbackEntry { handler, lifetime }).is_some()
	}

	/// Registers a method under `name`, replacing any existing one.
	///
	/// Returns true if a method was replaced.
	pub fn register_method(&self, name: impl Into<String>, handler: impl Fn(&[Value]) + Send + Sync + 'static) -> bool {
		let name = name.into();
		debug!(%name, "registry.method_registered");
		self.methods.write().insert(name, Arc::new(handler)).is_some()
	}

	/// Invokes the callback registered under `id` with `reply`.
	///
	/// # Errors
	///
	/// Returns [`Error::CallbackNotFound`] if no callback is registered.
	pub fn invoke_callback(&self, id: &str, reply: &Reply) -> Result<()> {
		let handler = {
			let mut callbacks = self.callbacks.write();
			let entry = callbacks.get(id).ok_or_else(|| Error::CallbackNotFound(id.to_string()))?;
			let handler = entry.handler.clone();
			if entry.lifetime == Lifetime::Once {
				callbacks.remove(id);
			}
			handler
		};
		handler(reply);
		Ok(())
	}

	/// Invokes the method registered under `name` with `args`.
	///
	/// # Errors
	///
	/// Returns [`Error::MethodNotFound`] if no method is registered.
	pub fn invoke_method(&self, name: &str, args: &[Value]) -> Result<()> {
		let handler = self.methods.read().get(name).cloned().ok_or_else(|| Error::MethodNotFound(name.to_string()))?;
		handler(args);
		Ok(())
	}

	/// Removes the callback under `id`. Returns true if one was removed.
	pub fn remove_callback(&self, id: &str) -> bool {
		self.callbacks.write().remove(id).is_some()
	}

	/// Returns true if a callback is registered under `id`.
	pub fn contains_callback(&self, id: &str) -> bool {
		self.callbacks.read().contains_key(id)
	}

	/// Returns the lifetime of the callback under `id`.
	pub fn callback_lifetime(&self, id: &str) -> Option<Lifetime> {
		self.callbacks.read().get(id).map(|entry| entry.lifetime)
	}

	/// Returns true if a method is registered under `name`.
	pub fn contains_method(&self, name: &str) -> bool {
		self.methods.read().contains_key(name)
	}
}
