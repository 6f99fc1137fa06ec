//! Error types for module loading and namespace composition.

use thiserror::Error;

use crate::module::InitError;

/// A convenient type alias for `Result` with `E` = [`LoadError`].
pub type Result<T, E = LoadError> = std::result::Result<T, E>;

/// Errors raised while loading resources or composing the namespace.
///
/// Every variant except [`LoadError::Init`] describes a wiring mistake and is
/// never recovered from locally.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
	/// A module name was registered twice.
	#[error("module already registered: {0}")]
	ModuleAlreadyRegistered(String),

	/// No module is registered under the requested name.
	#[error("module not found: {0}")]
	ModuleNotFound(String),

	/// A namespace path could not be parsed.
	#[error("invalid module path: {0:?}")]
	InvalidPath(String),

	/// A nested path was composed before its area.
	#[error("cannot attach {area}.{key}: area {area:?} has not been composed")]
	ParentNotComposed {
		/// Area segment that is missing from the namespace.
		area: String,
		/// Nested key that was being attached.
		key: String,
	},

	/// An initializer tried to compose a path that is still initializing, or
	/// the area of one.
	#[error("re-entrant composition of {0}")]
	ReentrantCompose(String),

	/// A module initializer failed.
	#[error("initializer for {path} failed: {source}")]
	Init {
		/// Path of the module whose initializer failed.
		path: String,
		/// Error reported by the initializer.
		#[source]
		source: InitError,
	},

	/// A resource failed to load.
	#[error("resource {name} failed to load: {reason}")]
	ResourceFailed {
		/// Resource name.
		name: String,
		/// Loader-supplied reason.
		reason: String,
	},

	/// Bootstrap gave up waiting for resources to register.
	#[error("bootstrap timed out after {waited_ms}ms; never registered: {}", .missing.join(", "))]
	BootstrapTimeout {
		/// Resources still pending when the timeout fired.
		missing: Vec<String>,
		/// Configured timeout in milliseconds.
		waited_ms: u64,
	},
}
