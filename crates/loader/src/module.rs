//! Module descriptors and constructed instances.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::composer::InitContext;
use crate::page::PageContext;

/// Type-erased module instance stored in the namespace.
pub type ModuleObject = Arc<dyn Any + Send + Sync>;

/// Error reported by a module initializer.
pub type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Zero-argument module constructor.
pub type Constructor = Arc<dyn Fn() -> Instance + Send + Sync>;

/// Capability for modules that need a one-time initialization step.
///
/// The initializer runs synchronously right after the instance is attached, so
/// it can look itself up and reach siblings composed before it.
pub trait Initializable: Send + Sync {
	/// Runs the initializer.
	fn init(&self, cx: &mut InitContext<'_>) -> Result<(), InitError>;
}

/// Result of running a module constructor.
#[derive(Clone)]
pub enum Instance {
	/// An instance exposing an initializer.
	WithInit {
		/// The instance as stored in the namespace.
		object: ModuleObject,
		/// The same instance viewed through its initializer.
		init: Arc<dyn Initializable>,
	},
	/// An instance without an initializer.
	WithoutInit(ModuleObject),
}

impl Instance {
	/// Wraps a module without an initializer.
	pub fn plain<T: Any + Send + Sync>(value: T) -> Self {
		Self::WithoutInit(Arc::new(value))
	}

	/// Wraps a module whose [`Initializable::init`] runs after attachment.
	pub fn initializable<T: Initializable + Any>(value: T) -> Self {
		let value = Arc::new(value);
		Self::WithInit {
			object: value.clone(),
			init: value,
		}
	}

	/// Returns the instance as stored in the namespace.
	pub fn object(&self) -> &ModuleObject {
		match self {
			Self::WithInit { object, .. } | Self::WithoutInit(object) => object,
		}
	}
}

impl fmt::Debug for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::WithInit { .. } => f.write_str("Instance::WithInit"),
			Self::WithoutInit(_) => f.write_str("Instance::WithoutInit"),
		}
	}
}

/// Construction guard evaluated against the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
	/// Construct only when the page view equals the given name.
	View(String),
	/// Construct only when the page path equals the given path.
	Path(String),
	/// Construct only when the user holds the given role.
	Role(String),
}

impl Guard {
	/// Returns true if the module may be constructed on `page`.
	pub fn allows(&self, page: &PageContext) -> bool {
		match self {
			Self::View(view) => page.view.as_deref() == Some(view.as_str()),
			Self::Path(path) => page.path == *path,
			Self::Role(role) => page.has_role(role),
		}
	}
}

/// A named, registered module constructor.
#[derive(Clone)]
pub struct ModuleDescriptor {
	name: String,
	guard: Option<Guard>,
	constructor: Constructor,
}

impl ModuleDescriptor {
	/// Creates a descriptor for `name`.
	pub fn new(name: impl Into<String>, constructor: impl Fn() -> Instance + Send + Sync + 'static) -> Self {
		Self {
			name: name.into(),
			guard: None,
			constructor: Arc::new(constructor),
		}
	}

	/// Attaches a construction guard.
	pub fn guarded(mut self, guard: Guard) -> Self {
		self.guard = Some(guard);
		self
	}

	/// Returns the registered name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the construction guard, if any.
	pub fn guard(&self) -> Option<&Guard> {
		self.guard.as_ref()
	}

	/// Runs the constructor.
	pub fn construct(&self) -> Instance {
		(self.constructor)()
	}
}

impl fmt::Debug for ModuleDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModuleDescriptor")
			.field("name", &self.name)
			.field("guard", &self.guard)
			.finish_non_exhaustive()
	}
}
