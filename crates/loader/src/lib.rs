//! Module bootstrap for Trellis pages.
//!
//! A page is assembled in three stages:
//! * [`ResourceInjector`]: starts loading every admitted resource and tracks which
//!   ones have registered their module.
//! * [`BootstrapCoordinator`]: waits (bounded) until every injected resource has
//!   registered, then composes the top-level interfaces in order.
//! * [`Composer`]: instantiates registered modules into the shared [`Namespace`],
//!   enforcing that an area exists before anything is nested under it.
//!
//! All state lives in explicit context objects, so independent loaders can
//! coexist in one process (and in one test binary).

#![warn(missing_docs)]

pub mod bootstrap;
pub mod catalog;
pub mod composer;
pub mod error;
pub mod injector;
pub mod module;
pub mod namespace;
pub mod page;
pub mod path;
pub mod registry;

pub use bootstrap::{BootstrapConfig, BootstrapCoordinator};
pub use catalog::{ResourceReg, StaticLoader};
pub use composer::{Composed, Composer, InitContext};
pub use error::{LoadError, Result};
pub use injector::{PendingResource, ResourceDescriptor, ResourceFilter, ResourceInjector, ResourceLoader, ResourceState};
pub use module::{Constructor, Guard, InitError, Initializable, Instance, ModuleDescriptor, ModuleObject};
pub use namespace::Namespace;
pub use page::PageContext;
pub use path::ModulePath;
pub use registry::ModuleRegistry;

#[doc(hidden)]
pub use inventory as __inventory;
