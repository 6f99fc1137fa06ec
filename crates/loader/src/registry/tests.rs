use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;
use crate::module::Instance;

fn descriptor(name: &str, tag: &'static str) -> ModuleDescriptor {
	ModuleDescriptor::new(name, move || Instance::plain(tag))
}

#[test]
fn duplicate_registration_keeps_first() {
	let registry = ModuleRegistry::new();
	registry.register(descriptor("home", "first")).unwrap();

	let err = registry.register(descriptor("home", "second")).unwrap_err();
	assert!(matches!(err, LoadError::ModuleAlreadyRegistered(ref name) if name == "home"));

	let instance = registry.resolve("home").unwrap().construct();
	assert_eq!(instance.object().downcast_ref::<&str>(), Some(&"first"));
	assert_eq!(registry.len(), 1);
}

#[test]
fn resolve_missing_module_fails() {
	let registry = ModuleRegistry::new();
	assert!(matches!(registry.resolve("nope"), Err(LoadError::ModuleNotFound(name)) if name == "nope"));
}

#[test]
fn names_are_sorted() {
	let registry = ModuleRegistry::new();
	for name in ["hosts", "admin", "home"] {
		registry.register(descriptor(name, "x")).unwrap();
	}
	assert_eq!(registry.names(), vec!["admin", "home", "hosts"]);
}

#[tokio::test]
async fn wait_for_resolves_on_later_registration() {
	let registry = Arc::new(ModuleRegistry::new());
	let waiter = {
		let registry = Arc::clone(&registry);
		tokio::spawn(async move { registry.wait_for("late").await })
	};

	tokio::task::yield_now().await;
	assert!(!waiter.is_finished());

	registry.register(descriptor("other", "x")).unwrap();
	registry.register(descriptor("late", "x")).unwrap();

	tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
}

#[tokio::test]
async fn wait_for_returns_immediately_when_present() {
	let registry = ModuleRegistry::new();
	registry.register(descriptor("home", "x")).unwrap();
	registry.wait_for("home").await;
}
