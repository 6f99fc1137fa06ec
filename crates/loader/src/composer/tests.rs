use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::module::{Guard, InitError, Initializable, ModuleDescriptor};

fn plain(name: &str) -> ModuleDescriptor {
	let tag = name.to_string();
	ModuleDescriptor::new(name, move || Instance::plain(tag.clone()))
}

fn composer_with(descriptors: impl IntoIterator<Item = ModuleDescriptor>, page: PageContext) -> Composer {
	let registry = Arc::new(ModuleRegistry::new());
	for descriptor in descriptors {
		registry.register(descriptor).unwrap();
	}
	Composer::new(registry, page)
}

#[test]
fn composes_area_then_children() {
	let mut composer = composer_with([plain("admin"), plain("admin.users")], PageContext::new("/admin"));

	assert_eq!(composer.compose_str("admin").unwrap(), Composed::Attached);
	assert_eq!(composer.compose_str("admin.users").unwrap(), Composed::Attached);

	let users = composer.namespace().get_as::<String>(&ModulePath::nested("admin", "users"));
	assert_eq!(users.as_deref().map(String::as_str), Some("admin.users"));
}

#[test]
fn nested_before_area_fails_without_creating_area() {
	let mut composer = composer_with(
		[plain("home"), plain("admin"), plain("admin.users"), plain("admin.groups")],
		PageContext::new("/"),
	);

	let mut outcome = Ok(Composed::Attached);
	for path in ["home", "admin.users", "admin.groups"] {
		outcome = composer.compose_str(path);
		if outcome.is_err() {
			break;
		}
	}

	assert!(matches!(outcome, Err(LoadError::ParentNotComposed { ref area, ref key }) if area == "admin" && key == "users"));
	assert!(!composer.namespace().contains(&ModulePath::area("admin")));
	assert!(composer.namespace().contains(&ModulePath::area("home")));
}

#[test]
fn unknown_module_is_fatal() {
	let mut composer = composer_with(Vec::<ModuleDescriptor>::new(), PageContext::new("/"));
	assert!(matches!(composer.compose_str("ghost"), Err(LoadError::ModuleNotFound(name)) if name == "ghost"));
}

#[test]
fn failed_guard_attaches_vacant_node() {
	let admin = plain("admin").guarded(Guard::Role("admin".into()));
	let mut composer = composer_with([admin, plain("admin.users")], PageContext::new("/"));

	assert_eq!(composer.compose_str("admin").unwrap(), Composed::Vacant);
	assert!(composer.namespace().is_vacant(&ModulePath::area("admin")));

	// Children of a vacant area can still attach.
	assert_eq!(composer.compose_str("admin.users").unwrap(), Composed::Attached);
}

#[test]
fn passing_guard_constructs() {
	let admin = plain("admin").guarded(Guard::Role("admin".into()));
	let mut composer = composer_with([admin], PageContext::new("/").role("admin"));
	assert_eq!(composer.compose_str("admin").unwrap(), Composed::Attached);
}

struct Recorder {
	log: Arc<Mutex<Vec<String>>>,
	sibling: Option<ModulePath>,
}

impl Initializable for Recorder {
	fn init(&self, cx: &mut InitContext<'_>) -> Result<(), InitError> {
		let me = cx.get::<Recorder>(cx.path()).is_some();
		let sibling = self.sibling.as_ref().is_some_and(|p| cx.namespace().contains(p));
		self.log.lock().push(format!("{} self={me} sibling={sibling}", cx.path()));
		Ok(())
	}
}

#[test]
fn initializer_runs_once_after_attachment() {
	let log = Arc::new(Mutex::new(Vec::new()));
	let constructed = Arc::new(AtomicUsize::new(0));

	let home = {
		let log = Arc::clone(&log);
		let constructed = Arc::clone(&constructed);
		ModuleDescriptor::new("home", move || {
			constructed.fetch_add(1, Ordering::SeqCst);
			Instance::initializable(Recorder {
				log: Arc::clone(&log),
				sibling: None,
			})
		})
	};
	let hosts = {
		let log = Arc::clone(&log);
		ModuleDescriptor::new("hosts", move || {
			Instance::initializable(Recorder {
				log: Arc::clone(&log),
				sibling: Some(ModulePath::area("home")),
			})
		})
	};

	let mut composer = composer_with([home, hosts], PageContext::new("/"));
	composer.compose_str("home").unwrap();
	composer.compose_str("hosts").unwrap();

	assert_eq!(constructed.load(Ordering::SeqCst), 1);
	assert_eq!(*log.lock(), vec!["home self=true sibling=false", "hosts self=true sibling=true"]);
}

struct Reentrant;

impl Initializable for Reentrant {
	fn init(&self, cx: &mut InitContext<'_>) -> Result<(), InitError> {
		let path = cx.path().clone();
		cx.compose(&path)?;
		Ok(())
	}
}

#[test]
fn reentrant_compose_is_rejected() {
	let mut composer = composer_with([ModuleDescriptor::new("loop", || Instance::initializable(Reentrant))], PageContext::new("/"));

	let err = composer.compose_str("loop").unwrap_err();
	let LoadError::Init { path, source } = err else {
		panic!("expected an initializer failure");
	};
	assert_eq!(path, "loop");
	assert!(matches!(source.downcast_ref::<LoadError>(), Some(LoadError::ReentrantCompose(p)) if p == "loop"));
}

struct ComposesArea;

impl Initializable for ComposesArea {
	fn init(&self, cx: &mut InitContext<'_>) -> Result<(), InitError> {
		cx.compose(&ModulePath::area("admin"))?;
		Ok(())
	}
}

#[test]
fn child_cannot_recompose_its_area() {
	let mut composer = composer_with(
		[plain("admin"), ModuleDescriptor::new("admin.users", || Instance::initializable(ComposesArea))],
		PageContext::new("/"),
	);
	composer.compose_str("admin").unwrap();

	let err = composer.compose_str("admin.users").unwrap_err();
	let LoadError::Init { source, .. } = err else {
		panic!("expected an initializer failure");
	};
	assert!(matches!(source.downcast_ref::<LoadError>(), Some(LoadError::ReentrantCompose(p)) if p == "admin"));
	assert_eq!(composer.namespace().get_as::<String>(&ModulePath::area("admin")).as_deref().map(String::as_str), Some("admin"));
}

#[test]
fn failed_initializer_is_detached() {
	let mut composer = composer_with(
		[plain("admin"), ModuleDescriptor::new("admin.users", || Instance::initializable(NeedsService))],
		PageContext::new("/"),
	);
	composer.compose_str("admin").unwrap();

	assert!(matches!(composer.compose_str("admin.users"), Err(LoadError::Init { .. })));
	assert!(!composer.namespace().contains(&ModulePath::nested("admin", "users")));
	assert!(composer.namespace().contains(&ModulePath::area("admin")));
}

struct ComposesChild;

impl Initializable for ComposesChild {
	fn init(&self, cx: &mut InitContext<'_>) -> Result<(), InitError> {
		cx.compose(&ModulePath::nested("admin", "users"))?;
		Ok(())
	}
}

#[test]
fn initializer_may_compose_its_children() {
	let mut composer = composer_with(
		[ModuleDescriptor::new("admin", || Instance::initializable(ComposesChild)), plain("admin.users")],
		PageContext::new("/"),
	);

	composer.compose_str("admin").unwrap();
	assert!(composer.namespace().contains(&ModulePath::nested("admin", "users")));
}

struct NeedsService;

impl Initializable for NeedsService {
	fn init(&self, cx: &mut InitContext<'_>) -> Result<(), InitError> {
		let counter = cx.service::<AtomicUsize>().ok_or("counter service missing")?;
		counter.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

#[test]
fn initializers_reach_provided_services() {
	let counter = Arc::new(AtomicUsize::new(0));
	let mut composer = composer_with([ModuleDescriptor::new("svc", || Instance::initializable(NeedsService))], PageContext::new("/"));

	let err = composer.compose_str("svc").unwrap_err();
	assert!(matches!(err, LoadError::Init { .. }));
	assert!(composer.namespace().is_empty());

	composer.provide(Arc::clone(&counter));
	composer.compose_str("svc").unwrap();
	assert_eq!(counter.load(Ordering::SeqCst), 1);
}
