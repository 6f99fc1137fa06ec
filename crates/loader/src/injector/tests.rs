use std::collections::HashMap;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;
use crate::module::{Instance, ModuleDescriptor};

/// How the scripted loader treats a locator.
#[derive(Clone, Copy)]
pub(crate) enum Script {
	/// Register the module right away.
	Register,
	/// Register the module after a delay, from a detached task.
	RegisterAfter(Duration),
	/// Report success without ever registering.
	Silent,
	/// Report a load failure.
	Fail,
}

pub(crate) struct ScriptedLoader(pub(crate) HashMap<&'static str, Script>);

#[async_trait]
impl ResourceLoader for ScriptedLoader {
	async fn load(&self, resource: &ResourceDescriptor, registry: &ModuleRegistry) -> Result<()> {
		let name = resource.name.clone();
		let descriptor = move || ModuleDescriptor::new(name.clone(), || Instance::plain(()));
		match self.0.get(resource.locator.as_str()).copied() {
			Some(Script::Register) => registry.register(descriptor()),
			Some(Script::RegisterAfter(delay)) => {
				tokio::time::sleep(delay).await;
				registry.register(descriptor())
			}
			Some(Script::Silent) => Ok(()),
			Some(Script::Fail) | None => Err(LoadError::ResourceFailed {
				name: resource.name.clone(),
				reason: format!("cannot fetch {}", resource.locator),
			}),
		}
	}
}

pub(crate) fn injector(script: impl IntoIterator<Item = (&'static str, Script)>) -> ResourceInjector {
	ResourceInjector::new(Arc::new(ModuleRegistry::new()), Arc::new(ScriptedLoader(script.into_iter().collect())))
}

#[test]
fn filter_checks_path_and_role() {
	let filter = ResourceFilter {
		path_in: vec!["/admin".into()],
		requires_role: Some("admin".into()),
	};
	assert!(filter.admits(&PageContext::new("/admin").role("admin")));
	assert!(!filter.admits(&PageContext::new("/admin")));
	assert!(!filter.admits(&PageContext::new("/home").role("admin")));
	assert!(ResourceFilter::default().admits(&PageContext::new("/anything")));
}

#[tokio::test]
async fn injects_admitted_resources_once() {
	let mut injector = injector([("js/home", Script::Register), ("js/admin", Script::Register)]);
	let resources = [
		ResourceDescriptor::new("home", "js/home"),
		ResourceDescriptor::new("admin", "js/admin").filter(ResourceFilter {
			requires_role: Some("admin".into()),
			..ResourceFilter::default()
		}),
	];
	let page = PageContext::new("/");

	assert_eq!(injector.inject(&resources, &page), 1);
	assert_eq!(injector.inject(&resources, &page), 0);
	assert_eq!(injector.pending().len(), 1);
	assert_eq!(injector.pending()[0].name, "home");
}

#[tokio::test]
async fn completions_report_registration_and_failure() {
	let mut injector = injector([("ok", Script::Register), ("bad", Script::Fail)]);
	injector.inject(
		&[ResourceDescriptor::new("home", "ok"), ResourceDescriptor::new("hosts", "bad")],
		&PageContext::new("/"),
	);

	let mut results = HashMap::new();
	for (name, rx) in injector.take_completions() {
		results.insert(name, rx.await.unwrap());
	}

	assert!(results["home"].is_ok());
	assert!(matches!(&results["hosts"], Err(LoadError::ResourceFailed { name, .. }) if name == "hosts"));
	assert_eq!(injector.outstanding(), Vec::<String>::new());
	assert_eq!(injector.pending()[0].state, ResourceState::Registered);
	assert!(matches!(injector.pending()[1].state, ResourceState::Failed(_)));
}

#[tokio::test]
async fn silent_resource_stays_pending() {
	let mut injector = injector([("quiet", Script::Silent)]);
	injector.inject(&[ResourceDescriptor::new("quiet", "quiet")], &PageContext::new("/"));
	tokio::task::yield_now().await;

	assert_eq!(injector.outstanding(), vec!["quiet".to_string()]);
}

#[test]
fn descriptors_deserialize_with_optional_filter() {
	let parsed: Vec<ResourceDescriptor> = serde_json::from_str(
		r#"[
			{"name": "home", "locator": "builtin:home"},
			{"name": "admin", "locator": "builtin:admin", "filter": {"requires_role": "admin"}}
		]"#,
	)
	.unwrap();

	assert_eq!(parsed[0], ResourceDescriptor::new("home", "builtin:home"));
	assert_eq!(parsed[1].filter.as_ref().and_then(|f| f.requires_role.as_deref()), Some("admin"));
}
