use pretty_assertions::assert_eq;
use serde_json::json;
use trellis_loader::{LoadError, ModulePath, PageContext, ResourceDescriptor};
use trellis_rpc::{LogFeedback, MemoryConnector, MemoryPeer, OutboundFrame, ResponseContent};

use super::*;
use crate::modules::{ADMIN_ROLE, AdminUsers, Home, USERS_LIST_CALLBACK, USERS_REFRESH_METHOD};

fn config(page: PageContext) -> ShellConfig {
	let credentials = [("endpoint", "memory"), ("identity", "alice"), ("token", "t0k"), ("session", "s1"), ("group", "ops")]
		.into_iter()
		.map(|(k, v)| (k.to_string(), v.to_string()))
		.collect();
	ShellConfig {
		credentials,
		page,
		..ShellConfig::default()
	}
}

async fn start(config: &ShellConfig) -> (anyhow::Result<Session>, MemoryPeer) {
	let (connector, peer) = MemoryConnector::pair();
	let session = Session::start(config, Arc::new(connector), Arc::new(LogFeedback)).await;
	(session, peer)
}

fn callback_id(frame: &OutboundFrame) -> &str {
	frame.payload["callback"]["id"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn visitor_page_leaves_admin_vacant() {
	let (session, mut peer) = start(&config(PageContext::new("/"))).await;
	let session = session.unwrap();

	let ns = session.namespace();
	assert!(ns.contains(&ModulePath::area("home")));
	assert!(ns.is_vacant(&ModulePath::area("admin")));
	assert!(ns.is_vacant(&ModulePath::nested("admin", "users")));

	assert_eq!(peer.recv_outbound().await.unwrap().kind, "join");
	let summary = peer.recv_outbound().await.unwrap();
	assert_eq!(summary.payload["handler"], json!("dashboard.summary"));
	assert_eq!(summary.payload["callback"]["silent"], json!(true));
	assert!(peer.try_recv_outbound().is_none());

	let home = ns.get_as::<Home>(&ModulePath::area("home")).unwrap();
	peer.respond(200, ResponseContent::reply(callback_id(&summary), "").data(json!({"hosts": 3}))).unwrap();
	peer.disconnect("done").unwrap();

	session.run(CancellationToken::new()).await;
	assert_eq!(home.summary(), Some(json!({"hosts": 3})));
}

#[tokio::test]
async fn admin_page_lists_users() {
	let (session, mut peer) = start(&config(PageContext::new("/admin").role(ADMIN_ROLE))).await;
	let session = session.unwrap();

	let mut handlers = Vec::new();
	while let Some(frame) = peer.try_recv_outbound() {
		handlers.push(frame.payload.get("handler").cloned());
	}
	assert_eq!(handlers, [None, Some(json!("dashboard.summary")), Some(json!("users.list"))]);

	let users = session.namespace().get_as::<AdminUsers>(&ModulePath::nested("admin", "users")).unwrap();
	let list = json!([{"name": "alice"}, {"name": "bob"}]);
	peer.respond(200, ResponseContent::reply(USERS_LIST_CALLBACK, "2 users").data(list.clone())).unwrap();

	let correlator = session.correlator().clone();
	let shutdown = CancellationToken::new();
	let task = tokio::spawn(session.run(shutdown.clone()));

	let refresh = loop {
		if !correlator.is_outstanding(USERS_LIST_CALLBACK) {
			correlator.invoke_method(USERS_REFRESH_METHOD, &[]).unwrap();
			break peer.recv_outbound().await.unwrap();
		}
		tokio::task::yield_now().await;
	};
	assert_eq!(callback_id(&refresh), USERS_LIST_CALLBACK);
	assert_eq!(users.users(), list.as_array().unwrap().clone());

	shutdown.cancel();
	task.await.unwrap();
}

#[tokio::test]
async fn status_pushes_reach_home() {
	let (session, peer) = start(&config(PageContext::new("/"))).await;
	let session = session.unwrap();
	let home = session.namespace().get_as::<Home>(&ModulePath::area("home")).unwrap();

	let push = trellis_rpc::UpdateContent {
		kind: trellis_rpc::UpdateKind::StatusChange,
		message: String::new(),
		data: Some(json!({"host": "db1", "up": false})),
	};
	peer.send_frame(push.into_frame(200).unwrap()).unwrap();
	peer.disconnect("done").unwrap();

	session.run(CancellationToken::new()).await;
	assert_eq!(home.last_status(), Some(json!({"host": "db1", "up": false})));
}

#[tokio::test]
async fn missing_credentials_fail_before_connecting() {
	let mut config = config(PageContext::new("/"));
	config.credentials.remove("token");

	let (session, mut peer) = start(&config).await;
	assert!(session.is_err());
	assert!(peer.try_recv_outbound().is_none());
}

#[tokio::test]
async fn nested_interface_without_area_fails() {
	let mut config = config(PageContext::new("/admin").role(ADMIN_ROLE));
	config.resources = vec![ResourceDescriptor::new("home", "builtin:home"), ResourceDescriptor::new("admin.users", "builtin:admin.users")];
	config.interfaces = ["home", "admin.users", "admin.groups"].iter().map(|p| p.parse().unwrap()).collect();

	let (session, _peer) = start(&config).await;
	let err = session.err().unwrap();
	assert!(matches!(err.downcast_ref::<LoadError>(), Some(LoadError::ParentNotComposed { area, .. }) if area == "admin"));
}

#[tokio::test]
async fn unknown_locator_fails_bootstrap() {
	let mut config = config(PageContext::new("/"));
	config.resources.push(ResourceDescriptor::new("reports", "builtin:reports"));

	let (session, _peer) = start(&config).await;
	let err = session.err().unwrap();
	assert!(matches!(err.downcast_ref::<LoadError>(), Some(LoadError::ResourceFailed { name, .. }) if name == "reports"));
}
