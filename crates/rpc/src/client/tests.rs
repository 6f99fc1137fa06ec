use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::memory::{MemoryConnector, MemoryPeer};

pub(crate) fn credentials() -> Credentials {
	Credentials {
		endpoint: "memory".into(),
		identity: "alice".into(),
		token: "t0k".into(),
		session: "s1".into(),
		group: "ops".into(),
	}
}

pub(crate) fn client() -> (TransportClient, MemoryPeer) {
	let (connector, peer) = MemoryConnector::pair();
	(TransportClient::new(credentials(), Arc::new(connector)), peer)
}

async fn wait_status(client: &TransportClient, want: ConnectionStatus) {
	let mut rx = client.subscribe_status();
	tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == want))
		.await
		.expect("status not reached")
		.expect("status channel closed");
}

#[tokio::test]
async fn connect_joins_room() {
	let (client, mut peer) = client();
	assert_eq!(client.status(), ConnectionStatus::Disconnected);

	let _frames = client.connect().await.unwrap();
	let join = peer.recv_outbound().await.unwrap();
	assert_eq!(join.kind, "join");
	assert_eq!(join.payload.get("room"), Some(&json!("alice:s1")));

	wait_status(&client, ConnectionStatus::Connected).await;
}

#[tokio::test]
async fn refused_connect_stays_disconnected() {
	let client = TransportClient::new(credentials(), Arc::new(MemoryConnector::refusing("no route")));

	let err = client.connect().await.unwrap_err();
	assert!(matches!(err, Error::ConnectFailed { reason, .. } if reason == "no route"));
	assert_eq!(client.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn emit_before_connect_fails() {
	let (client, _peer) = client();
	assert!(matches!(client.emit("submit", Map::new()), Err(Error::NotConnected)));
}

#[tokio::test]
async fn emit_merges_room_only_when_absent() {
	let (client, mut peer) = client();
	let _frames = client.connect().await.unwrap();
	peer.recv_outbound().await.unwrap();

	let mut payload = Map::new();
	payload.insert("room".into(), json!("broadcast"));
	client.emit("notice", payload).unwrap();
	client.emit("notice", Map::new()).unwrap();

	assert_eq!(peer.recv_outbound().await.unwrap().payload["room"], json!("broadcast"));
	assert_eq!(peer.recv_outbound().await.unwrap().payload["room"], json!("alice:s1"));
}

#[tokio::test]
async fn continuation_runs_after_enqueue() {
	let (client, mut peer) = client();
	let _frames = client.connect().await.unwrap();
	peer.recv_outbound().await.unwrap();

	let mut queued = None;
	client
		.emit_with("notice", Map::new(), || {
			queued = peer.try_recv_outbound().map(|frame| frame.kind);
		})
		.unwrap();
	assert_eq!(queued.as_deref(), Some("notice"));
}

#[tokio::test]
async fn frames_are_forwarded() {
	let (client, peer) = client();
	let mut frames = client.connect().await.unwrap();

	let frame = InboundFrame::response(200, "{}");
	peer.send_frame(frame.clone()).unwrap();
	assert_eq!(frames.recv().await, Some(frame));
}

#[tokio::test]
async fn disconnect_ends_stream() {
	let (client, peer) = client();
	let mut frames = client.connect().await.unwrap();
	wait_status(&client, ConnectionStatus::Connected).await;

	peer.error("hiccup").unwrap();
	peer.disconnect("server restart").unwrap();

	assert_eq!(frames.recv().await, None);
	assert_eq!(client.status(), ConnectionStatus::Disconnected);
	assert!(matches!(client.emit("submit", Map::new()), Err(Error::NotConnected)));
}
