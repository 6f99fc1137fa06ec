//! Unsolicited update pushes and their durable subscriptions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::Result;
use crate::wire::InboundFrame;

/// Subtype of an update push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
	/// Progress of a long-running server operation.
	LoadingProgress,
	/// A monitored object changed state.
	StatusChange,
}

/// Decoded content of an update frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateContent {
	/// Update subtype.
	pub kind: UpdateKind,
	/// Human-readable summary.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub message: String,
	/// Structured payload.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

impl UpdateContent {
	/// Encodes into an update frame.
	pub fn into_frame(self, code: u16) -> Result<InboundFrame> {
		Ok(InboundFrame::update(code, serde_json::to_string(&self)?))
	}
}

/// An update as handed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
	/// Update subtype.
	pub kind: UpdateKind,
	/// Status code of the frame.
	pub code: u16,
	/// Human-readable summary.
	pub message: String,
	/// Structured payload.
	pub data: Option<Value>,
}

impl Update {
	/// Decodes the content of an update frame.
	pub fn decode(frame: &InboundFrame) -> Result<Self> {
		let content: UpdateContent = serde_json::from_str(&frame.content)?;
		Ok(Self {
			kind: content.kind,
			code: frame.code,
			message: content.message,
			data: content.data,
		})
	}
}

/// Update subscriber.
pub type UpdateFn = Arc<dyn Fn(&Update) + Send + Sync>;

/// Routes updates to every subscriber of their kind.
///
/// Subscriptions last for the life of the router.
#[derive(Default)]
pub struct UpdateRouter {
	subscribers: RwLock<HashMap<UpdateKind, Vec<UpdateFn>>>,
}

impl fmt::Debug for UpdateRouter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let subscribers = self.subscribers.read();
		f.debug_map().entries(subscribers.iter().map(|(kind, subs)| (kind, subs.len()))).finish()
	}
}

impl UpdateRouter {
	/// Creates a router with no subscribers.
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribes `handler` to updates of `kind`.
	pub fn subscribe(&self, kind: UpdateKind, handler: impl Fn(&Update) + Send + Sync + 'static) {
		debug!(?kind, "update.subscribed");
		self.subscribers.write().entry(kind).or_default().push(Arc::new(handler));
	}

	/// Delivers `update` to its subscribers, in subscription order.
	///
	/// Returns the number of subscribers invoked.
	pub fn dispatch(&self, update: &Update) -> usize {
		let handlers = self.subscribers.read().get(&update.kind).cloned().unwrap_or_default();
		for handler in &handlers {
			handler(update);
		}
		handlers.len()
	}

	/// Returns the number of subscribers for `kind`.
	pub fn subscriber_count(&self, kind: UpdateKind) -> usize {
		self.subscribers.read().get(&kind).map_or(0, Vec::len)
	}
}
