//! Wire shapes exchanged with the server.
//!
//! Outbound frames are `{type, payload}` objects. Inbound frames carry a status
//! code and a JSON-encoded `content` string, decoded exactly once into
//! [`ResponseContent`] or [`UpdateContent`](crate::update::UpdateContent).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::feedback::Severity;
use crate::{Error, Result};

/// A frame sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
	/// Frame type (`join`, `submit`, ...).
	#[serde(rename = "type")]
	pub kind: String,
	/// Frame payload; always carries the sender's `room`.
	pub payload: Map<String, Value>,
}

/// Authentication block attached to every submitted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
	/// User identity.
	pub identity: String,
	/// Session token.
	pub token: String,
	/// User group.
	pub group: String,
}

/// Correlation block embedded in a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackDescriptor {
	/// Callback id the response will echo.
	pub id: String,
	/// Extra arguments handed back to the handler.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub args: Option<Value>,
	/// Suppress the notification for non-alarming outcomes.
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub silent: bool,
}

/// Payload of a `submit` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitPayload {
	/// Credentials of the caller.
	pub auth: Auth,
	/// Server-side handler (e.g. `user.create`).
	pub handler: String,
	/// Request data.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Map<String, Value>>,
	/// Correlation block.
	pub callback: CallbackDescriptor,
}

impl SubmitPayload {
	/// Converts the payload into the JSON object carried by an [`OutboundFrame`].
	pub fn into_map(self) -> Result<Map<String, Value>> {
		match serde_json::to_value(self)? {
			Value::Object(map) => Ok(map),
			other => Err(Error::Protocol(format!("submit payload encoded as {other}"))),
		}
	}
}

/// Kind of an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
	/// Reply to a submitted request.
	Response,
	/// Unsolicited push.
	Update,
}

/// A frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundFrame {
	/// Response or update.
	#[serde(rename = "type")]
	pub kind: FrameKind,
	/// HTTP-style status code.
	pub code: u16,
	/// JSON-encoded content.
	pub content: String,
}

impl InboundFrame {
	/// Builds a response frame with raw content.
	pub fn response(code: u16, content: impl Into<String>) -> Self {
		Self {
			kind: FrameKind::Response,
			code,
			content: content.into(),
		}
	}

	/// Builds an update frame with raw content.
	pub fn update(code: u16, content: impl Into<String>) -> Self {
		Self {
			kind: FrameKind::Update,
			code,
			content: content.into(),
		}
	}
}

/// Callback block echoed in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoedCallback {
	/// Callback id of the originating request.
	pub id: String,
	/// Whether the request was silent.
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub silent: bool,
}

/// Decoded content of a response frame.
///
/// `message` is always plain text; structured results belong in `data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseContent {
	/// Human-readable outcome.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub message: String,
	/// Structured result.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	/// Echoed correlation block.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub callback: Option<EchoedCallback>,
	/// Explicit classification, overriding the status code.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub level: Option<Severity>,
	/// Server-side failure that prevented a normal reply.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl ResponseContent {
	/// Content replying to callback `id` with `message`.
	pub fn reply(id: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			callback: Some(EchoedCallback {
				id: id.into(),
				silent: false,
			}),
			..Self::default()
		}
	}

	/// Attaches structured data.
	pub fn data(mut self, data: Value) -> Self {
		self.data = Some(data);
		self
	}

	/// Sets an explicit classification.
	pub fn level(mut self, level: Severity) -> Self {
		self.level = Some(level);
		self
	}

	/// Encodes into a response frame.
	pub fn into_frame(self, code: u16) -> Result<InboundFrame> {
		Ok(InboundFrame::response(code, serde_json::to_string(&self)?))
	}
}

/// Response as handed to callback handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
	/// Status code.
	pub code: u16,
	/// Outcome classification.
	pub severity: Severity,
	/// Human-readable outcome.
	pub message: String,
	/// Structured result.
	pub data: Option<Value>,
	/// Extra arguments supplied when the request was submitted.
	pub args: Option<Value>,
}

impl Reply {
	/// Returns true for success and informational outcomes.
	pub fn is_success(&self) -> bool {
		matches!(self.severity, Severity::Success | Severity::Info)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	#[test]
	fn submit_payload_omits_defaults() {
		let payload = SubmitPayload {
			auth: Auth {
				identity: "alice".into(),
				token: "t0k".into(),
				group: "ops".into(),
			},
			handler: "user.create".into(),
			data: None,
			callback: CallbackDescriptor {
				id: "cb1".into(),
				args: None,
				silent: false,
			},
		};

		assert_eq!(
			Value::Object(payload.into_map().unwrap()),
			json!({
				"auth": {"identity": "alice", "token": "t0k", "group": "ops"},
				"handler": "user.create",
				"callback": {"id": "cb1"},
			})
		);
	}

	#[test]
	fn inbound_frame_matches_wire_shape() {
		let frame: InboundFrame = serde_json::from_value(json!({
			"type": "response",
			"code": 200,
			"content": "{\"message\":\"ok\",\"callback\":{\"id\":\"cb1\"}}",
		}))
		.unwrap();

		assert_eq!(frame.kind, FrameKind::Response);
		let content: ResponseContent = serde_json::from_str(&frame.content).unwrap();
		assert_eq!(content, ResponseContent::reply("cb1", "ok"));
	}

	#[test]
	fn error_content_decodes() {
		let content: ResponseContent = serde_json::from_str(r#"{"error":"database unavailable"}"#).unwrap();
		assert_eq!(content.error.as_deref(), Some("database unavailable"));
		assert!(content.callback.is_none());
	}
}
