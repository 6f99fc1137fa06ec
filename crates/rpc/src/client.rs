//! Transport client owning the single persistent connection.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::connection::{ConnectionEvent, Connector};
use crate::credentials::Credentials;
use crate::wire::{InboundFrame, OutboundFrame};
use crate::{Error, Result};

/// Connection status exposed to the rest of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
	/// No connection. Initial state, and the state after any disconnect.
	#[default]
	Disconnected,
	/// The connection is being opened.
	Connecting,
	/// The peer accepted the connection.
	Connected,
}

/// Owns exactly one connection and tags everything sent over it with the room.
///
/// Reconnection is not attempted; a dropped connection leaves the client
/// [`ConnectionStatus::Disconnected`].
pub struct TransportClient {
	credentials: Credentials,
	room: String,
	connector: Arc<dyn Connector>,
	outbound: Mutex<Option<mpsc::UnboundedSender<OutboundFrame>>>,
	status: Arc<watch::Sender<ConnectionStatus>>,
}

impl fmt::Debug for TransportClient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TransportClient")
			.field("endpoint", &self.credentials.endpoint)
			.field("room", &self.room)
			.field("status", &self.status())
			.finish_non_exhaustive()
	}
}

impl TransportClient {
	/// Creates a disconnected client.
	pub fn new(credentials: Credentials, connector: Arc<dyn Connector>) -> Self {
		let room = credentials.room();
		let (status, _) = watch::channel(ConnectionStatus::Disconnected);
		Self {
			credentials,
			room,
			connector,
			outbound: Mutex::new(None),
			status: Arc::new(status),
		}
	}

	/// Credentials the client was built from.
	pub fn credentials(&self) -> &Credentials {
		&self.credentials
	}

	/// Room every emitted payload is tagged with.
	pub fn room(&self) -> &str {
		&self.room
	}

	/// Current connection status.
	pub fn status(&self) -> ConnectionStatus {
		*self.status.borrow()
	}

	/// Subscribes to status changes.
	pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
		self.status.subscribe()
	}

	/// Opens the connection and joins the room.
	///
	/// Returns the stream of inbound frames. The stream ends when the
	/// connection closes.
	///
	/// # Errors
	///
	/// Returns [`Error::ConnectFailed`] if the connection cannot be opened.
	pub async fn connect(&self) -> Result<mpsc::UnboundedReceiver<InboundFrame>> {
		let endpoint = &self.credentials.endpoint;
		info!(%endpoint, room = %self.room, "transport.connecting");
		self.status.send_replace(ConnectionStatus::Connecting);

		let conn = match self.connector.open(endpoint).await {
			Ok(conn) => conn,
			Err(e) => {
				error!(%endpoint, error = %e, "transport.connect_failed");
				self.status.send_replace(ConnectionStatus::Disconnected);
				return Err(e);
			}
		};
		*self.outbound.lock() = Some(conn.outbound);
		self.emit("join", Map::new())?;

		let (frame_tx, frame_rx) = mpsc::unbounded_channel();
		tokio::spawn(pump_events(conn.events, self.status.clone(), frame_tx));
		Ok(frame_rx)
	}

	/// Sends `{type, payload}`, adding `room` to the payload when absent.
	///
	/// Returns once the frame is queued; delivery is not confirmed.
	///
	/// # Errors
	///
	/// Returns [`Error::NotConnected`] before [`connect`](Self::connect) or
	/// after a disconnect.
	pub fn emit(&self, kind: &str, mut payload: Map<String, Value>) -> Result<()> {
		if self.status() == ConnectionStatus::Disconnected {
			return Err(Error::NotConnected);
		}
		payload.entry("room").or_insert_with(|| Value::String(self.room.clone()));

		let outbound = self.outbound.lock();
		let tx = outbound.as_ref().ok_or(Error::NotConnected)?;
		tx.send(OutboundFrame { kind: kind.to_string(), payload }).map_err(|_| Error::ServiceStopped)?;
		debug!(kind, "transport.emitted");
		Ok(())
	}

	/// Like [`emit`](Self::emit), then runs `on_enqueued`.
	///
	/// The continuation runs once the frame is queued, not when the peer
	/// receives it, and is skipped if emitting fails.
	pub fn emit_with(&self, kind: &str, payload: Map<String, Value>, on_enqueued: impl FnOnce()) -> Result<()> {
		self.emit(kind, payload)?;
		on_enqueued();
		Ok(())
	}
}

/// Translates connection events into status changes and forwards frames.
async fn pump_events(
	mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
	status: Arc<watch::Sender<ConnectionStatus>>,
	frames: mpsc::UnboundedSender<InboundFrame>,
) {
	while let Some(event) = events.recv().await {
		match event {
			ConnectionEvent::Connected => {
				info!("transport.connected");
				status.send_replace(ConnectionStatus::Connected);
			}
			ConnectionEvent::Frame(frame) => {
				if frames.send(frame).is_err() {
					debug!("transport.frame_dropped");
				}
			}
			ConnectionEvent::Error(message) => warn!(error = %message, "transport.error"),
			ConnectionEvent::Disconnected { reason } => {
				warn!(%reason, "transport.disconnected");
				break;
			}
			ConnectionEvent::ConnectFailed(reason) => {
				error!(%reason, "transport.connect_failed");
				break;
			}
		}
	}
	status.send_replace(ConnectionStatus::Disconnected);
}

#[cfg(test)]
pub(crate) mod tests;
