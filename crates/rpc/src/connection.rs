//! Connection seam between the transport client and a byte transport.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;
use crate::wire::{InboundFrame, OutboundFrame};

/// Lifecycle and data events produced by an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
	/// The peer accepted the connection.
	Connected,
	/// The connection closed.
	Disconnected {
		/// Why the connection closed.
		reason: String,
	},
	/// A transient transport error; the connection may still be usable.
	Error(String),
	/// The connection could not be established.
	ConnectFailed(String),
	/// A decoded inbound frame.
	Frame(InboundFrame),
}

/// An open connection: an outbound queue and an inbound event stream.
#[derive(Debug)]
pub struct Connection {
	/// Frames queued for the peer, written in order.
	pub outbound: mpsc::UnboundedSender<OutboundFrame>,
	/// Events from the peer.
	pub events: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl Connection {
	/// Creates a connection from its two halves.
	pub fn new(outbound: mpsc::UnboundedSender<OutboundFrame>, events: mpsc::UnboundedReceiver<ConnectionEvent>) -> Self {
		Self { outbound, events }
	}
}

/// Opens connections to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
	/// Opens a connection to `endpoint`.
	///
	/// # Errors
	///
	/// Returns [`Error::ConnectFailed`](crate::Error::ConnectFailed) when the
	/// endpoint cannot be reached.
	async fn open(&self, endpoint: &str) -> Result<Connection>;
}
