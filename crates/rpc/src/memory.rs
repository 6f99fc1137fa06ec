//! In-process connector for tests and demos.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::connection::{Connection, ConnectionEvent, Connector};
use crate::wire::{InboundFrame, OutboundFrame, ResponseContent};
use crate::{Error, Result};

/// [`Connector`] that hands out one in-process connection to a [`MemoryPeer`].
#[derive(Debug)]
pub struct MemoryConnector {
	link: Mutex<Option<Connection>>,
	refusal: Option<String>,
}

impl MemoryConnector {
	/// Creates a connector and the peer at the other end of its connection.
	pub fn pair() -> (Self, MemoryPeer) {
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let (event_tx, event_rx) = mpsc::unbounded_channel();
		let _ = event_tx.send(ConnectionEvent::Connected);

		let connector = Self {
			link: Mutex::new(Some(Connection::new(outbound_tx, event_rx))),
			refusal: None,
		};
		let peer = MemoryPeer {
			outbound: outbound_rx,
			events: event_tx,
		};
		(connector, peer)
	}

	/// Creates a connector whose `open` always fails with `reason`.
	pub fn refusing(reason: impl Into<String>) -> Self {
		Self {
			link: Mutex::new(None),
			refusal: Some(reason.into()),
		}
	}
}

#[async_trait]
impl Connector for MemoryConnector {
	async fn open(&self, endpoint: &str) -> Result<Connection> {
		let failed = |reason: &str| Error::ConnectFailed {
			endpoint: endpoint.to_string(),
			reason: reason.to_string(),
		};
		if let Some(reason) = &self.refusal {
			return Err(failed(reason));
		}
		self.link.lock().take().ok_or_else(|| failed("connection already opened"))
	}
}

/// Server side of a [`MemoryConnector`] connection.
#[derive(Debug)]
pub struct MemoryPeer {
	outbound: mpsc::UnboundedReceiver<OutboundFrame>,
	events: mpsc::UnboundedSender<ConnectionEvent>,
}

impl MemoryPeer {
	/// Waits for the next frame the client sent.
	pub async fn recv_outbound(&mut self) -> Option<OutboundFrame> {
		self.outbound.recv().await
	}

	/// Returns the next frame the client sent, if one is already queued.
	pub fn try_recv_outbound(&mut self) -> Option<OutboundFrame> {
		self.outbound.try_recv().ok()
	}

	/// Delivers `frame` to the client.
	pub fn send_frame(&self, frame: InboundFrame) -> Result<()> {
		self.send(ConnectionEvent::Frame(frame))
	}

	/// Delivers a response frame carrying `content`.
	pub fn respond(&self, code: u16, content: ResponseContent) -> Result<()> {
		self.send_frame(content.into_frame(code)?)
	}

	/// Reports a transient transport error to the client.
	pub fn error(&self, message: impl Into<String>) -> Result<()> {
		self.send(ConnectionEvent::Error(message.into()))
	}

	/// Closes the connection from the server side.
	pub fn disconnect(&self, reason: impl Into<String>) -> Result<()> {
		self.send(ConnectionEvent::Disconnected { reason: reason.into() })
	}

	fn send(&self, event: ConnectionEvent) -> Result<()> {
		self.events.send(event).map_err(|_| Error::ServiceStopped)
	}
}
