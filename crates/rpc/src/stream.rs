//! Length-prefixed JSON framing over a byte stream, and the TCP connector.
//!
//! Each frame is a little-endian `u32` body length followed by a JSON body.
//! One task writes queued outbound frames in order; a second reads inbound
//! frames until the peer closes or the connection is cancelled.

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{Connection, ConnectionEvent, Connector};
use crate::wire::{InboundFrame, OutboundFrame};
use crate::{Error, Result};

/// Largest accepted frame body.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// [`Connector`] dialing `host:port` endpoints over TCP.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
	shutdown: CancellationToken,
}

impl TcpConnector {
	/// Creates a connector whose connections live until their peer closes.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a connector whose connections close when `shutdown` is cancelled.
	pub fn with_shutdown(shutdown: CancellationToken) -> Self {
		Self { shutdown }
	}
}

#[async_trait]
impl Connector for TcpConnector {
	async fn open(&self, endpoint: &str) -> Result<Connection> {
		let stream = TcpStream::connect(endpoint).await.map_err(|e| Error::ConnectFailed {
			endpoint: endpoint.to_string(),
			reason: e.to_string(),
		})?;
		if let Err(e) = stream.set_nodelay(true) {
			debug!(endpoint, error = %e, "stream.nodelay_failed");
		}
		info!(endpoint, "stream.connected");

		let (reader, writer) = stream.into_split();
		Ok(spawn_io(endpoint.to_string(), reader, writer, self.shutdown.child_token()))
	}
}

/// Spawns the I/O tasks for an already-established stream.
pub(crate) fn spawn_io<R, W>(peer: String, reader: R, writer: W, shutdown: CancellationToken) -> Connection
where
	R: AsyncRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin + Send + 'static,
{
	let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
	let (event_tx, event_rx) = mpsc::unbounded_channel();
	let _ = event_tx.send(ConnectionEvent::Connected);
	tokio::spawn(run_io(peer, reader, writer, outbound_rx, event_tx, shutdown));
	Connection::new(outbound_tx, event_rx)
}

async fn run_io<R, W>(
	peer: String,
	reader: R,
	writer: W,
	outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>,
	event_tx: mpsc::UnboundedSender<ConnectionEvent>,
	shutdown: CancellationToken,
) where
	R: AsyncRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin + Send + 'static,
{
	let reader_task = tokio::spawn(read_loop(BufReader::new(reader), event_tx.clone(), shutdown.clone()));
	let write_reason = write_loop(writer, outbound_rx, &shutdown).await;
	shutdown.cancel();

	let reason = match reader_task.await {
		Ok(Some(reason)) => reason,
		_ => write_reason,
	};
	info!(%peer, %reason, "stream.closed");
	let _ = event_tx.send(ConnectionEvent::Disconnected { reason });
}

/// Writes queued frames in order. Returns why writing stopped.
async fn write_loop<W>(mut writer: W, mut outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>, shutdown: &CancellationToken) -> String
where
	W: AsyncWrite + Unpin,
{
	loop {
		tokio::select! {
			_ = shutdown.cancelled() => return "shutdown".to_string(),
			out = outbound_rx.recv() => {
				let Some(frame) = out else {
					return "client closed".to_string();
				};
				if let Err(e) = write_frame(&mut writer, &frame).await {
					warn!(kind = %frame.kind, error = %e, "stream.write_failed");
					return e.to_string();
				}
				debug!(kind = %frame.kind, "stream.frame_written");
			}
		}
	}
}

/// Reads frames until the peer closes, a fatal read error, or cancellation.
///
/// Returns the close reason, or `None` if cancelled from outside.
async fn read_loop<R>(mut reader: R, event_tx: mpsc::UnboundedSender<ConnectionEvent>, shutdown: CancellationToken) -> Option<String>
where
	R: AsyncRead + Unpin,
{
	loop {
		let body = tokio::select! {
			_ = shutdown.cancelled() => return None,
			res = read_frame(&mut reader) => res,
		};

		let reason = match body {
			Ok(Some(body)) => match serde_json::from_slice::<InboundFrame>(&body) {
				Ok(frame) => {
					if event_tx.send(ConnectionEvent::Frame(frame)).is_err() {
						"client closed".to_string()
					} else {
						continue;
					}
				}
				Err(e) => {
					// Frame boundaries are intact, so a bad body only costs that frame.
					warn!(error = %e, "stream.malformed_frame");
					let _ = event_tx.send(ConnectionEvent::Error(format!("malformed frame: {e}")));
					continue;
				}
			},
			Ok(None) => "peer closed connection".to_string(),
			Err(e) => e.to_string(),
		};
		shutdown.cancel();
		return Some(reason);
	}
}

/// Writes one length-prefixed JSON frame.
pub(crate) async fn write_frame<W, T>(writer: &mut W, frame: &T) -> Result<()>
where
	W: AsyncWrite + Unpin,
	T: Serialize,
{
	let buf = serde_json::to_vec(frame)?;
	let len = u32::try_from(buf.len()).ok().filter(|len| *len <= MAX_FRAME_LEN).ok_or_else(|| Error::Protocol(format!("frame of {} bytes exceeds limit", buf.len())))?;
	writer.write_u32_le(len).await?;
	writer.write_all(&buf).await?;
	writer.flush().await?;
	Ok(())
}

/// Reads one frame body. Returns `None` on a clean end of stream.
pub(crate) async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
	R: AsyncRead + Unpin,
{
	let len = match reader.read_u32_le().await {
		Ok(len) => len,
		Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
		Err(e) => return Err(e.into()),
	};
	if len > MAX_FRAME_LEN {
		return Err(Error::Protocol(format!("frame length {len} exceeds limit")));
	}
	let mut buf = vec![0u8; len as usize];
	reader.read_exact(&mut buf).await?;
	Ok(Some(buf))
}
