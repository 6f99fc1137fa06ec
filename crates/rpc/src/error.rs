//! Error types for the transport and correlation layers.

use std::io;

use thiserror::Error;

/// A convenient type alias for `Result` with `E` = [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// A response or invocation named a callback id with no handler, or a
	/// response arrived for a call that is not outstanding.
	#[error("callback not found: {0}")]
	CallbackNotFound(String),
	/// A user action named a method with no handler.
	#[error("method not found: {0}")]
	MethodNotFound(String),
	/// A request expecting a reply was submitted without a callback id.
	#[error("callback id must not be empty")]
	EmptyCallbackId,
	/// A request reused the id of a call that is still outstanding.
	#[error("callback {0} already has an outstanding request")]
	CallbackInFlight(String),
	/// The credential store lacks a required value.
	#[error("missing credential: {0}")]
	MissingCredential(&'static str),
	/// The connection could not be opened.
	#[error("failed to connect to {endpoint}: {reason}")]
	ConnectFailed {
		/// Endpoint that was dialed.
		endpoint: String,
		/// Underlying failure.
		reason: String,
	},
	/// A frame was emitted before [`TransportClient::connect`](crate::TransportClient::connect).
	#[error("transport is not connected")]
	NotConnected,
	/// The connection's I/O loop stopped.
	#[error("service stopped")]
	ServiceStopped,
	/// A payload could not be encoded or decoded.
	#[error("serialization failed: {0}")]
	Encode(#[from] serde_json::Error),
	/// Input/output errors from the underlying stream.
	#[error("{0}")]
	Io(#[from] io::Error),
	/// The peer violated the framing protocol.
	#[error("protocol error: {0}")]
	Protocol(String),
}
