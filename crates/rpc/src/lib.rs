//! Callback-correlated request/response protocol over one persistent socket.
//!
//! This crate provides the transport half of a Trellis page:
//! * [`TransportClient`]: owns the single connection, derives the room from
//!   credentials and surfaces a [`ConnectionStatus`].
//! * [`Correlator`]: tags every outbound request with a callback id and routes
//!   each response to exactly one handler, deciding whether the user is notified.
//! * [`CallbackRegistry`]: flat tables of response callbacks and user-triggered methods.
//! * [`UpdateRouter`]: durable subscriptions for unsolicited update pushes.
//! * [`Connector`]: the seam to the byte transport, with a TCP implementation
//!   ([`TcpConnector`]) and an in-process one ([`MemoryConnector`]).

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod connection;
pub mod correlator;
pub mod credentials;
pub mod error;
pub mod feedback;
pub mod id;
pub mod memory;
pub mod registry;
pub mod stream;
pub mod update;
pub mod wire;

pub use client::{ConnectionStatus, TransportClient};
pub use config::{CorrelatorConfig, StatusRange};
pub use connection::{Connection, ConnectionEvent, Connector};
pub use correlator::{CallbackTarget, Correlator, Submission, TIMEOUT_CODE};
pub use credentials::{CredentialStore, Credentials};
pub use error::{Error, Result};
pub use feedback::{Feedback, LogFeedback, Severity};
pub use id::CallbackIdGen;
pub use memory::{MemoryConnector, MemoryPeer};
pub use registry::{CallbackFn, CallbackRegistry, Lifetime, MethodFn};
pub use stream::TcpConnector;
pub use update::{Update, UpdateContent, UpdateFn, UpdateKind, UpdateRouter};
pub use wire::{Auth, CallbackDescriptor, EchoedCallback, FrameKind, InboundFrame, OutboundFrame, Reply, ResponseContent, SubmitPayload};

/// Re-export of the JSON value type carried in payloads.
pub use serde_json::{Map as JsonMap, Value as JsonValue};
