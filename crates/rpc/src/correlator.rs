//! Request/response correlation over the transport client.
//!
//! Every submitted request carries a callback id. The correlator records the
//! request as outstanding until exactly one response consumes it or its
//! deadline passes. Update pushes bypass correlation and go to the
//! [`UpdateRouter`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::{Notify, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::TransportClient;
use crate::config::CorrelatorConfig;
use crate::feedback::{Feedback, Severity};
use crate::id::CallbackIdGen;
use crate::registry::{CallbackFn, CallbackRegistry, Lifetime};
use crate::update::{Update, UpdateKind, UpdateRouter};
use crate::wire::{CallbackDescriptor, FrameKind, InboundFrame, Reply, ResponseContent, SubmitPayload};
use crate::{Error, Result};

/// Status code of the synthetic reply delivered when a request times out.
pub const TIMEOUT_CODE: u16 = 408;

/// Where a response is delivered.
#[derive(Clone)]
pub enum CallbackTarget {
	/// A callback registered (or to be registered) under this id.
	Named(String),
	/// A one-shot handler stored under a freshly generated id.
	Inline(CallbackFn),
}

impl CallbackTarget {
	/// Wraps a closure as an inline target.
	pub fn inline(handler: impl Fn(&Reply) + Send + Sync + 'static) -> Self {
		Self::Inline(Arc::new(handler))
	}
}

impl fmt::Debug for CallbackTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Named(id) => f.debug_tuple("Named").field(id).finish(),
			Self::Inline(_) => f.write_str("Inline(..)"),
		}
	}
}

impl From<&str> for CallbackTarget {
	fn from(id: &str) -> Self {
		Self::Named(id.to_string())
	}
}

impl From<String> for CallbackTarget {
	fn from(id: String) -> Self {
		Self::Named(id)
	}
}

/// A request to submit.
#[derive(Debug, Clone)]
pub struct Submission {
	handler: String,
	target: CallbackTarget,
	data: Option<Map<String, Value>>,
	args: Option<Value>,
	silent: bool,
}

impl Submission {
	/// Request for server-side `handler`, replying to `target`.
	pub fn new(handler: impl Into<String>, target: impl Into<CallbackTarget>) -> Self {
		Self {
			handler: handler.into(),
			target: target.into(),
			data: None,
			args: None,
			silent: false,
		}
	}

	/// Sets the request data.
	pub fn data(mut self, data: Map<String, Value>) -> Self {
		self.data = Some(data);
		self
	}

	/// Sets extra arguments handed back to the callback.
	pub fn args(mut self, args: Value) -> Self {
		self.args = Some(args);
		self
	}

	/// Suppresses the notification for non-alarming outcomes.
	pub fn silent(mut self, silent: bool) -> Self {
		self.silent = silent;
		self
	}
}

#[derive(Debug)]
struct Outstanding {
	handler: String,
	args: Option<Value>,
	silent: bool,
	deadline: Option<Instant>,
}

/// Correlates submitted requests with their responses.
pub struct Correlator {
	client: Arc<TransportClient>,
	callbacks: Arc<CallbackRegistry>,
	updates: Arc<UpdateRouter>,
	feedback: Arc<dyn Feedback>,
	config: CorrelatorConfig,
	ids: Mutex<CallbackIdGen>,
	outstanding: Mutex<HashMap<String, Outstanding>>,
	submitted: Notify,
	dropped: AtomicUsize,
}

impl fmt::Debug for Correlator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Correlator")
			.field("client", &self.client)
			.field("callbacks", &self.callbacks)
			.field("outstanding", &self.outstanding.lock().len())
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

impl Correlator {
	/// Creates a correlator with empty callback and update tables.
	pub fn new(client: Arc<TransportClient>, feedback: Arc<dyn Feedback>, config: CorrelatorConfig) -> Self {
		Self {
			client,
			callbacks: Arc::new(CallbackRegistry::new()),
			updates: Arc::new(UpdateRouter::new()),
			feedback,
			config,
			ids: Mutex::new(CallbackIdGen::new()),
			outstanding: Mutex::new(HashMap::new()),
			submitted: Notify::new(),
			dropped: AtomicUsize::new(0),
		}
	}

	/// Transport this correlator sends through.
	pub fn client(&self) -> &Arc<TransportClient> {
		&self.client
	}

	/// Callback and method tables.
	pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
		&self.callbacks
	}

	/// Update subscriptions.
	pub fn updates(&self) -> &Arc<UpdateRouter> {
		&self.updates
	}

	/// Registers a durable callback under `id`.
	pub fn register_callback(&self, id: impl Into<String>, handler: impl Fn(&Reply) + Send + Sync + 'static) -> bool {
		self.callbacks.register_callback(id, handler)
	}

	/// Registers a user-triggered method under `name`.
	pub fn register_method(&self, name: impl Into<String>, handler: impl Fn(&[Value]) + Send + Sync + 'static) -> bool {
		self.callbacks.register_method(name, handler)
	}

	/// Invokes the method registered under `name`.
	pub fn invoke_method(&self, name: &str, args: &[Value]) -> Result<()> {
		self.callbacks.invoke_method(name, args)
	}

	/// Subscribes to update pushes of `kind`.
	pub fn subscribe(&self, kind: UpdateKind, handler: impl Fn(&Update) + Send + Sync + 'static) {
		self.updates.subscribe(kind, handler);
	}

	/// Number of requests awaiting a response.
	pub fn outstanding(&self) -> usize {
		self.outstanding.lock().len()
	}

	/// Number of responses [`run`](Self::run) dropped because they matched no
	/// outstanding request or registered callback.
	pub fn dropped(&self) -> usize {
		self.dropped.load(Ordering::Relaxed)
	}

	/// Returns true if a request with callback `id` awaits a response.
	pub fn is_outstanding(&self, id: &str) -> bool {
		self.outstanding.lock().contains_key(id)
	}

	/// Submits a request and returns its callback id.
	///
	/// # Errors
	///
	/// * [`Error::EmptyCallbackId`] for an empty named target.
	/// * [`Error::CallbackInFlight`] if a request with the same id is outstanding.
	/// * Transport errors from [`TransportClient::emit`].
	pub fn submit(&self, submission: Submission) -> Result<String> {
		let Submission {
			handler,
			target,
			data,
			args,
			silent,
		} = submission;

		let (id, inline) = match target {
			CallbackTarget::Named(id) if id.is_empty() => return Err(Error::EmptyCallbackId),
			CallbackTarget::Named(id) => (id, None),
			CallbackTarget::Inline(handler) => (self.fresh_id(), Some(handler)),
		};

		let payload = SubmitPayload {
			auth: self.client.credentials().auth(),
			handler: handler.clone(),
			data,
			callback: CallbackDescriptor {
				id: id.clone(),
				args: args.clone(),
				silent,
			},
		}
		.into_map()?;

		{
			let mut outstanding = self.outstanding.lock();
			if outstanding.contains_key(&id) {
				return Err(Error::CallbackInFlight(id));
			}
			let deadline = self.config.request_timeout().map(|timeout| Instant::now() + timeout);
			outstanding.insert(
				id.clone(),
				Outstanding {
					handler: handler.clone(),
					args,
					silent,
					deadline,
				},
			);
		}
		let is_inline = inline.is_some();
		if let Some(inline) = inline {
			self.callbacks.register_once(id.clone(), inline);
		}

		if let Err(e) = self.client.emit("submit", payload) {
			self.outstanding.lock().remove(&id);
			if is_inline {
				self.callbacks.remove_callback(&id);
			}
			return Err(e);
		}

		debug!(%id, %handler, silent, "correlator.submitted");
		if !silent {
			self.feedback.loading(true, Some(&handler));
		}
		self.submitted.notify_one();
		Ok(id)
	}

	/// Next generated id not already taken by a registered callback.
	fn fresh_id(&self) -> String {
		let mut ids = self.ids.lock();
		loop {
			let id = ids.next();
			if !self.callbacks.contains_callback(&id) {
				return id;
			}
			debug!(%id, "correlator.id_taken");
		}
	}

	/// Handles one inbound frame.
	///
	/// # Errors
	///
	/// Returns [`Error::CallbackNotFound`] for a response whose id is not
	/// outstanding or has no registered callback.
	pub fn handle_frame(&self, frame: InboundFrame) -> Result<()> {
		match frame.kind {
			FrameKind::Response => self.handle_response(frame),
			FrameKind::Update => {
				self.handle_update(&frame);
				Ok(())
			}
		}
	}

	fn handle_response(&self, frame: InboundFrame) -> Result<()> {
		let code = frame.code;
		let content: ResponseContent = match serde_json::from_str(&frame.content) {
			Ok(content) => content,
			Err(e) => {
				warn!(code, error = %e, "correlator.unreadable_response");
				self.feedback.loading(false, None);
				self.feedback.render(Severity::Error, &format!("unreadable response: {e}"));
				return Ok(());
			}
		};

		if let Some(message) = content.error {
			warn!(code, error = %message, "correlator.server_error");
			if let Some(echo) = &content.callback {
				self.abandon(&echo.id);
			}
			self.settle_loading();
			self.feedback.render(Severity::Error, &message);
			return Ok(());
		}

		let severity = content.level.unwrap_or_else(|| self.config.success.classify(code));
		let Some(echo) = content.callback else {
			self.notify(severity, false, &content.message);
			return Ok(());
		};

		let Some(call) = self.outstanding.lock().remove(&echo.id) else {
			warn!(id = %echo.id, code, "correlator.unknown_callback");
			return Err(Error::CallbackNotFound(echo.id));
		};
		self.settle_loading();
		self.notify(severity, echo.silent || call.silent, &content.message);
		debug!(id = %echo.id, handler = %call.handler, code, ?severity, "correlator.resolved");

		let reply = Reply {
			code,
			severity,
			message: content.message,
			data: content.data,
			args: call.args,
		};
		self.callbacks.invoke_callback(&echo.id, &reply)
	}

	fn handle_update(&self, frame: &InboundFrame) {
		let update = match Update::decode(frame) {
			Ok(update) => update,
			Err(e) => {
				warn!(code = frame.code, error = %e, "correlator.unreadable_update");
				return;
			}
		};
		let delivered = self.updates.dispatch(&update);
		if delivered == 0 {
			debug!(kind = ?update.kind, "correlator.update_unhandled");
		}
	}

	/// Evicts every request whose deadline is at or before `now`.
	///
	/// Each evicted request's callback receives a synthetic [`TIMEOUT_CODE`]
	/// reply. Returns the number of evicted requests.
	pub fn expire(&self, now: Instant) -> usize {
		let expired: Vec<(String, Outstanding)> = {
			let mut outstanding = self.outstanding.lock();
			let ids: Vec<String> = outstanding
				.iter()
				.filter(|(_, call)| call.deadline.is_some_and(|deadline| deadline <= now))
				.map(|(id, _)| id.clone())
				.collect();
			ids.into_iter().filter_map(|id| outstanding.remove_entry(&id)).collect()
		};
		if expired.is_empty() {
			return 0;
		}

		self.settle_loading();
		for (id, call) in &expired {
			warn!(%id, handler = %call.handler, "correlator.timed_out");
			let message = format!("{} timed out", call.handler);
			self.feedback.render(Severity::Error, &message);

			let reply = Reply {
				code: TIMEOUT_CODE,
				severity: Severity::Error,
				message,
				data: None,
				args: call.args.clone(),
			};
			if let Err(e) = self.callbacks.invoke_callback(id, &reply) {
				debug!(%id, error = %e, "correlator.timeout_unhandled");
			}
		}
		expired.len()
	}

	/// Earliest deadline among outstanding requests.
	pub fn next_deadline(&self) -> Option<Instant> {
		self.outstanding.lock().values().filter_map(|call| call.deadline).min()
	}

	/// Processes inbound frames and request deadlines until the frame stream
	/// ends or `shutdown` is cancelled.
	///
	/// A response that fails correlation is logged and counted in
	/// [`dropped`](Self::dropped); later frames are still handled.
	pub async fn run(&self, mut inbound: mpsc::UnboundedReceiver<InboundFrame>, shutdown: CancellationToken) {
		info!("correlator.started");
		loop {
			let deadline = self.next_deadline();
			tokio::select! {
				_ = shutdown.cancelled() => {
					info!(outstanding = self.outstanding(), "correlator.stopped");
					return;
				}
				frame = inbound.recv() => {
					let Some(frame) = frame else {
						info!(outstanding = self.outstanding(), "correlator.inbound_closed");
						return;
					};
					if let Err(e) = self.handle_frame(frame) {
						self.dropped.fetch_add(1, Ordering::Relaxed);
						debug!(error = %e, "correlator.response_dropped");
					}
				}
				_ = sleep_until(deadline) => {
					self.expire(Instant::now());
				}
				_ = self.submitted.notified() => {}
			}
		}
	}

	fn notify(&self, severity: Severity, silent: bool, message: &str) {
		if !message.is_empty() && (severity.is_alarming() || !silent) {
			self.feedback.render(severity, message);
		}
	}

	/// Hides the loading indicator once no visible request remains.
	fn settle_loading(&self) {
		let visible = self.outstanding.lock().values().any(|call| !call.silent);
		if !visible {
			self.feedback.loading(false, None);
		}
	}

	/// Drops an outstanding request without invoking its callback.
	fn abandon(&self, id: &str) {
		let removed = self.outstanding.lock().remove(id).is_some();
		if removed && self.callbacks.callback_lifetime(id) == Some(Lifetime::Once) {
			self.callbacks.remove_callback(id);
		}
	}
}

async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}
