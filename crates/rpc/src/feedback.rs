//! User-visible feedback, supplied by the page's rendering layer.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Classification of a response outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	/// The request succeeded.
	Success,
	/// Informational outcome.
	Info,
	/// The request completed with a warning.
	Warn,
	/// The request failed.
	Error,
	/// The server failed.
	Fatal,
}

impl Severity {
	/// Returns true for outcomes the user is always told about, silent or not.
	pub fn is_alarming(self) -> bool {
		matches!(self, Self::Warn | Self::Error | Self::Fatal)
	}

	/// Returns the lowercase name.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Success => "success",
			Self::Info => "info",
			Self::Warn => "warn",
			Self::Error => "error",
			Self::Fatal => "fatal",
		}
	}
}

/// Rendering collaborator for notifications and the loading indicator.
pub trait Feedback: Send + Sync {
	/// Shows a notification.
	fn render(&self, severity: Severity, message: &str);

	/// Shows or hides the loading indicator.
	fn loading(&self, show: bool, message: Option<&str>);
}

/// [`Feedback`] that writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl Feedback for LogFeedback {
	fn render(&self, severity: Severity, message: &str) {
		match severity {
			Severity::Success | Severity::Info => info!(severity = severity.as_str(), "{message}"),
			Severity::Warn => warn!(severity = severity.as_str(), "{message}"),
			Severity::Error | Severity::Fatal => error!(severity = severity.as_str(), "{message}"),
		}
	}

	fn loading(&self, show: bool, message: Option<&str>) {
		info!(show, message = message.unwrap_or_default(), "loading");
	}
}
