//! Correlator configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::feedback::Severity;

/// Half-open range of status codes treated as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StatusRange {
	/// First success code.
	pub start: u16,
	/// First code past the range.
	pub end: u16,
}

impl Default for StatusRange {
	fn default() -> Self {
		Self { start: 200, end: 300 }
	}
}

impl StatusRange {
	/// Returns true if `code` is a success code.
	pub fn contains(&self, code: u16) -> bool {
		(self.start..self.end).contains(&code)
	}

	/// Classifies a status code: success inside the range, fatal for server
	/// failures, error for everything else.
	pub fn classify(&self, code: u16) -> Severity {
		if self.contains(code) {
			Severity::Success
		} else if code >= 500 {
			Severity::Fatal
		} else {
			Severity::Error
		}
	}
}

/// Configuration for the request/response correlator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CorrelatorConfig {
	/// Per-request timeout in milliseconds; `0` disables timeouts.
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
	/// Status codes treated as success.
	#[serde(default)]
	pub success: StatusRange,
}

/// Returns the default request timeout in milliseconds.
fn default_request_timeout_ms() -> u64 {
	30_000
}

impl Default for CorrelatorConfig {
	fn default() -> Self {
		Self {
			request_timeout_ms: default_request_timeout_ms(),
			success: StatusRange::default(),
		}
	}
}

impl CorrelatorConfig {
	/// Set the request timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout_ms = timeout.as_millis() as u64;
		self
	}

	/// Returns the request timeout, or `None` when disabled.
	pub fn request_timeout(&self) -> Option<Duration> {
		(self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
	}
}
