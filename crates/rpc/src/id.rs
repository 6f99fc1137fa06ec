//! Callback id generation.

/// Counter-based generator for inline callback ids.
///
/// Ids take the form `cb-<n>`; `n` increases monotonically per generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallbackIdGen(pub u64);

impl CallbackIdGen {
	/// Creates a new counter starting at 0.
	#[must_use]
	pub const fn new() -> Self {
		Self(0)
	}

	/// Generates the next unique id and increments the counter.
	#[allow(clippy::should_implement_trait, reason = "convention")]
	pub fn next(&mut self) -> String {
		let id = self.0;
		self.0 += 1;
		format!("cb-{id}")
	}
}
