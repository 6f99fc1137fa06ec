//! Attributes of the page being bootstrapped.

use serde::Deserialize;

/// The current page view, consulted by resource filters and module guards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageContext {
	/// Request path of the page (e.g. `/admin/users`).
	#[serde(default)]
	pub path: String,
	/// Logical view name, if the page declares one.
	#[serde(default)]
	pub view: Option<String>,
	/// Roles granted to the current user.
	#[serde(default)]
	pub roles: Vec<String>,
}

impl PageContext {
	/// Creates a context for `path` with no view and no roles.
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			..Self::default()
		}
	}

	/// Sets the view name.
	pub fn view(mut self, view: impl Into<String>) -> Self {
		self.view = Some(view.into());
		self
	}

	/// Grants a role.
	pub fn role(mut self, role: impl Into<String>) -> Self {
		self.roles.push(role.into());
		self
	}

	/// Returns true if the user holds `role`.
	pub fn has_role(&self, role: &str) -> bool {
		self.roles.iter().any(|r| r == role)
	}
}
