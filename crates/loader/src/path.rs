//! Structured namespace addresses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::LoadError;

/// Address of a node in the [`Namespace`](crate::Namespace).
///
/// A path is either a top-level area (`"admin"`) or a key nested one level
/// under an area (`"admin.users"`). Everything after the first dot is the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModulePath {
	area: String,
	key: Option<String>,
}

impl ModulePath {
	/// Creates a top-level area path.
	pub fn area(area: impl Into<String>) -> Self {
		Self {
			area: area.into(),
			key: None,
		}
	}

	/// Creates a path nested under `area`.
	pub fn nested(area: impl Into<String>, key: impl Into<String>) -> Self {
		Self {
			area: area.into(),
			key: Some(key.into()),
		}
	}

	/// Returns the area segment.
	pub fn area_name(&self) -> &str {
		&self.area
	}

	/// Returns the nested key, if any.
	pub fn key(&self) -> Option<&str> {
		self.key.as_deref()
	}

	/// Returns true for paths below an area.
	pub fn is_nested(&self) -> bool {
		self.key.is_some()
	}

	/// Returns the area path a nested path depends on.
	pub fn parent(&self) -> Option<ModulePath> {
		self.key.as_ref().map(|_| ModulePath::area(self.area.clone()))
	}
}

impl fmt::Display for ModulePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.key {
			Some(key) => write!(f, "{}.{key}", self.area),
			None => f.write_str(&self.area),
		}
	}
}

impl FromStr for ModulePath {
	type Err = LoadError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || LoadError::InvalidPath(s.to_string());
		match s.split_once('.') {
			None if s.is_empty() => Err(invalid()),
			None => Ok(Self::area(s)),
			Some((area, key)) => {
				if area.is_empty() || key.is_empty() || key.split('.').any(str::is_empty) {
					return Err(invalid());
				}
				Ok(Self::nested(area, key))
			}
		}
	}
}

impl TryFrom<String> for ModulePath {
	type Error = LoadError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<ModulePath> for String {
	fn from(path: ModulePath) -> Self {
		path.to_string()
	}
}
