//! Session credentials read from an external store.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::wire::Auth;
use crate::{Error, Result};

/// Source of named credential values (cookies, config file, environment).
pub trait CredentialStore {
	/// Returns the value stored under `key`, if any.
	fn get(&self, key: &str) -> Option<String>;
}

impl CredentialStore for HashMap<String, String> {
	fn get(&self, key: &str) -> Option<String> {
		HashMap::get(self, key).cloned()
	}
}

impl CredentialStore for BTreeMap<String, String> {
	fn get(&self, key: &str) -> Option<String> {
		BTreeMap::get(self, key).cloned()
	}
}

/// Connection parameters derived from the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
	/// Server endpoint (`host:port`).
	pub endpoint: String,
	/// User identity.
	pub identity: String,
	/// Session token.
	pub token: String,
	/// Session id.
	pub session: String,
	/// User group.
	pub group: String,
}

impl Credentials {
	/// Reads every required value from `store`.
	pub fn from_store(store: &dyn CredentialStore) -> Result<Self> {
		let read = |key: &'static str| store.get(key).filter(|v| !v.is_empty()).ok_or(Error::MissingCredential(key));
		Ok(Self {
			endpoint: read("endpoint")?,
			identity: read("identity")?,
			token: read("token")?,
			session: read("session")?,
			group: read("group")?,
		})
	}

	/// Room scoping this client's messages: `identity:session`.
	pub fn room(&self) -> String {
		format!("{}:{}", self.identity, self.session)
	}

	/// Authentication block for submitted requests.
	pub fn auth(&self) -> Auth {
		Auth {
			identity: self.identity.clone(),
			token: self.token.clone(),
			group: self.group.clone(),
		}
	}
}
