//! Shell configuration, read from a TOML file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use trellis_loader::{BootstrapConfig, ModulePath, PageContext, ResourceDescriptor};
use trellis_rpc::CorrelatorConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Everything the shell needs to bootstrap one page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShellConfig {
	/// Credential store: `endpoint`, `identity`, `token`, `session`, `group`.
	#[serde(default)]
	pub credentials: BTreeMap<String, String>,
	/// Page being bootstrapped.
	#[serde(default = "default_page")]
	pub page: PageContext,
	/// Bootstrap tuning.
	#[serde(default)]
	pub bootstrap: BootstrapConfig,
	/// Correlator tuning.
	#[serde(default)]
	pub rpc: CorrelatorConfig,
	/// Top-level interfaces, composed in order.
	#[serde(default = "default_interfaces")]
	pub interfaces: Vec<ModulePath>,
	/// Resources to inject.
	#[serde(default = "default_resources")]
	pub resources: Vec<ResourceDescriptor>,
}

fn default_page() -> PageContext {
	PageContext::new("/")
}

fn default_interfaces() -> Vec<ModulePath> {
	vec![ModulePath::area("home"), ModulePath::area("admin"), ModulePath::nested("admin", "users")]
}

fn default_resources() -> Vec<ResourceDescriptor> {
	["home", "admin", "admin.users"]
		.into_iter()
		.map(|name| ResourceDescriptor::new(name, format!("builtin:{name}")))
		.collect()
}

impl Default for ShellConfig {
	fn default() -> Self {
		Self {
			credentials: BTreeMap::new(),
			page: default_page(),
			bootstrap: BootstrapConfig::default(),
			rpc: CorrelatorConfig::default(),
			interfaces: default_interfaces(),
			resources: default_resources(),
		}
	}
}

impl ShellConfig {
	/// Default config file location: `<config dir>/trellis/shell.toml`.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("trellis").join("shell.toml"))
	}

	/// Parses a configuration file.
	pub fn load(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::parse(&text)
	}

	/// Parses configuration text.
	pub fn parse(text: &str) -> Result<Self> {
		Ok(toml::from_str(text)?)
	}

	/// Loads `explicit` if given, else the default file if it exists, else
	/// built-in defaults.
	pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
		if let Some(path) = explicit {
			return Self::load(path);
		}
		match Self::default_path() {
			Some(path) if path.is_file() => Self::load(&path),
			_ => Ok(Self::default()),
		}
	}
}
