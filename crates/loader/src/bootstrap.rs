//! Bounded wait for injected resources, then ordered composition.

use std::time::Duration;

use futures::future::try_join_all;
use serde::Deserialize;
use tracing::{error, info};

use crate::composer::{Composed, Composer};
use crate::injector::ResourceInjector;
use crate::path::ModulePath;
use crate::{LoadError, Result};

/// Bootstrap tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BootstrapConfig {
	/// How long to wait for every injected resource to register.
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
}

/// Returns the default bootstrap timeout in milliseconds.
fn default_timeout_ms() -> u64 {
	10_000
}

impl Default for BootstrapConfig {
	fn default() -> Self {
		Self {
			timeout_ms: default_timeout_ms(),
		}
	}
}

impl BootstrapConfig {
	/// Returns the timeout as a [`Duration`].
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

/// Drives a page from injected resources to a composed namespace.
pub struct BootstrapCoordinator {
	injector: ResourceInjector,
	composer: Composer,
	config: BootstrapConfig,
}

impl BootstrapCoordinator {
	/// Creates a coordinator. `injector` and `composer` should share one registry.
	pub fn new(injector: ResourceInjector, composer: Composer, config: BootstrapConfig) -> Self {
		Self {
			injector,
			composer,
			config,
		}
	}

	/// Returns the injector, e.g. to inject more resources before bootstrapping.
	pub fn injector_mut(&mut self) -> &mut ResourceInjector {
		&mut self.injector
	}

	/// Returns the composer.
	pub fn composer(&self) -> &Composer {
		&self.composer
	}

	/// Returns the composer mutably, e.g. to provide services.
	pub fn composer_mut(&mut self) -> &mut Composer {
		&mut self.composer
	}

	/// Consumes the coordinator, returning the composer and its namespace.
	pub fn into_composer(self) -> Composer {
		self.composer
	}

	/// Waits for every injected resource to register, then composes `paths` in order.
	///
	/// Nothing is composed unless every resource registered in time.
	///
	/// # Errors
	///
	/// - [`LoadError::BootstrapTimeout`] listing the resources that never registered.
	/// - [`LoadError::ResourceFailed`] for the first resource whose loader failed.
	/// - [`LoadError::ModuleAlreadyRegistered`] when a resource registers a name
	///   that is already taken.
	/// - Any [`Composer::compose`] error; composition stops at the failing path.
	pub async fn bootstrap(&mut self, paths: &[ModulePath]) -> Result<()> {
		let completions = self.injector.take_completions();
		let expected = completions.len();
		info!(resources = expected, interfaces = paths.len(), "bootstrap.start");

		let all_registered = try_join_all(completions.into_iter().map(|(name, rx)| async move {
			rx.await.unwrap_or_else(|_| {
				Err(LoadError::ResourceFailed {
					name,
					reason: "loader task dropped".into(),
				})
			})
		}));

		match tokio::time::timeout(self.config.timeout(), all_registered).await {
			Ok(Ok(_)) => {}
			Ok(Err(err)) => {
				error!(error = %err, "bootstrap.resource_failed");
				return Err(err);
			}
			Err(_) => {
				let missing = self.injector.outstanding();
				error!(?missing, timeout_ms = self.config.timeout_ms, "bootstrap.timeout");
				return Err(LoadError::BootstrapTimeout {
					missing,
					waited_ms: self.config.timeout_ms,
				});
			}
		}

		let mut vacant = 0usize;
		for path in paths {
			let composed = self
				.composer
				.compose(path)
				.inspect_err(|err| error!(%path, error = %err, "bootstrap.compose_failed"))?;
			if composed == Composed::Vacant {
				vacant += 1;
			}
		}

		info!(composed = paths.len(), vacant, "bootstrap.done");
		Ok(())
	}
}
