//! One page session: connect, bootstrap, then serve responses.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use trellis_loader::{BootstrapCoordinator, Composer, ModulePath, ModuleRegistry, Namespace, ResourceInjector, StaticLoader};
use trellis_rpc::{Connector, Correlator, Credentials, Feedback, InboundFrame, TransportClient};

use crate::config::ShellConfig;
use crate::modules::{AdminUsers, Home};

/// A connected, bootstrapped page.
pub struct Session {
	correlator: Arc<Correlator>,
	namespace: Namespace,
	frames: mpsc::UnboundedReceiver<InboundFrame>,
}

impl Session {
	/// Connects to the server and bootstraps the configured interfaces.
	///
	/// Initializers may submit requests; their responses are handled once
	/// [`run`](Self::run) starts.
	pub async fn start(config: &ShellConfig, connector: Arc<dyn Connector>, feedback: Arc<dyn Feedback>) -> anyhow::Result<Self> {
		let credentials = Credentials::from_store(&config.credentials).context("reading credentials")?;
		let client = Arc::new(TransportClient::new(credentials, connector));
		let frames = client.connect().await.context("connecting to server")?;
		let correlator = Arc::new(Correlator::new(client, feedback, config.rpc.clone()));

		let registry = Arc::new(ModuleRegistry::new());
		let mut injector = ResourceInjector::new(registry.clone(), Arc::new(StaticLoader));
		let injected = injector.inject(&config.resources, &config.page);
		let mut composer = Composer::new(registry, config.page.clone());
		composer.provide(correlator.clone());

		let mut coordinator = BootstrapCoordinator::new(injector, composer, config.bootstrap);
		coordinator.bootstrap(&config.interfaces).await.context("bootstrapping page")?;
		let namespace = coordinator.into_composer().into_namespace();

		info!(
			page = %config.page.path,
			injected,
			nodes = namespace.len(),
			outstanding = correlator.outstanding(),
			"session.ready"
		);
		Ok(Self {
			correlator,
			namespace,
			frames,
		})
	}

	/// The composed namespace.
	pub fn namespace(&self) -> &Namespace {
		&self.namespace
	}

	/// The session's correlator.
	pub fn correlator(&self) -> &Arc<Correlator> {
		&self.correlator
	}

	/// Handles inbound traffic until the connection closes or `shutdown` fires.
	pub async fn run(self, shutdown: CancellationToken) {
		let home = self.namespace.get_as::<Home>(&ModulePath::area("home"));
		let users = self.namespace.get_as::<AdminUsers>(&ModulePath::nested("admin", "users"));

		self.correlator.run(self.frames, shutdown).await;

		info!(
			summary = ?home.and_then(|home| home.summary()),
			users = users.map_or(0, |users| users.users().len()),
			outstanding = self.correlator.outstanding(),
			dropped = self.correlator.dropped(),
			"session.closed"
		);
	}
}

#[cfg(test)]
mod tests;
