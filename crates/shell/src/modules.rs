//! Built-in page modules, linked into the shell and loaded by locator.
//!
//! | locator               | module        | guard          |
//! |-----------------------|---------------|----------------|
//! | `builtin:home`        | `home`        |                |
//! | `builtin:admin`       | `admin`       | `admin` role   |
//! | `builtin:admin.users` | `admin.users` | `admin` role   |

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{info, warn};
use trellis_loader::{Guard, InitContext, InitError, Initializable, Instance, ModuleDescriptor, ModuleRegistry, builtin_resource};
use trellis_rpc::{CallbackTarget, Correlator, Reply, Submission, UpdateKind};

/// Role required by the admin area.
pub const ADMIN_ROLE: &str = "admin";

/// Callback id the user list arrives on.
pub const USERS_LIST_CALLBACK: &str = "admin.users.list";

/// Method that re-requests the user list.
pub const USERS_REFRESH_METHOD: &str = "users.refresh";

fn correlator(cx: &InitContext<'_>) -> Result<Arc<Correlator>, InitError> {
	cx.service::<Correlator>().ok_or_else(|| format!("{}: no correlator provided", cx.path()).into())
}

/// Landing area: follows update pushes and fetches a summary.
#[derive(Debug, Default)]
pub struct Home {
	summary: Arc<Mutex<Option<Value>>>,
	last_status: Arc<Mutex<Option<Value>>>,
}

impl Home {
	/// Latest dashboard summary, once it arrived.
	pub fn summary(&self) -> Option<Value> {
		self.summary.lock().clone()
	}

	/// Payload of the latest status-change push.
	pub fn last_status(&self) -> Option<Value> {
		self.last_status.lock().clone()
	}
}

impl Initializable for Home {
	fn init(&self, cx: &mut InitContext<'_>) -> Result<(), InitError> {
		let correlator = correlator(cx)?;

		correlator.subscribe(UpdateKind::LoadingProgress, |update| {
			info!(message = %update.message, "home.progress");
		});
		let last_status = self.last_status.clone();
		correlator.subscribe(UpdateKind::StatusChange, move |update| {
			*last_status.lock() = update.data.clone();
		});

		let summary = self.summary.clone();
		let on_summary = CallbackTarget::inline(move |reply: &Reply| {
			if reply.is_success() {
				*summary.lock() = reply.data.clone();
			} else {
				warn!(code = reply.code, message = %reply.message, "home.summary_failed");
			}
		});
		correlator.submit(Submission::new("dashboard.summary", on_summary).silent(true))?;
		Ok(())
	}
}

/// Administration area. Holds no state; its children do the work.
#[derive(Debug, Default)]
pub struct Admin;

/// User management under the admin area.
#[derive(Debug, Default)]
pub struct AdminUsers {
	users: Arc<Mutex<Vec<Value>>>,
}

impl AdminUsers {
	/// Users from the latest list response.
	pub fn users(&self) -> Vec<Value> {
		self.users.lock().clone()
	}
}

impl Initializable for AdminUsers {
	fn init(&self, cx: &mut InitContext<'_>) -> Result<(), InitError> {
		let correlator = correlator(cx)?;

		let users = self.users.clone();
		correlator.register_callback(USERS_LIST_CALLBACK, move |reply| {
			if !reply.is_success() {
				return;
			}
			match reply.data.as_ref().and_then(Value::as_array) {
				Some(list) => *users.lock() = list.clone(),
				None => warn!(code = reply.code, "admin.users.unexpected_payload"),
			}
		});

		let weak: Weak<Correlator> = Arc::downgrade(&correlator);
		correlator.register_method(USERS_REFRESH_METHOD, move |_args| {
			let Some(correlator) = weak.upgrade() else {
				return;
			};
			if let Err(e) = correlator.submit(Submission::new("users.list", USERS_LIST_CALLBACK)) {
				warn!(error = %e, "admin.users.refresh_failed");
			}
		});

		correlator.invoke_method(USERS_REFRESH_METHOD, &[])?;
		Ok(())
	}
}

fn install_home(registry: &ModuleRegistry) -> trellis_loader::Result<()> {
	registry.register(ModuleDescriptor::new("home", || Instance::initializable(Home::default())))
}

fn install_admin(registry: &ModuleRegistry) -> trellis_loader::Result<()> {
	registry.register(ModuleDescriptor::new("admin", || Instance::plain(Admin)).guarded(Guard::Role(ADMIN_ROLE.into())))
}

fn install_admin_users(registry: &ModuleRegistry) -> trellis_loader::Result<()> {
	registry.register(ModuleDescriptor::new("admin.users", || Instance::initializable(AdminUsers::default())).guarded(Guard::Role(ADMIN_ROLE.into())))
}

builtin_resource!("builtin:home", install_home);
builtin_resource!("builtin:admin", install_admin);
builtin_resource!("builtin:admin.users", install_admin_users);
