//! Accounts and enrollment contexts wired through the dispatch core.

pub mod config;
pub mod contexts;
pub mod error;
pub mod telemetry;

use std::sync::Arc;

use broadcast::{BroadcastChannel, InMemoryBroadcastChannel, topic};
use dispatch::ContextDirectory;
use tokio::task::JoinHandle;

pub use config::{Config, LogFormat};
pub use contexts::{AccountsContext, AccountsError, EnrollmentContext};
pub use error::AppError;

/// The running application.
pub struct App {
    pub directory: ContextDirectory,
    pub accounts: Arc<AccountsContext>,
    pub enrollment: Arc<EnrollmentContext>,
    pub channel: InMemoryBroadcastChannel,
    pub listener: JoinHandle<()>,
}

/// Starts both contexts, registers their registries, and subscribes
/// enrollment to accounts' `user_deleted` integration events.
///
/// Must be called inside a Tokio runtime.
pub fn create_app(config: &Config) -> Result<App, AppError> {
    let channel = InMemoryBroadcastChannel::with_buffer(config.broadcast_buffer)
        .with_log_capacity(config.broadcast_log_capacity);
    let shared: Arc<dyn BroadcastChannel> = Arc::new(channel.clone());

    let accounts = Arc::new(AccountsContext::start(
        Arc::clone(&shared),
        config.registry_mailbox,
    )?);
    let enrollment = Arc::new(EnrollmentContext::start(shared, config.registry_mailbox)?);

    let mut directory = ContextDirectory::new();
    directory.register(accounts.registry().clone())?;
    directory.register(enrollment.registry().clone())?;

    let user_deleted = topic::integration(
        accounts.registry().context(),
        contexts::accounts::USER_DELETED,
    );
    let listener =
        contexts::spawn_user_deleted_listener(Arc::clone(&enrollment), channel.subscribe(user_deleted));

    tracing::info!(contexts = directory.contexts().len(), "application started");

    Ok(App {
        directory,
        accounts,
        enrollment,
        channel,
        listener,
    })
}
