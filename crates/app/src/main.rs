use std::time::Duration;

use app::config::Config;
use app::{AccountsError, AppError, create_app, telemetry};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env();
    telemetry::init_tracing(&config);

    let metrics = if config.print_metrics {
        Some(telemetry::install_metrics()?)
    } else {
        None
    };

    let app = create_app(&config)?;

    let ada = match app.accounts.register_user("ada@example.com", "Ada").await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "registration failed");
            return Ok(());
        }
    };
    for program in ["Robotics", "Chess"] {
        if let Err(e) = app.enrollment.submit_enrollment(ada, program).await {
            tracing::error!(error = %e, "enrollment failed");
        }
    }

    if let Err(e) = app.accounts.delete_user(ada).await {
        tracing::error!(error = %e, "deletion failed");
    }
    if !app.enrollment.wait_until_withdrawn(ada, DRAIN_TIMEOUT).await {
        tracing::warn!(user_id = %ada, "enrollments not withdrawn in time");
    }

    // A broker outage during a critical promotion halts the cascade.
    let linus = match app.accounts.register_user("linus@example.com", "Linus").await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "registration failed");
            return Ok(());
        }
    };
    if let Err(e) = app.enrollment.submit_enrollment(linus, "Robotics").await {
        tracing::error!(error = %e, "enrollment failed");
    }
    app.channel
        .set_fail_on_publish(Some("broker unavailable".to_string()));
    match app.accounts.delete_user(linus).await {
        Err(AccountsError::CascadeHalted { user_id, source }) => {
            let remaining = app.enrollment.enrollments_of(user_id).await.len();
            tracing::warn!(%user_id, error = %source, remaining, "cascade halted");
        }
        Err(e) => tracing::error!(error = %e, "deletion failed"),
        Ok(()) => tracing::info!(user_id = %linus, "user deleted"),
    }
    app.channel.set_fail_on_publish(None);

    app.listener.abort();

    if let Some(handle) = metrics {
        tracing::info!(metrics = %handle.render(), "metrics snapshot");
    }
    Ok(())
}
