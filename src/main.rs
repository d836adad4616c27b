use anyhow::Context;
use dotenv::dotenv;
use productivity_client::app_env::{self, ClientConfig};
use productivity_client::domain::auth::driving_ports::AuthPort;
use productivity_client::domain::auth::{AuthService, LoginRequest};
use productivity_client::domain::notification::NotificationService;
use productivity_client::domain::notification::driving_ports::NotificationPort;
use productivity_client::logging;
use productivity_client::notify_channel::{ChannelSettings, NotificationChannel};
use productivity_client::remote::ApiClient;
use std::env;
use std::time::Duration;
use tracing::{error, info};

/// Logs in, prints the user's notification history, then follows the live notification feed
/// until interrupted
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();
    let otel_exporters = logging::exporters_from_env()?;
    logging::setup_logging_and_tracing(logging::init_env_filter(), otel_exporters.as_ref());

    let result = run().await;
    if let Err(err) = &result {
        error!("Client stopped: {err:#}");
    }

    if let Some(exporters) = otel_exporters {
        exporters.shutdown();
    }
    result
}

async fn run() -> Result<(), anyhow::Error> {
    let config = ClientConfig::from_env()?;
    let login = LoginRequest {
        email: env::var(app_env::LOGIN_EMAIL)
            .with_context(|| format!("{} must be set", app_env::LOGIN_EMAIL))?,
        password: env::var(app_env::LOGIN_PASSWORD)
            .with_context(|| format!("{} must be set", app_env::LOGIN_PASSWORD))?,
    };

    let client = ApiClient::from_config(&config)?;
    let auth = AuthService::new();
    let user = auth.login(login, &client).await?;
    info!(user_id = user.id, "Logged in as {}", user.name.as_deref().unwrap_or("unknown user"));

    let history = NotificationService.history(user.id, &client).await?;
    for notification in &history {
        info!(
            id = notification.id,
            sent = notification.sent,
            "{}: {}",
            notification.title,
            notification.message
        );
    }

    let channel = NotificationChannel::open(ChannelSettings::from(&config), user.id);
    let mut status = channel.watch_status();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut seen = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing the notification channel");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                info!("Notification channel is {}", *status.borrow_and_update());
            }
            _ = ticker.tick() => {
                let received = channel.notifications();
                for notification in received.iter().skip(seen) {
                    info!(id = notification.id, "{}: {}", notification.title, notification.message);
                }
                seen = received.len();
            }
        }
    }

    channel.shutdown().await;
    Ok(())
}
