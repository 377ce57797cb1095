//! Entry point for periodic schedulers such as cron or a systemd timer.

use crate::client::DaemonClient;
use crate::daemon_launcher::ensure_daemon_running;
use anyhow::{bail, Result};
use vigil_core::Config;
use vigil_protocol::{Request, Response};

use super::check::{describe_interruption, request_check};
use super::client_failure;
use super::flush::{describe_outcome, request_flush};

pub async fn execute() -> Result<()> {
    ensure_daemon_running().await?;
    let config = Config::load().unwrap_or_default();
    let client = DaemonClient::new();

    match client.send(Request::Start).await {
        Ok(Response::Ok) => {}
        Ok(Response::Error { message }) => bail!("{}", message),
        Ok(_) => bail!("unexpected response from the daemon"),
        Err(error) => return Err(client_failure(error)),
    }

    let interruption = request_check(&client).await?;
    println!("{}", describe_interruption(interruption.as_ref()));

    let outcome = request_flush(&client, &config.delivery).await?;
    println!("{}", describe_outcome(outcome));

    Ok(())
}
