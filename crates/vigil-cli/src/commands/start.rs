use crate::client::DaemonClient;
use crate::daemon_launcher::ensure_daemon_running;
use anyhow::{bail, Result};
use vigil_protocol::{Request, Response};

use super::client_failure;

pub async fn execute() -> Result<()> {
    ensure_daemon_running().await?;

    match DaemonClient::new().send(Request::Start).await {
        Ok(Response::Ok) => {
            println!("🟢 Tracking started");
        }
        Ok(Response::Error { message }) => {
            bail!("{}", message);
        }
        Ok(_) => {
            bail!("unexpected response from the daemon");
        }
        Err(error) => return Err(client_failure(error)),
    }

    Ok(())
}
