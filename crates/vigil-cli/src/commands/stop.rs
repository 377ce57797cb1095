use crate::client::{ClientError, DaemonClient};
use anyhow::{bail, Result};
use vigil_protocol::{Request, Response};

use super::client_failure;

pub async fn execute() -> Result<()> {
    match DaemonClient::new().send(Request::Stop).await {
        Ok(Response::Ok) => {
            println!("🛑 Tracking stopped");
        }
        Ok(Response::Error { message }) => {
            bail!("{}", message);
        }
        Ok(_) => {
            bail!("unexpected response from the daemon");
        }
        Err(ClientError::DaemonNotRunning) => {
            println!("⚫ Daemon not running");
        }
        Err(error) => return Err(client_failure(error)),
    }

    Ok(())
}
