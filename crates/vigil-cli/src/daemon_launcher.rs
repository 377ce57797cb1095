use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use vigil_protocol::{Request, Response};

use crate::client::{ClientError, DaemonClient};

const DAEMON_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);
const DAEMON_POLL_INTERVAL: Duration = Duration::from_millis(100);
const DAEMON_PATH_ENV: &str = "VIGIL_DAEMON_PATH";

/// Spawns the daemon unless one already answers on the socket.
pub async fn ensure_daemon_running() -> Result<()> {
    match DaemonClient::new().send(Request::Ping).await {
        Ok(Response::Pong) => return Ok(()),
        Ok(_) | Err(ClientError::DaemonNotRunning) => {}
        Err(error) => bail!("{}", error),
    }

    println!("🔄 Starting the daemon...");

    spawn_daemon()?;
    wait_for_socket(&vigil_protocol::socket_path()).await
}

fn spawn_daemon() -> Result<()> {
    let daemon_path = find_daemon_binary()?;

    Command::new(&daemon_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to launch {}", daemon_path.display()))?;

    Ok(())
}

fn find_daemon_binary() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(DAEMON_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    let current_exe = std::env::current_exe().context("cannot locate the current executable")?;
    let exe_dir = current_exe
        .parent()
        .context("cannot locate the executable directory")?;

    let daemon_name = if cfg!(windows) {
        "vigil-daemon.exe"
    } else {
        "vigil-daemon"
    };

    let sibling_path = exe_dir.join(daemon_name);
    if sibling_path.exists() {
        return Ok(sibling_path);
    }

    if let Ok(path) = which::which(daemon_name) {
        return Ok(path);
    }

    bail!(
        "vigil-daemon not found. Make sure it is installed or set {}",
        DAEMON_PATH_ENV
    );
}

async fn wait_for_socket(socket_path: &Path) -> Result<()> {
    let start = std::time::Instant::now();

    while start.elapsed() < DAEMON_STARTUP_TIMEOUT {
        if socket_path.exists() {
            return Ok(());
        }
        sleep(DAEMON_POLL_INTERVAL).await;
    }

    bail!(
        "timeout: the daemon did not start within {} seconds",
        DAEMON_STARTUP_TIMEOUT.as_secs()
    );
}
