use crate::client::DaemonClient;
use anyhow::{bail, Result};
use std::time::Duration;
use vigil_core::{Config, DeliveryConfig};
use vigil_protocol::{FlushOutcome, Request, Response};

use super::client_failure;

const FLUSH_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

pub async fn execute() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let outcome = request_flush(&DaemonClient::new(), &config.delivery).await?;
    println!("{}", describe_outcome(outcome));
    Ok(())
}

/// The daemon answers once the whole pass is over, so the wait scales with the backlog.
pub(super) async fn request_flush(
    client: &DaemonClient,
    delivery: &DeliveryConfig,
) -> Result<FlushOutcome> {
    let pending = match client.send(Request::GetStatus).await {
        Ok(Response::Status {
            pending_reports, ..
        }) => pending_reports,
        Ok(Response::Error { message }) => bail!("{}", message),
        Ok(_) => bail!("unexpected response from the daemon"),
        Err(error) => return Err(client_failure(error)),
    };

    let flush_client = client.clone().with_timeout(flush_timeout(delivery, pending));

    match flush_client.send(Request::FlushNow).await {
        Ok(Response::Flushed { outcome }) => Ok(outcome),
        Ok(Response::Error { message }) => bail!("{}", message),
        Ok(_) => bail!("unexpected response from the daemon"),
        Err(error) => Err(client_failure(error)),
    }
}

/// Worst case of one connect and one read timeout per pending report, plus a margin.
fn flush_timeout(delivery: &DeliveryConfig, pending: u64) -> Duration {
    let per_report = delivery
        .connect_timeout_seconds
        .saturating_add(delivery.read_timeout_seconds);
    Duration::from_secs(per_report.saturating_mul(pending.max(1))) + FLUSH_TIMEOUT_MARGIN
}

pub(super) fn describe_outcome(outcome: FlushOutcome) -> String {
    match outcome {
        FlushOutcome::Busy => "⏳ A delivery pass is already running".to_string(),
        FlushOutcome::NotConfigured => {
            "⚠️  Telegram credentials missing, reports stay queued (run `vigil init`)".to_string()
        }
        FlushOutcome::Completed { delivered: 0 } => "✅ Nothing to deliver".to_string(),
        FlushOutcome::Completed { delivered } => format!("✅ Delivered {} report(s)", delivered),
        FlushOutcome::Halted {
            delivered,
            remaining,
        } => format!(
            "⚠️  Delivered {} report(s), {} still pending after a failed delivery",
            delivered, remaining
        ),
        FlushOutcome::StorageUnavailable => "❌ The outbox could not be read".to_string(),
    }
}
