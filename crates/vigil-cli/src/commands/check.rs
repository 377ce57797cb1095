use crate::client::DaemonClient;
use anyhow::{bail, Result};
use vigil_core::format::{format_duration, format_timestamp};
use vigil_protocol::{Interruption, Request, Response};

use super::client_failure;

pub async fn execute() -> Result<()> {
    let interruption = request_check(&DaemonClient::new()).await?;
    println!("{}", describe_interruption(interruption.as_ref()));
    Ok(())
}

pub(super) async fn request_check(client: &DaemonClient) -> Result<Option<Interruption>> {
    match client.send(Request::CheckInterruption).await {
        Ok(Response::InterruptionChecked { interruption }) => Ok(interruption),
        Ok(Response::Error { message }) => bail!("{}", message),
        Ok(_) => bail!("unexpected response from the daemon"),
        Err(error) => Err(client_failure(error)),
    }
}

pub(super) fn describe_interruption(interruption: Option<&Interruption>) -> String {
    match interruption {
        None => "✅ No monitoring gap detected".to_string(),
        Some(gap) => format!(
            "⚠️  Monitoring was interrupted for {} ({} to {}), report queued",
            format_duration(gap.duration_ms),
            format_timestamp(gap.from_ms),
            format_timestamp(gap.to_ms)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_missing_gap() {
        assert_eq!(describe_interruption(None), "✅ No monitoring gap detected");
    }

    #[test]
    fn describes_gap_duration() {
        let gap = Interruption {
            from_ms: 0,
            to_ms: 600_000,
            duration_ms: 600_000,
        };

        assert!(describe_interruption(Some(&gap)).contains("interrupted for 10m 0s"));
    }
}
