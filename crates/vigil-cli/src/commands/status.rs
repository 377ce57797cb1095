use crate::client::{ClientError, DaemonClient};
use anyhow::Result;
use serde::Serialize;
use vigil_core::format::format_timestamp;
use vigil_protocol::{Request, Response};

#[derive(Debug, PartialEq, Serialize)]
struct StatusOutput {
    running: bool,
    active_package: Option<String>,
    active_since_ms: Option<i64>,
    active_since: Option<String>,
    pending_reports: u64,
}

pub async fn execute(json: bool) -> Result<()> {
    match DaemonClient::new().send(Request::GetStatus).await {
        Ok(Response::Status {
            running,
            active_package,
            active_since_ms,
            pending_reports,
        }) => {
            let output = StatusOutput {
                running,
                active_since: active_since_ms.map(format_timestamp),
                active_package,
                active_since_ms,
                pending_reports,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print_formatted(&output);
            }
        }
        Ok(Response::Error { message }) => {
            fail(json, &message);
        }
        Ok(_) => {
            fail(json, "unexpected response from the daemon");
        }
        Err(ClientError::DaemonNotRunning) => {
            if json {
                println!(r#"{{"error": "daemon not running", "running": false}}"#);
            } else {
                println!("⚫ Daemon not running");
            }
        }
        Err(error) => {
            fail(json, &error.to_string());
        }
    }

    Ok(())
}

fn fail(json: bool, message: &str) -> ! {
    if json {
        println!("{}", serde_json::json!({ "error": message }));
    } else {
        eprintln!("Error: {}", message);
    }
    std::process::exit(1);
}

fn print_formatted(status: &StatusOutput) {
    if !status.running {
        println!("⚪ Tracking stopped");
    } else {
        println!("🟢 Tracking");
        match (&status.active_package, &status.active_since) {
            (Some(package), Some(since)) => println!("   Foreground: {} since {}", package, since),
            (Some(package), None) => println!("   Foreground: {}", package),
            _ => println!("   Foreground: nothing tracked"),
        }
    }

    println!("   {}", pending_line(status.pending_reports));
}

fn pending_line(count: u64) -> String {
    match count {
        0 => "No pending reports".to_string(),
        1 => "1 pending report".to_string(),
        n => format!("{} pending reports", n),
    }
}
