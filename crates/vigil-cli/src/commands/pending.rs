use anyhow::{Context, Result};
use serde::Serialize;
use vigil_adapters::SqliteReportOutbox;
use vigil_core::{Config, ReportOutbox};

#[derive(Debug, Serialize)]
struct PendingEntry {
    id: String,
    kind: &'static str,
    timestamp_ms: i64,
    message: String,
}

/// Reads the outbox file directly, so it works while the daemon is down.
pub fn execute(json: bool) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let path = config.reports_database_path();
    let outbox = SqliteReportOutbox::new(&path)
        .with_context(|| format!("failed to open outbox at {}", path.display()))?;

    let entries = collect_entries(&outbox)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("✅ Outbox empty");
        return Ok(());
    }

    println!("📬 {} pending report(s)", entries.len());
    for entry in &entries {
        println!("\n[{}] {}", entry.kind, entry.id);
        for line in entry.message.lines() {
            println!("   {}", line);
        }
    }

    Ok(())
}

fn collect_entries(outbox: &dyn ReportOutbox) -> Result<Vec<PendingEntry>> {
    let mut reports = outbox.list_pending().context("failed to read the outbox")?;
    reports.sort_by_key(|report| report.timestamp_ms);

    Ok(reports
        .into_iter()
        .map(|report| PendingEntry {
            message: report.render_message(),
            kind: report.kind.as_str(),
            timestamp_ms: report.timestamp_ms,
            id: report.id,
        })
        .collect())
}
