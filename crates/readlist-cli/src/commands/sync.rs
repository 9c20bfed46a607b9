use readlist_core::config::ClientConfig;
use readlist_core::models::{Conflict, ConflictRecord, Side};
use readlist_core::services::SyncReport;
use readlist_core::ItemId;

use crate::commands::common::{format_conflict_lines, open_service};
use crate::error::CliError;

pub async fn run_sync(config: &ClientConfig) -> Result<(), CliError> {
    if !config.has_remote() {
        return Err(CliError::SyncNotConfigured);
    }

    let service = open_service(config).await?;
    let report = service.sync().await?;
    for line in format_sync_report(&report) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Sync completed: {} new, {} updated, {} merged, {} pushed",
        report.created.len(),
        report.applied.len(),
        report.merged.len(),
        report.pushed.len()
    )];
    if !report.conflicts.is_empty() {
        lines.push(format!(
            "New conflicts: {} (run `readlist conflicts`)",
            join_ids(&report.conflicts)
        ));
    }
    if !report.skipped.is_empty() {
        lines.push(format!("Unresolved, skipped: {}", join_ids(&report.skipped)));
    }
    lines
}

fn join_ids(ids: &[ItemId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn run_conflicts(as_json: bool, config: &ClientConfig) -> Result<(), CliError> {
    let service = open_service(config).await?;
    let conflicts = service.conflicts().await?;

    if as_json {
        let json_items = conflicts
            .iter()
            .map(Conflict::to_record)
            .collect::<Vec<ConflictRecord>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No conflicts pending.");
        return Ok(());
    }

    for line in format_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_resolve(id: ItemId, side: Side, config: &ClientConfig) -> Result<(), CliError> {
    let service = open_service(config).await?;
    let item = service.resolve(id, side).await?;
    let kept = match side {
        Side::Local => "local",
        Side::Remote => "remote",
    };
    println!("Resolved {} with {kept} version ({})", item.id, item.status);
    Ok(())
}
