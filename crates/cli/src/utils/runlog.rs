use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::Utc;
use ethers::types::Address;
use vault_ops_common::logger;
use vault_ops_config::REPORT_FILE;
use vault_ops_types::RunReport;

const RUNS_ROOT_ENV: &str = "VAULT_OPS_RUNS_ROOT";

/// Default root: ~/.vault-ops/runs
pub fn default_runs_root() -> PathBuf {
    if let Ok(path) = std::env::var(RUNS_ROOT_ENV) {
        PathBuf::from(path)
    } else {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".vault-ops").join("runs")
    }
}

/// Create the session directory (UTC timestamp + command label) and write the
/// report into it. Returns the created directory path.
pub fn persist_report_in(
    root: &Path,
    report: &RunReport,
    command_label: &str,
) -> anyhow::Result<PathBuf> {
    let ts_ms = Utc::now().timestamp_millis();
    let session_dir = root.join(format!("{}-{}", ts_ms, command_label));
    fs::create_dir_all(&session_dir)
        .with_context(|| format!("creating {}", session_dir.display()))?;
    let path = session_dir.join(REPORT_FILE);
    fs::write(&path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(session_dir)
}

/// Persists the report under the default root. A failure is logged and the
/// run carries on to report its own outcome.
pub fn archive(report: &RunReport, command_label: &str) -> Option<PathBuf> {
    archive_in(&default_runs_root(), report, command_label)
}

pub fn archive_in(root: &Path, report: &RunReport, command_label: &str) -> Option<PathBuf> {
    match persist_report_in(root, report, command_label) {
        Ok(session_dir) => {
            logger::info(format!("Report saved to {}", session_dir.display()));
            Some(session_dir)
        }
        Err(err) => {
            logger::warn(format!("Failed to archive the run report: {err:#}"));
            None
        }
    }
}

pub fn read_report(session_dir: &Path) -> anyhow::Result<RunReport> {
    let path = session_dir.join(REPORT_FILE);
    let raw = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse JSON in {}", path.display()))
}

/// Session directories under `root`, newest first.
pub fn list_runs(root: &Path) -> anyhow::Result<Vec<(i64, PathBuf)>> {
    let mut runs: Vec<(i64, PathBuf)> = fs::read_dir(root)
        .with_context(|| format!("reading {}", root.display()))?
        .filter_map(|entry_res| {
            let entry = entry_res.ok()?;
            if !entry.file_type().ok()?.is_dir() {
                return None;
            }
            let file_name = entry.file_name();
            let ts_ms = parse_unix_ms_prefix(file_name.to_str()?)?;
            Some((ts_ms, entry.path()))
        })
        .collect();
    runs.sort_by_key(|(ts_ms, _path)| std::cmp::Reverse(*ts_ms));
    Ok(runs)
}

/// Contracts that archived runs for the `vault`/`strategy` pair left
/// registered with the subsidy registry. Unreadable reports are skipped.
pub fn registered_contracts(
    root: &Path,
    vault: Address,
    strategy: Address,
) -> anyhow::Result<Vec<Address>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut registered = Vec::new();
    for (_, session_dir) in list_runs(root)? {
        let report = match read_report(&session_dir) {
            Ok(report) => report,
            Err(err) => {
                tracing::debug!(dir = %session_dir.display(), error = %err, "skipping run");
                continue;
            }
        };
        if report.vault != Some(vault) || report.strategy != Some(strategy) {
            continue;
        }
        for contract in report.registered_contracts() {
            if !registered.contains(&contract) {
                registered.push(contract);
            }
        }
    }
    Ok(registered)
}

pub fn parse_unix_ms_prefix(name: &str) -> Option<i64> {
    let ts_part = name.split('-').next()?;
    ts_part.parse::<i64>().ok()
}
