use std::path::Path;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Parser;
use vault_ops_common::logger;

use crate::utils::runlog;

#[derive(Debug, Clone, Parser)]
pub struct RunsListArgs {
    /// Only show the most recent runs
    #[clap(long)]
    pub limit: Option<usize>,
}

pub async fn run(args: RunsListArgs) -> anyhow::Result<()> {
    let runs_root = runlog::default_runs_root();
    print_runs_list(&runs_root, args.limit)
}

/// Print archived runs, newest first.
pub fn print_runs_list(runs_dir: &Path, limit: Option<usize>) -> Result<()> {
    let runs = runlog::list_runs(runs_dir)?;
    if runs.is_empty() {
        logger::outro(format!("No runs in {}", runs_dir.display()));
        return Ok(());
    }
    for (ts_ms, path) in runs.into_iter().take(limit.unwrap_or(usize::MAX)) {
        let when = Utc
            .timestamp_millis_opt(ts_ms)
            .single()
            .map_or_else(|| ts_ms.to_string(), |dt| dt.to_rfc3339());
        println!("[{}] {}", when, path.display());
    }
    Ok(())
}
