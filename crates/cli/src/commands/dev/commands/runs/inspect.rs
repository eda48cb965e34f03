use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Parser;
use vault_ops_common::logger;

use crate::utils::{report, runlog};

#[derive(Debug, Clone, Parser)]
pub struct RunsInspectArgs {
    /// Run directory to inspect; defaults to the latest run
    pub dir: Option<PathBuf>,
}

pub async fn run(args: RunsInspectArgs) -> anyhow::Result<()> {
    let session_dir = match args.dir {
        Some(dir) => dir,
        None => find_latest_run_dir(&runlog::default_runs_root())?,
    };
    print_run_info(&session_dir)
}

pub fn print_run_info(session_dir: &Path) -> Result<()> {
    let run = runlog::read_report(session_dir)?;

    logger::info(format!("Run: {}", session_dir.display()));
    let name = session_dir
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if let Some(dt) = runlog::parse_unix_ms_prefix(name)
        .and_then(|ts_ms| Utc.timestamp_millis_opt(ts_ms).single())
    {
        logger::info(format!("Time (UTC): {}", dt.to_rfc3339()));
    }
    report::print(&run);
    if let Some(error) = &run.error {
        logger::warn(format!("Aborted: {error}"));
    }
    logger::outro("");
    Ok(())
}

/// Directory with the largest timestamp prefix.
pub fn find_latest_run_dir(root: &Path) -> Result<PathBuf> {
    runlog::list_runs(root)?
        .into_iter()
        .next()
        .map(|(_, path)| path)
        .with_context(|| format!("no session directories found in {}", root.display()))
}
