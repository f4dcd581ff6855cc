//! Top-level CLI definition and dispatch.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use colored::{Colorize, control};
use serde_json::json;
use thiserror::Error;

use removal_trial_engine::backup::SpaceValidation;
use removal_trial_engine::core::config::Config;
use removal_trial_engine::core::errors::RteError;
use removal_trial_engine::core::paths::resolve_absolute_path;
use removal_trial_engine::engine::RemovalTestEngine;
use removal_trial_engine::fsops::{FileOps, StdFs};
use removal_trial_engine::logger::{JsonlOpWriter, spawn_op_logger};
use removal_trial_engine::manifest::model::{ItemStatus, RemovalCandidate, RemovalJob};
use removal_trial_engine::manifest::store::JsonManifestStore;

/// Reversible removal trials for cleanup candidates.
#[derive(Debug, Parser)]
#[command(
    name = "rte",
    author,
    version,
    about = "Removal Trial Engine - reversible cleanup staging",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Show the active removal trial, if any.
    Status,
    /// Start a trial: disable the given paths (rename away, backup first
    /// when a backup root is configured or passed).
    Disable(DisableArgs),
    /// Rename every disabled item back and close the trial.
    RestoreAll,
    /// Permanently delete every disabled item.
    DeleteDisabled(ConfirmArgs),
    /// Restore a single disabled item by its original path.
    RestoreOne(ItemArgs),
    /// Permanently delete a single disabled item by its original path.
    DeleteOne(ItemConfirmArgs),
    /// Check free space at a backup destination for the given paths.
    CheckSpace(CheckSpaceArgs),
}

#[derive(Debug, Clone, Args)]
struct DisableArgs {
    /// Paths to disable.
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,
    /// Backup root; overrides the configured default.
    #[arg(long, value_name = "DIR")]
    backup: Option<PathBuf>,
    /// Skip the backup step even when a default root is configured.
    #[arg(long, conflicts_with = "backup")]
    no_backup: bool,
}

#[derive(Debug, Clone, Args)]
struct ConfirmArgs {
    /// Actually delete. Without this flag the command refuses to run.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Clone, Args)]
struct ItemArgs {
    /// Original path of the item.
    #[arg(value_name = "PATH")]
    path: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct ItemConfirmArgs {
    /// Original path of the item.
    #[arg(value_name = "PATH")]
    path: PathBuf,
    /// Actually delete. Without this flag the command refuses to run.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Clone, Args)]
struct CheckSpaceArgs {
    /// Paths that would be backed up.
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,
    /// Backup root; overrides the configured default.
    #[arg(long, value_name = "DIR")]
    backup: Option<PathBuf>,
}

/// CLI-level failures, wrapping engine errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] RteError),

    #[error("refusing to delete without --yes")]
    NeedsConfirmation,

    #[error("no backup root: pass --backup or set backup.default_root")]
    NoBackupRoot,
}

/// Parse config, build the engine, dispatch the subcommand.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }
    let config = Config::load(cli.config.as_deref())?;

    let writer = JsonlOpWriter::new(config.paths.operations_log.clone());
    let (log_handle, log_join) = spawn_op_logger(writer, config.engine.log_channel_capacity);

    let engine = RemovalTestEngine::new(
        Box::new(JsonManifestStore::new(config.paths.manifest_file.clone())),
        Arc::new(StdFs),
        Arc::new(log_handle.clone()),
        config.engine.disable_suffix.clone(),
    );

    let result = dispatch(cli, &config, &engine);

    // Flush pending operation records before exiting.
    log_handle.shutdown();
    let _ = log_join.join();

    result
}

fn dispatch(cli: &Cli, config: &Config, engine: &RemovalTestEngine) -> Result<(), CliError> {
    match &cli.command {
        Command::Status => {
            let trial = engine.active_trial()?;
            print_status(cli.json, trial.as_ref());
        }
        Command::Disable(args) => {
            let candidates = build_candidates(&args.paths)?;
            let backup_root = if args.no_backup {
                None
            } else {
                args.backup
                    .clone()
                    .or_else(|| config.backup.default_root.clone())
            };
            let job = engine.disable(candidates, backup_root)?;
            print_job(cli.json, &job);
        }
        Command::RestoreAll => {
            let job = engine.restore_all()?;
            print_job(cli.json, &job);
        }
        Command::DeleteDisabled(args) => {
            if !args.yes {
                return Err(CliError::NeedsConfirmation);
            }
            let outcome = engine.delete_all_disabled()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
            } else {
                println!(
                    "deleted {} item(s), freed {}",
                    outcome.deleted_count,
                    format_bytes(outcome.bytes_freed)
                );
                for item in &outcome.failed_items {
                    println!(
                        "  {} {}: {}",
                        "failed".red(),
                        item.original_path.display(),
                        item.error.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
        Command::RestoreOne(args) => {
            let job = engine.restore_single(&resolve_absolute_path(&args.path))?;
            print_job(cli.json, &job);
        }
        Command::DeleteOne(args) => {
            if !args.yes {
                return Err(CliError::NeedsConfirmation);
            }
            let job = engine.delete_single(&resolve_absolute_path(&args.path))?;
            print_job(cli.json, &job);
        }
        Command::CheckSpace(args) => {
            let backup_root = args
                .backup
                .clone()
                .or_else(|| config.backup.default_root.clone())
                .ok_or(CliError::NoBackupRoot)?;
            let mut candidates = build_candidates(&args.paths)?;
            apply_headroom(&mut candidates, config.backup.headroom_pct);
            let report = engine.validate_backup_space(&backup_root, &candidates);
            print_space(cli.json, &backup_root, &report);
        }
    }
    Ok(())
}

/// Stat the given paths into upstream-shaped candidates.
fn build_candidates(paths: &[PathBuf]) -> Result<Vec<RemovalCandidate>, CliError> {
    let ops = StdFs;
    let mut out = Vec::with_capacity(paths.len());
    for raw in paths {
        let path = resolve_absolute_path(raw);
        let size_bytes = ops.size_recursive(&path)?;
        let last_modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        out.push(RemovalCandidate {
            path,
            size_bytes,
            last_modified,
        });
    }
    Ok(out)
}

fn apply_headroom(candidates: &mut [RemovalCandidate], headroom_pct: f64) {
    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    for c in candidates {
        c.size_bytes = (c.size_bytes as f64 * (1.0 + headroom_pct / 100.0)).ceil() as u64;
    }
}

// ──────────────────── output helpers ────────────────────

fn print_status(as_json: bool, trial: Option<&RemovalJob>) {
    if as_json {
        let doc = trial.map_or_else(|| json!({ "active": false }), |job| {
            json!({ "active": true, "job": job })
        });
        println!("{}", serde_json::to_string_pretty(&doc).unwrap_or_default());
        return;
    }
    match trial {
        None => println!("no active removal trial"),
        Some(job) => print_job(false, job),
    }
}

fn print_job(as_json: bool, job: &RemovalJob) {
    if as_json {
        println!("{}", serde_json::to_string_pretty(job).unwrap_or_default());
        return;
    }
    println!(
        "trial {} [{}] {} item(s), {}",
        job.job_id,
        job.phase,
        job.items.len(),
        format_bytes(job.total_bytes)
    );
    if let Some(root) = &job.backup_location {
        println!("  backup: {}", root.display());
    }
    for item in &job.items {
        let status = match item.status {
            ItemStatus::Renamed => "renamed".yellow(),
            ItemStatus::Restored => "restored".green(),
            ItemStatus::Deleted => "deleted".green(),
            ItemStatus::Failed => "failed".red(),
            ItemStatus::Pending => "pending".normal(),
            ItemStatus::BackedUp => "backed_up".cyan(),
        };
        print!(
            "  {status:<9} {} ({})",
            item.original_path.display(),
            format_bytes(item.size_bytes)
        );
        if let Some(err) = &item.error {
            print!(" - {err}");
        }
        println!();
    }
}

fn print_space(as_json: bool, backup_root: &Path, report: &SpaceValidation) {
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "backup_root": backup_root,
                "report": report,
            }))
            .unwrap_or_default()
        );
        return;
    }
    let verdict = if report.is_valid {
        "OK".green()
    } else {
        "INSUFFICIENT".red()
    };
    println!(
        "{verdict}: {} required, {} available at {}",
        format_bytes(report.required_bytes),
        format_bytes(report.available_bytes),
        backup_root.display()
    );
    if let Some(warning) = &report.warning {
        println!("  {} {warning}", "warning:".yellow());
    }
    if let Some(error) = &report.error {
        println!("  {} {error}", "error:".red());
    }
}

fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * 1024 * 1024;
    #[allow(clippy::cast_precision_loss)]
    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.0} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}
