//! # dirdelta CLI - Compare two directories and collect what changed
//!
//! Compares a previous and a next version of a directory and, unless told to
//! only compare, copies every difference into a changes directory with
//! `Modified/`, `Added/` and `Removed/` subfolders.
//!
//! ## Usage
//! ```bash
//! # Compare and copy changes into ./diff-v1-to-v2
//! dirdelta v1 v2
//!
//! # Choose the changes directory, replacing it if it exists
//! dirdelta v1 v2 changes --force-delete
//!
//! # Only compare, listing every path
//! dirdelta v1 v2 --diff-only --verbose
//! ```

use anyhow::Context;
use clap::Parser;
use colored::*;
use dirdelta::{
    default_output_dir, format_bytes, root_name, Category, ChangeMaterializer, ClassificationResult,
    CopyReport, DirDeltaError, ProgressInfo, TreeComparator,
};
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Compare versions of a directory and copy the differences for inspection
#[derive(Parser)]
#[command(name = "dirdelta")]
#[command(version)]
#[command(about = "Compare two directory trees and copy what changed into Modified/Added/Removed folders")]
#[command(long_about = None)]
struct Cli {
    /// Directory to compare against (usually: older version)
    prev: PathBuf,

    /// Directory to check for changes (usually: newer version)
    next: PathBuf,

    /// Directory where to store changes (defaults to diff-<prev>-to-<next>)
    changes: Option<PathBuf>,

    /// Delete an existing changes directory before copying
    #[arg(short = 'f', long = "force-delete", alias = "force")]
    force_delete: bool,

    /// Compare only, no copying
    #[arg(short, long)]
    diff_only: bool,

    /// Display full paths and every changed file
    #[arg(short, long)]
    verbose: bool,

    /// Ignore entries matching a glob pattern (repeatable)
    #[arg(short, long = "ignore", value_name = "GLOB")]
    ignore: Vec<String>,

    /// Worker threads for comparing and copying (0 = all cores)
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Compare symbolic links by target instead of following them
    #[arg(long)]
    no_follow_symlinks: bool,

    /// Print a single JSON document instead of the human-readable report
    #[arg(long)]
    json: bool,

    /// Show a progress bar while copying
    #[arg(long)]
    progress: bool,
}

/// Machine-readable output for `--json`
#[derive(Serialize)]
struct JsonOutput<'a> {
    prev: &'a Path,
    next: &'a Path,
    classification: &'a ClassificationResult,
    report: Option<&'a CopyReport>,
    error: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() || cli.json {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            let message = match e.downcast_ref::<DirDeltaError>() {
                Some(err) => err.user_message(),
                None => format!("{:#}", e),
            };
            eprintln!("{}: {}", "Error".red().bold(), message);
            ExitCode::FAILURE
        }
    }
}

/// Main command runner
fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let prev = absolute(&cli.prev)?;
    let next = absolute(&cli.next)?;
    let workers = if cli.jobs == 0 { num_cpus::get() } else { cli.jobs };
    let follow_symlinks = !cli.no_follow_symlinks;

    if cli.verbose && !cli.json {
        println!("{}", "Full paths:".bold());
        println!("  prev: {}", prev.display().to_string().cyan());
        println!("  next: {}", next.display().to_string().cyan());
        println!();
    }

    let result = TreeComparator::new()
        .follow_symlinks(follow_symlinks)
        .ignore_patterns(cli.ignore.clone())
        .parallel_workers(workers)
        .compare(&prev, &next)?;

    let prev_name = root_name(&prev);
    let next_name = root_name(&next);

    if !cli.json {
        show_summary(&result, &prev_name, &next_name);
    }

    let mut outcome: Option<dirdelta::Result<CopyReport>> = None;
    if !cli.diff_only {
        let out_root = match &cli.changes {
            Some(dir) => absolute(dir)?,
            None => absolute(&default_output_dir(&prev, &next))?,
        };
        let materializer = ChangeMaterializer::new(&out_root)
            .force_delete(cli.force_delete)
            .follow_symlinks(follow_symlinks)
            .ignore_patterns(cli.ignore.clone())
            .parallel_workers(workers);
        outcome = Some(copy_changes(&materializer, &result, &prev, &next, &cli));
    }

    let (report, fatal) = match outcome {
        Some(Ok(report)) => (Some(report), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    if cli.json {
        let output = JsonOutput {
            prev: &prev,
            next: &next,
            classification: &result,
            report: report.as_ref(),
            error: fatal.as_ref().map(|e| e.to_string()),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize report")?
        );
    } else {
        if let Some(report) = &report {
            show_copy_report(report);
        }
        if let Some(err) = &fatal {
            eprintln!("{}: {}\n", "Error".red().bold(), err.user_message());
        }
        if cli.verbose {
            show_details(&result, &prev_name, &next_name);
        }
    }

    Ok(if fatal.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Materialize changes, with an optional progress bar
fn copy_changes(
    materializer: &ChangeMaterializer,
    result: &ClassificationResult,
    prev: &Path,
    next: &Path,
    cli: &Cli,
) -> dirdelta::Result<CopyReport> {
    let out_root = materializer.out_root();
    if !cli.json {
        let displayed = if cli.verbose {
            format!("\n{}", out_root.display())
        } else {
            root_name(out_root)
        };
        println!(
            "{} ({} entries) to: {}",
            "Copying changes".blue().bold(),
            result.total_changes(),
            displayed.cyan()
        );
    }

    if !cli.progress || cli.json {
        return materializer.materialize(result, prev, next);
    }

    let pb = ProgressBar::new(result.total_changes() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let bar = pb.clone();
    let outcome = materializer.materialize_with_progress(
        result,
        prev,
        next,
        Some(move |info: ProgressInfo| {
            bar.set_position(info.processed as u64);
            if let Some(item) = info.current_item {
                bar.set_message(item);
            }
        }),
    );
    pb.finish_and_clear();
    outcome
}

/// Always-printed summary of the classification
fn show_summary(result: &ClassificationResult, prev_name: &str, next_name: &str) {
    println!(
        "{}",
        format!("Summary of changes from {} to {}:", prev_name, next_name).bold()
    );
    println!("Unchanged: {}", result.unchanged().len());
    println!("Modified:  {}", result.modified().len().to_string().yellow());
    println!("Added:     {}", result.added().len().to_string().green());
    println!("Removed:   {}", result.removed().len().to_string().red());
    println!();
}

/// Outcome of the copy step
fn show_copy_report(report: &CopyReport) {
    println!(
        "{} Done copying! {} copied, {} failed ({}) in {}",
        "✓".green().bold(),
        report.total_copied().to_string().cyan(),
        if report.total_failed() > 0 {
            report.total_failed().to_string().red()
        } else {
            report.total_failed().to_string().normal()
        },
        format_bytes(report.total_bytes()),
        format_duration(Duration::from_millis(report.duration_ms))
    );

    if !report.failures.is_empty() {
        println!("\n{}", "Failed copies:".yellow().bold());
        for failure in &report.failures {
            println!(
                "  - [{}] {}: {}",
                failure.category,
                failure.path.display().to_string().yellow(),
                failure.error
            );
        }
    }
    println!();
}

/// Full per-category listings for `--verbose`
fn show_details(result: &ClassificationResult, prev_name: &str, next_name: &str) {
    let rule = "==============================";
    println!("{}", format!("Details of changes from {} to {}:", prev_name, next_name).bold());
    for category in Category::CHANGES {
        println!("{}", rule.dimmed());
        println!("{}:", category.to_string().bold());
        for path in result.paths(category) {
            let line = path.display().to_string();
            let line = match category {
                Category::Added => line.green(),
                Category::Removed => line.red(),
                _ => line.yellow(),
            };
            println!("{}", line);
        }
    }
    println!();
}

/// Resolve a path against the current directory without touching the filesystem
fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Cannot resolve path {}", path.display()))
}
