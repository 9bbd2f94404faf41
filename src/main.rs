//! `license-compat`: detect module and dependency licenses and report
//! compatibility conflicts across a multi-module project.
//!
//! # Flow (`check`)
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load config ([`config::load_config`]).
//! 3. Discover modules, license files and declared dependencies ([`workspace`]).
//! 4. Optionally enrich dependencies from the remote repository (`--online`, [`registry`]).
//! 5. Compute compatible licenses and issues ([`compat`]).
//! 6. Render the requested report ([`report`]).
//! 7. Exit `0` (clean) or `1` (issues found and `fail_on_issues` set).
//!
//! `watch` runs the same pipeline through the coalescing [`refresh`]
//! coordinator on every relevant file-system change ([`watch`]).

mod cli;
mod compat;
mod config;
mod error;
mod license;
mod models;
mod refresh;
mod registry;
mod report;
mod watch;
mod workspace;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ReportFormat};
use compat::{analyze, CompatibilityReport};
use config::{load_config, Config};
use license::detection::DetectionManager;
use license::SupportedLicense;
use models::ProjectSnapshot;
use refresh::{ProjectSource, RefreshCoordinator, RefreshTrigger};
use registry::maven::MavenCentralClient;
use report::export::ExportDocument;
use watch::ProjectWatcher;
use workspace::WorkspaceScanner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Check {
            path,
            online,
            report,
            export,
        } => {
            let path = resolve(path);
            let config = load_config(&path, cli.config.as_deref())?;
            let has_issues =
                run_check(&cli, &config, &path, *online, *report, export.as_deref()).await?;
            if has_issues && config.check.fail_on_issues {
                std::process::exit(1);
            }
        }
        Command::Watch { path, online } => {
            let path = resolve(path);
            let config = load_config(&path, cli.config.as_deref())?;
            run_watch(&cli, &config, &path, *online).await?;
        }
        Command::Detect { file } => {
            let config = load_config(Path::new("."), cli.config.as_deref())?;
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let detection = DetectionManager::from_config(&config.detection)
                .detect_full_text_with_stage(&text);
            if detection.license == SupportedLicense::NoLicense {
                println!("{} no license recognised", "✗".red());
            } else {
                println!(
                    "{} {} ({})",
                    "✓".green(),
                    detection.license.spdx_id().bold(),
                    detection.license.name()
                );
            }
            println!("  stage: {}", detection.stage);
        }
        Command::Identify { name } => {
            let config = load_config(Path::new("."), cli.config.as_deref())?;
            let license =
                DetectionManager::from_config(&config.detection).detect_by_name_or_spdx(name);
            match license.as_known() {
                Some(known) => {
                    println!("{} {} ({})", "✓".green(), known.spdx_id().bold(), known.name())
                }
                None if license.is_no_license() => println!("{} no license", "✗".red()),
                None => println!("{} unsupported license: {}", "?".yellow(), license.name()),
            }
        }
        Command::Generate {
            path,
            license,
            output,
            force,
        } => {
            let path = resolve(path);
            let config = load_config(&path, cli.config.as_deref())?;
            let output = output.clone().unwrap_or_else(|| path.join("LICENSE"));
            run_generate(&config, &path, license.as_deref(), &output, *force).await?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `debug` with `--verbose`, `warn` by default.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn project_source(
    config: &Config,
    path: &Path,
    online: bool,
    progress: Option<ProgressBar>,
) -> Result<ProjectSource> {
    let detection = DetectionManager::from_config(&config.detection);
    let scanner = WorkspaceScanner::new(path, &config.workspace, detection);
    let mut source = ProjectSource::new(scanner, config.check.clone());

    if online {
        let client = MavenCentralClient::new(&config.remote).context("building HTTP client")?;
        source = source.with_remote(Arc::new(client), config.remote.clone());
        if let Some(pb) = progress {
            source = source.with_progress(pb);
        }
    }
    Ok(source)
}

fn progress_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("#>-"),
    );
    pb.set_message("license metadata");
    Ok(pb)
}

async fn run_check(
    cli: &Cli,
    config: &Config,
    path: &Path,
    online: bool,
    format: ReportFormat,
    export: Option<&Path>,
) -> Result<bool> {
    let show_progress = online && !cli.quiet && format == ReportFormat::Terminal;
    let progress = if show_progress { Some(progress_bar()?) } else { None };
    let source = project_source(config, path, online, progress)?;

    let snapshot = source.load_snapshot().await?;
    if snapshot.modules.len() <= 1 && snapshot.dependencies.is_empty() && !cli.quiet {
        eprintln!(
            "  {} no build manifests found under {}",
            "→".cyan(),
            path.display()
        );
    }
    let report = analyze(&snapshot);
    info!(
        modules = report.modules.len(),
        dependencies = snapshot.dependencies.len(),
        issues = report.issues.issue_count(),
        "analysis complete"
    );

    let document = ExportDocument::new(&snapshot, &report);
    match format {
        ReportFormat::Terminal => {
            report::terminal::render(&snapshot, &report, path, cli.verbose, cli.quiet)
        }
        ReportFormat::Json => println!("{}", document.to_json()?),
    }
    if let Some(file) = export {
        document.write_to(file)?;
        if !cli.quiet && format == ReportFormat::Terminal {
            println!(" {} report written to {}", "→".cyan(), file.display());
        }
    }

    Ok(report.has_issues())
}

async fn run_watch(cli: &Cli, config: &Config, path: &Path, online: bool) -> Result<()> {
    let source = project_source(config, path, online, None)?;
    let coordinator = RefreshCoordinator::new(Arc::new(source), &config.watch);
    let mut watcher = ProjectWatcher::start(path, &config.workspace.exclude_dirs)?;
    let mut outcomes = coordinator.subscribe();
    let mut busy = coordinator.busy();

    if !cli.quiet {
        eprintln!("  {} watching {} (Ctrl-C to stop)", "→".cyan(), path.display());
    }
    coordinator.request(RefreshTrigger::Immediate);

    loop {
        tokio::select! {
            trigger = watcher.next_trigger() => match trigger {
                Some(trigger) => {
                    coordinator.request(trigger);
                }
                None => break,
            },
            changed = outcomes.changed() => {
                if changed.is_err() {
                    break;
                }
                let outcome = outcomes.borrow_and_update().clone();
                if let Some(outcome) = outcome {
                    report::terminal::render(
                        &outcome.snapshot,
                        &outcome.report,
                        path,
                        cli.verbose,
                        cli.quiet,
                    );
                }
            }
            changed = busy.changed() => {
                if changed.is_err() {
                    break;
                }
                if *busy.borrow_and_update() && !cli.quiet {
                    eprintln!("  {} refreshing", "→".cyan());
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn run_generate(
    config: &Config,
    path: &Path,
    requested: Option<&str>,
    output: &Path,
    force: bool,
) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let license = match requested {
        Some(name) => {
            let detection = DetectionManager::from_config(&config.detection);
            match detection.detect_by_name_or_spdx(name).as_known() {
                Some(license) => license,
                None => bail!("unknown license {name:?}"),
            }
        }
        None => {
            let source = project_source(config, path, false, None)?;
            let snapshot = source.load_snapshot().await?;
            let report = analyze(&snapshot);
            recommended_root_license(&snapshot, &report).with_context(|| {
                format!("no license is compatible with the root module of {}", path.display())
            })?
        }
    };

    std::fs::write(output, license.full_text())
        .with_context(|| format!("writing {}", output.display()))?;
    println!("{} wrote {} to {}", "✓".green(), license.spdx_id().bold(), output.display());
    Ok(())
}

fn recommended_root_license(
    snapshot: &ProjectSnapshot,
    report: &CompatibilityReport,
) -> Option<SupportedLicense> {
    let root = snapshot.root_module()?;
    report.module(&root.name)?.recommended()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_writes_catalog_text() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("LICENSE");
        run_generate(&Config::default(), dir.path(), Some("MIT"), &output, false)
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            SupportedLicense::Mit.full_text()
        );
    }

    #[tokio::test]
    async fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("LICENSE");
        std::fs::write(&output, "keep me").unwrap();

        assert!(run_generate(&Config::default(), dir.path(), Some("MIT"), &output, false)
            .await
            .is_err());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "keep me");

        run_generate(&Config::default(), dir.path(), Some("Apache-2.0"), &output, true)
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            SupportedLicense::Apache2.full_text()
        );
    }

    #[tokio::test]
    async fn test_generate_defaults_to_best_root_license() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("LICENSE");
        run_generate(&Config::default(), dir.path(), None, &output, false)
            .await
            .unwrap();
        // Unconstrained root: the first recommended-tier license.
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            SupportedLicense::Apache2.full_text()
        );
    }

    #[tokio::test]
    async fn test_generate_rejects_unknown_license() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("LICENSE");
        assert!(run_generate(&Config::default(), dir.path(), Some("Acme Corp EULA"), &output, false)
            .await
            .is_err());
        assert!(!output.exists());
    }
}
