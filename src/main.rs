//! labelkeep CLI
//!
//! Command line tool for reconciling GitHub repository labels against
//! a declarative specification

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use labelkeep::{
    apply::{Applier, ApplyOptions, ApplyOutcome, ApplyStatus, TerminalInteraction},
    github::{GitHubClient, LabelStore},
    reconcile::{reconcile, ReconcileOptions},
    render, report,
    report::Report,
    spec,
    spec::LabelSpec,
    Error,
};

/// labelkeep CLI
#[derive(Parser)]
#[command(
    name = "labelkeep",
    version,
    about = "Manage labels for a GitHub repository",
    long_about = "Reconciles the labels of a GitHub repository against a declarative \
    specification. Reports differences as Markdown, JSON, or a summary table, and \
    applies them with per-operation-kind gating."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GitHub access token (also settable with the GITHUB_ACCESS_TOKEN
    /// environment variable)
    #[arg(short = 'T', long, global = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the current state of the labels
    Report {
        /// GitHub target in the format namespace/repo or namespace
        target: String,

        /// Path to a label specification source (repeatable)
        #[arg(short, long, required = true)]
        source: Vec<PathBuf>,

        /// Recognize aliases and list them as renames
        #[arg(short, long)]
        alias: bool,

        /// List optional labels as required
        #[arg(short, long)]
        optional: bool,

        /// Output format
        #[arg(short, long, default_value = "markdown", value_parser = ["markdown", "json", "summary"])]
        format: String,
    },

    /// Sync labels with a target
    Sync {
        /// GitHub target in the format namespace/repo or namespace
        target: String,

        /// Path to a label specification source (repeatable)
        #[arg(short, long, required = true)]
        source: Vec<PathBuf>,

        /// Create missing labels
        #[arg(short, long)]
        create: bool,

        /// Delete extra labels
        #[arg(short, long)]
        delete: bool,

        /// Modify existing labels
        #[arg(short, long)]
        modify: bool,

        /// Rename aliases to the canonical name
        #[arg(short, long)]
        alias: bool,

        /// Treat optional labels as required
        #[arg(short, long)]
        optional: bool,

        /// Automatically answer yes for all questions
        #[arg(short = 'y', long)]
        assumeyes: bool,
    },

    /// Apply a report stored as a json file
    Apply {
        /// The report json file
        source: PathBuf,

        /// Create missing labels
        #[arg(short, long)]
        create: bool,

        /// Delete extra labels
        #[arg(short, long)]
        delete: bool,

        /// Modify existing labels
        #[arg(short, long)]
        modify: bool,

        /// Automatically answer yes for all questions
        #[arg(short = 'y', long)]
        assumeyes: bool,
    },

    /// Convert a json report into any of the other formats
    Reformat {
        /// The report json file
        source: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "markdown", value_parser = ["markdown", "json", "summary"])]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{} {}", "Error:".red(), err);
            let code = err
                .downcast_ref::<Error>()
                .map(Error::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let token = cli
        .token
        .or_else(|| std::env::var("GITHUB_ACCESS_TOKEN").ok());

    match cli.command {
        Commands::Report {
            target,
            source,
            alias,
            optional,
            format,
        } => {
            if token.is_none() {
                eprintln!(
                    "{}",
                    "Warning: No access token defined. Only publicly visible data is available!"
                        .yellow()
                );
            }

            let desired = spec::load_sources(&source)?;
            let options = ReconcileOptions {
                optional_as_required: optional,
                aliases_as_renames: alias,
            };

            let client = GitHubClient::new(token.as_deref()).await?;
            let reports = build_reports(&client, &target, &desired, &source, options).await?;
            print_reports(&format, &reports)?;
            Ok(0)
        }

        Commands::Sync {
            target,
            source,
            create,
            delete,
            modify,
            alias,
            optional,
            assumeyes,
        } => {
            let token = require_token(token)?;
            check_action_flags(create, delete, modify)?;

            let desired = spec::load_sources(&source)?;
            let options = ReconcileOptions {
                optional_as_required: optional,
                aliases_as_renames: alias,
            };

            let client = GitHubClient::new(Some(&token)).await?;
            let reports = build_reports(&client, &target, &desired, &source, options).await?;

            let apply_options = ApplyOptions {
                create,
                modify,
                delete,
                assume_yes: assumeyes,
            };
            run_apply(&client, &reports, apply_options).await
        }

        Commands::Apply {
            source,
            create,
            delete,
            modify,
            assumeyes,
        } => {
            let token = require_token(token)?;
            check_action_flags(create, delete, modify)?;

            let reports = report::load_reports(&source)
                .with_context(|| format!("failed to load report file {}", source.display()))?;

            let client = GitHubClient::new(Some(&token)).await?;
            let apply_options = ApplyOptions {
                create,
                modify,
                delete,
                assume_yes: assumeyes,
            };
            run_apply(&client, &reports, apply_options).await
        }

        Commands::Reformat { source, format } => {
            let reports = report::load_reports(&source)
                .with_context(|| format!("failed to load report file {}", source.display()))?;
            print_reports(&format, &reports)?;
            Ok(0)
        }
    }
}

/// Split a target into namespace and optional repository
fn parse_target(target: &str) -> Result<(String, Option<String>), Error> {
    let parts: Vec<&str> = target.split('/').collect();
    match parts.as_slice() {
        [namespace] if !namespace.is_empty() => Ok(((*namespace).to_string(), None)),
        [namespace, repository] if !namespace.is_empty() && !repository.is_empty() => {
            Ok(((*namespace).to_string(), Some((*repository).to_string())))
        }
        _ => Err(Error::InvalidTarget(target.to_string())),
    }
}

fn require_token(token: Option<String>) -> anyhow::Result<String> {
    token.ok_or_else(|| {
        anyhow::anyhow!("No access token defined (use --token or GITHUB_ACCESS_TOKEN)")
    })
}

fn check_action_flags(create: bool, delete: bool, modify: bool) -> Result<(), Error> {
    if !create && !delete && !modify {
        return Err(Error::usage(
            "At least one of --create, --delete, --modify must be set",
        ));
    }
    Ok(())
}

/// Reconcile the target, expanding a bare namespace into all of its
/// non-archived repositories
async fn build_reports(
    client: &GitHubClient,
    target: &str,
    desired: &[LabelSpec],
    sources: &[PathBuf],
    options: ReconcileOptions,
) -> anyhow::Result<Vec<Report>> {
    let source_names: Vec<String> = sources.iter().map(|p| p.display().to_string()).collect();
    let (namespace, repository) = parse_target(target)?;

    let mut reports = Vec::new();
    match repository {
        Some(repository) => {
            let observed = client.list_labels(&namespace, &repository).await?;
            reports.push(reconcile(
                desired,
                &observed,
                &namespace,
                &repository,
                &source_names,
                options,
            ));
        }
        None => {
            for repo in client.list_repositories(&namespace).await? {
                if repo.archived {
                    continue;
                }
                let observed = client.list_labels(&repo.namespace, &repo.name).await?;
                reports.push(reconcile(
                    desired,
                    &observed,
                    &repo.namespace,
                    &repo.name,
                    &source_names,
                    options,
                ));
            }
        }
    }

    Ok(reports)
}

/// Print reports in the requested format
fn print_reports(format: &str, reports: &[Report]) -> anyhow::Result<()> {
    match format {
        "markdown" => {
            if reports.len() > 1 {
                println!("# Namespace: {}\n", reports[0].namespace);
                println!("{}", render::summary_table(reports));
            }
            for item in reports {
                if reports.len() == 1 || item.has_changes() {
                    println!("{}", render::markdown_report(item));
                }
            }
        }
        "summary" => println!("{}", render::summary_table(reports)),
        "json" => println!("{}", report::to_json(reports)?),
        other => anyhow::bail!("Unsupported format '{other}'"),
    }
    Ok(())
}

/// Apply each report in order, returning the process exit code
async fn run_apply(
    client: &GitHubClient,
    reports: &[Report],
    options: ApplyOptions,
) -> anyhow::Result<i32> {
    let applier = Applier::new(client, options);
    let mut interaction = TerminalInteraction;
    let mut failed = false;

    for item in reports {
        let outcome = applier.apply(item, &mut interaction).await;
        display_outcome(item, &outcome);
        failed |= outcome.has_failures();
    }

    Ok(if failed { 1 } else { 0 })
}

/// Display the execution log of one applied report
fn display_outcome(applied: &Report, outcome: &ApplyOutcome) {
    if outcome.results.is_empty() {
        println!("{} {}: nothing to do", "✓".green(), applied.target().cyan());
        return;
    }

    let marker = if outcome.has_failures() {
        "✗".red()
    } else {
        "✓".green()
    };
    println!(
        "{} {}: {} applied, {} skipped, {} failed",
        marker,
        applied.target().cyan(),
        outcome.applied().to_string().green(),
        outcome.skipped().to_string().yellow(),
        outcome.failed().to_string().red(),
    );

    for result in &outcome.results {
        if let ApplyStatus::Failed(reason) = &result.status {
            eprintln!("  {} {}: {}", "✗".red(), result.name, reason.red());
        }
    }
}
