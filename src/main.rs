use anyhow::Context;
use clap::{Parser, Subcommand};
use parvault::{Config, Orchestrator, PathSet, SizeAggregator, TreeReport, UnitFailure};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "parvault")]
#[command(about = "Seal folders into 7z archives with PAR2 recovery data", long_about = None)]
struct Cli {
    /// JSON configuration file; missing keys take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print reports as JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Archive every subfolder of ROOT and generate recovery data
    Protect {
        root: PathBuf,
        /// Treat ROOT itself as the only folder to protect
        #[arg(long)]
        single: bool,
    },
    /// Verify, repair and extract every archive under ROOT
    Restore {
        root: PathBuf,
        /// Report damage without attempting a repair
        #[arg(long)]
        no_repair: bool,
    },
    /// Find byte-identical files under ROOT
    Dupes {
        root: PathBuf,
        /// Extension to include (repeatable); defaults to the configured list
        #[arg(long = "ext")]
        extensions: Vec<String>,
        /// Move redundant copies into the quarantine folder
        #[arg(long)]
        quarantine: bool,
    },
    /// Total size of PATHS, counting nested paths once
    Size {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Show the recovery plan for PATHS under the current configuration
    Plan {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_failures(failures: &[UnitFailure]) {
    for failure in failures {
        println!(
            "  FAILED {} [{}]: {}",
            failure.path.display(),
            failure.code,
            failure.error
        );
    }
}

fn tree_exit<T>(report: &TreeReport<T>) -> ExitCode {
    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Protect { root, single } => {
            let orchestrator = Orchestrator::from_config(config)?;
            if single {
                let report = orchestrator.protect_folder(&root).await?;
                if cli.json {
                    print_json(&report)?;
                } else {
                    println!(
                        "{}: {:?}, {} volume(s), recovery {}",
                        root.display(),
                        report.job.status(),
                        report.volumes.len(),
                        report.recovery.output().display()
                    );
                }
                return Ok(ExitCode::SUCCESS);
            }

            let report = orchestrator.protect_tree(&root).await?;
            if cli.json {
                print_json(&report)?;
            } else {
                for unit in &report.completed {
                    println!(
                        "  {:?} {} ({} volume(s))",
                        unit.job.status(),
                        unit.job.archive_path.display(),
                        unit.volumes.len()
                    );
                }
                print_failures(&report.failures);
                println!(
                    "protected {} folder(s), {} failed",
                    report.completed.len(),
                    report.failures.len()
                );
            }
            Ok(tree_exit(&report))
        }

        Commands::Restore { root, no_repair } => {
            if no_repair {
                config.restore.attempt_repair = false;
            }
            let orchestrator = Orchestrator::from_config(config)?;
            let report = orchestrator.restore_tree(&root).await?;
            if cli.json {
                print_json(&report)?;
            } else {
                for unit in &report.completed {
                    println!(
                        "  {} {} -> {}",
                        unit.outcome,
                        unit.archive.display(),
                        unit.destination.display()
                    );
                }
                print_failures(&report.failures);
                println!(
                    "restored {} archive(s), {} failed",
                    report.completed.len(),
                    report.failures.len()
                );
            }
            Ok(tree_exit(&report))
        }

        Commands::Dupes {
            root,
            extensions,
            quarantine,
        } => {
            let orchestrator = Orchestrator::from_config(config)?;
            let filter = (!extensions.is_empty()).then_some(extensions.as_slice());
            let report = orchestrator.deduplicate(&root, filter, quarantine)?;
            let failed = report.quarantine.as_ref().map_or(0, |q| q.failed.len());

            if cli.json {
                print_json(&report)?;
            } else {
                for group in &report.groups {
                    println!("{} ({} bytes)", group.hash.to_hex(), group.size);
                    for path in &group.paths {
                        println!("  {}", path.display());
                    }
                }
                if let Some(quarantine) = &report.quarantine {
                    for failure in &quarantine.failed {
                        println!("  FAILED {}: {}", failure.path.display(), failure.error);
                    }
                    println!(
                        "{} duplicate group(s), {} moved, {} failed",
                        report.groups.len(),
                        quarantine.moved.len(),
                        failed
                    );
                } else {
                    println!("{} duplicate group(s)", report.groups.len());
                }
            }
            Ok(if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Size { paths } => {
            let set = PathSet::resolve(paths);
            let total = SizeAggregator.size_of_set(set.iter())?;
            if cli.json {
                print_json(&serde_json::json!({ "paths": set.len(), "bytes": total }))?;
            } else {
                println!("{} bytes in {} path(s)", total, set.len());
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Plan { paths } => {
            let orchestrator = Orchestrator::from_config(config)?;
            let recovery = orchestrator.config().recovery.clone();
            let plan = orchestrator.planner().plan(
                &paths,
                recovery.redundancy_percent,
                recovery.slice_size_factor,
                recovery.max_recovery_file_size,
            )?;
            let output = parvault::recovery::recovery_output_path(&paths)?;
            if cli.json {
                print_json(&serde_json::json!({
                    "plan": plan,
                    "output": output,
                    "recovery_bytes": plan.estimated_recovery_bytes(),
                    "recovery_files": plan.recovery_file_count(),
                }))?;
            } else {
                println!(
                    "{} bytes protected at {}%: ~{} recovery bytes in {} file(s), control file {}",
                    plan.protected_byte_total,
                    plan.redundancy_percent,
                    plan.estimated_recovery_bytes(),
                    plan.recovery_file_count(),
                    output.display()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match parvault::run_until_signal(run(cli)).await {
        Some(Ok(code)) => code,
        Some(Err(e)) => {
            let message = format!("{:#}", e);
            error!(error = %message, "parvault failed");
            ExitCode::FAILURE
        }
        None => {
            warn!("interrupted");
            ExitCode::from(130)
        }
    }
}
