use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docsmith::cli::commands::run::{RunOptions, SinkChoice};
use docsmith::cli::commands::scan::ScanOptions;

#[derive(Parser)]
#[command(name = "docsmith")]
#[command(
    version,
    about = "Finds undocumented or stale TypeScript declarations and writes doc comments for them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository root to analyze (defaults to the current directory)
    #[arg(long, global = true, env = "DOCSMITH_ROOT")]
    root: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Args)]
struct ChangeArgs {
    /// Only consider changes in this pull request
    #[arg(long, conflicts_with = "base")]
    pr: Option<u64>,
    /// Only consider changes since this git ref
    #[arg(long)]
    base: Option<String>,
}

#[derive(Args)]
#[group(multiple = false)]
struct SinkArgs {
    /// Print diffs without touching anything (default)
    #[arg(long)]
    dry_run: bool,
    /// Write patched files in place
    #[arg(long)]
    write: bool,
    /// Commit the changes to a branch and open or update a pull request
    #[arg(long)]
    open_pr: bool,
}

impl SinkArgs {
    fn choice(&self) -> SinkChoice {
        if self.dry_run || !(self.write || self.open_pr) {
            SinkChoice::DryRun
        } else if self.write {
            SinkChoice::Write
        } else {
            SinkChoice::OpenPr
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze, generate and deliver documentation
    Run {
        #[command(flatten)]
        changes: ChangeArgs,
        #[command(flatten)]
        sink: SinkArgs,
        #[arg(long, help = "Print the run report as JSON")]
        json: bool,
        #[arg(long, help = "LLM provider (openai, ollama)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
        #[arg(long, help = "Maximum concurrent generation requests")]
        concurrency: Option<usize>,
        #[arg(long, help = "Also write the documentation summary")]
        summary: bool,
    },

    /// Report coverage verdicts without generating anything
    Scan {
        #[command(flatten)]
        changes: ChangeArgs,
        #[arg(long, help = "Include declarations that need nothing")]
        all: bool,
        #[arg(long, help = "Print the scan report as JSON")]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Create a project config file at the root
    Init {
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mdocsmith encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    // Logs go to stderr so stdout stays clean for diffs and JSON reports
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Run {
            changes,
            sink,
            json,
            provider,
            model,
            concurrency,
            summary,
        } => {
            let options = RunOptions {
                root: cli.root,
                pr: changes.pr,
                base: changes.base,
                sink: sink.choice(),
                json,
                quiet: cli.quiet,
                provider,
                model,
                concurrency,
                summary,
            };

            let rt = Runtime::new()?;
            let delivered = rt.block_on(async {
                let cancel = CancellationToken::new();
                let on_interrupt = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Interrupted; finishing in-flight work");
                        on_interrupt.cancel();
                    }
                });
                docsmith::cli::commands::run::run(options, cancel).await
            })?;
            return Ok(delivered);
        }
        Commands::Scan {
            changes,
            all,
            json,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(docsmith::cli::commands::scan::run(ScanOptions {
                root: cli.root,
                pr: changes.pr,
                base: changes.base,
                all,
                json,
                quiet: cli.quiet,
            }))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                docsmith::cli::commands::config::show(cli.root, &format)?;
            }
            ConfigAction::Path => {
                docsmith::cli::commands::config::path(cli.root)?;
            }
            ConfigAction::Init { force } => {
                docsmith::cli::commands::config::init(cli.root, force)?;
            }
        },
    }

    Ok(true)
}
