use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evidoc::types::OutputFormat;

#[derive(Parser)]
#[command(name = "evidoc")]
#[command(
    version,
    about = "Evidence-based documentation generator for code repositories"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger documentation generation for a repository
    Generate {
        #[arg(help = "Path to the repository checkout")]
        repo: PathBuf,
        #[arg(long, help = "Repository id (default: directory name)")]
        id: Option<String>,
        #[arg(long, help = "Wait for the run to finish and write the documents")]
        wait: bool,
        #[arg(long, short, help = "Output directory for --wait (default: .evidoc/docs/<id>)")]
        output: Option<PathBuf>,
        #[arg(long, short = 'f', help = "Output format: markdown, html, json")]
        format: Option<OutputFormat>,
    },

    /// Show the generation job for a repository (all jobs when omitted)
    Status {
        #[arg(help = "Repository id")]
        repository_id: Option<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Validate documentation rules without generating
    Validate {
        #[arg(help = "Path to the repository checkout")]
        repo: PathBuf,
        #[arg(long, help = "Documentation file to check (default: the repository README)")]
        doc: Option<PathBuf>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
        #[arg(long, help = "Also write the JSON report to this path")]
        report: Option<PathBuf>,
    },

    /// Print the evidence extracted from a repository as JSON
    Evidence {
        #[arg(help = "Path to the repository checkout")]
        repo: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
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
    /// Initialize project configuration
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
        eprintln!("\x1b[31mevidoc encountered an unexpected error:\x1b[0m");
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
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            repo,
            id,
            wait,
            output,
            format,
        } => {
            use evidoc::cli::commands::generate::{GenerateOptions, run};

            let rt = Runtime::new()?;
            rt.block_on(run(GenerateOptions {
                repo,
                id,
                wait,
                output,
                format,
            }))?;
        }
        Commands::Status {
            repository_id,
            format,
        } => {
            evidoc::cli::commands::status::run(repository_id.as_deref(), &format)?;
        }
        Commands::Validate {
            repo,
            doc,
            format,
            report,
        } => {
            evidoc::cli::commands::validate::run(&repo, doc, &format, report)?;
        }
        Commands::Evidence { repo } => {
            evidoc::cli::commands::evidence::run(&repo)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => evidoc::cli::commands::config::show(&format)?,
            ConfigAction::Path => evidoc::cli::commands::config::path()?,
            ConfigAction::Init { force } => evidoc::cli::commands::config::init(force)?,
        },
    }

    Ok(())
}
