//! content-completer CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use content_completer::{
    commands::{
        cmd_ask, cmd_categories, cmd_complete, cmd_init, cmd_run, cmd_status, print_ask_result,
        print_categories, print_completion_stats, print_record_outcome, print_status,
        RunCommandOptions,
    },
    config::Config,
    error::Result,
    progress::LogWriterFactory,
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "content-completer")]
#[command(version, about = "Complete missing content titles, descriptions and categories with a hosted LLM", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the content database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Complete every record with a missing title, description or placeholder title
    Run {
        /// Inference session hash (defaults to the config value, or a fresh one)
        #[arg(long, env = "CONTENT_COMPLETER_SESSION")]
        session: Option<String>,

        /// Process at most this many records per pass
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Complete a single record by id
    Complete {
        /// Content record id
        id: i64,

        /// Inference session hash
        #[arg(long, env = "CONTENT_COMPLETER_SESSION")]
        session: Option<String>,
    },

    /// List known categories
    Categories,

    /// Show how many records are awaiting completion
    Status,

    /// Send a raw prompt to the model and print its reply
    Ask {
        /// Prompt text
        prompt: String,

        /// Inference session hash
        #[arg(long, env = "CONTENT_COMPLETER_SESSION")]
        session: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Handle init command specially (doesn't need existing config)
    if let Commands::Init { force } = cli.command {
        return handle_init(cli.config, force, cli.json).await;
    }

    // Handle completions command (doesn't need config or database)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "content-completer", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Run { session, limit } => {
            let stats = cmd_run(&config, RunCommandOptions { session, limit }).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_completion_stats(&stats);
            }
        }

        Commands::Complete { id, session } => {
            let outcome = cmd_complete(&config, id, session).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_record_outcome(&outcome);
            }
        }

        Commands::Categories => {
            let categories = cmd_categories(&config).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else {
                print_categories(&categories);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Ask { prompt, session } => {
            let result = cmd_ask(&config, &prompt, session).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_ask_result(&result);
            }
        }
    }

    Ok(())
}

async fn handle_init(config: Option<PathBuf>, force: bool, json: bool) -> Result<()> {
    // A .toml path names the config file itself; anything else is a directory
    let (base_dir, config_path) = match config {
        Some(path) if path.extension().map_or(false, |e| e == "toml") => {
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            (base, path)
        }
        Some(dir) => (dir.clone(), dir.join("config.toml")),
        None => {
            let base = Config::default_base_dir();
            (base.clone(), base.join("config.toml"))
        }
    };

    let info = cmd_init(base_dir, config_path, force).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("✓ content-completer initialized successfully");
    println!("  Config: {}", info.config_path);
    println!("  Database: {}", info.db_path);
    println!("\nNext steps:");
    println!("  1. Edit the config file to point at your inference endpoint");
    println!("  2. Load content rows into the database");
    println!("  3. Complete them: content-completer run");

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        eprintln!(
            "Config file not found: {}\nRun 'content-completer init' first.",
            config_path.display()
        );
        std::process::exit(1);
    }

    Config::load(&config_path)
}
