//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod persona_list;
pub mod say;
pub mod serve;


use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::cli::persona_list::list_personas;
use crate::cli::say::{run_say, SayOptions};
use crate::cli::serve::run_serve;
use crate::core::config::data::path_display;
use crate::core::config::Config;

#[derive(Parser)]
#[command(name = "agora")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("VERGEN_GIT_SHA"), ")"))]
#[command(about = "Chat with personas through a local model or a hosted inference API")]
#[command(
    long_about = "Agora serves a persona chat front-end. Each persona supplies a system prompt; \
replies stream from a model server running next to the app or from a hosted inference API.\n\n\
Environment Variables:\n\
  HF_TOKEN          Access token for the hosted API (used by 'say')\n\
  RUST_LOG          Diagnostic log filter (e.g. 'agora=debug')"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file to use instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Persona file to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub personas: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Address to listen on, overriding the configured one
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,
        /// Append each exchange to this transcript file
        #[arg(short, long, value_name = "FILE")]
        log: Option<PathBuf>,
    },
    /// Send a single prompt and stream the reply to stdout
    Say {
        /// Prompt text (can be multiple words)
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
        /// Persona id or gallery image path
        #[arg(short, long)]
        persona: Option<String>,
        /// Generate with the local model
        #[arg(long, conflicts_with = "api")]
        local: bool,
        /// Generate with the hosted API
        #[arg(long)]
        api: bool,
        #[arg(long, value_name = "N")]
        max_tokens: Option<u32>,
        #[arg(long, value_name = "T")]
        temperature: Option<f32>,
        #[arg(long, value_name = "P")]
        top_p: Option<f32>,
        /// Access token for the hosted API
        #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// List available personas
    Personas,
    /// Print the effective configuration
    Config {
        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,
    },
}

/// Configuration resolved from the global flags.
#[derive(Debug)]
pub struct Workspace {
    pub config: Config,
    pub config_path: PathBuf,
    pub personas_path: PathBuf,
}

impl Workspace {
    pub fn load(config: Option<&Path>, personas: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let config_path = match config {
            Some(path) => path.to_path_buf(),
            None => Config::default_path()?,
        };
        let config = Config::load_from_path(&config_path)?;
        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let personas_path = match personas {
            Some(path) => path.to_path_buf(),
            None => config.resolve_personas_path(&config_dir),
        };

        Ok(Self {
            config,
            config_path,
            personas_path,
        })
    }
}

/// Wait for the local model loader; returns whether it ended cleanly.
pub(crate) async fn join_loader(loader: JoinHandle<()>) -> bool {
    match loader.await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "local model loader did not shut down cleanly");
            false
        }
    }
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Commands::Serve {
        bind: None,
        log: None,
    });

    let default_level = match command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_level);

    let workspace = Workspace::load(args.config.as_deref(), args.personas.as_deref())?;

    match command {
        Commands::Serve { bind, log } => run_serve(workspace, bind, log).await,
        Commands::Say {
            prompt,
            persona,
            local,
            api,
            max_tokens,
            temperature,
            top_p,
            token,
        } => {
            let use_local_model = if local {
                true
            } else if api {
                false
            } else {
                workspace.config.defaults.use_local_model
            };
            run_say(
                workspace,
                SayOptions {
                    prompt,
                    persona,
                    use_local_model,
                    max_tokens,
                    temperature,
                    top_p,
                    token,
                },
            )
            .await
        }
        Commands::Personas => list_personas(&workspace.personas_path),
        Commands::Config { init } => {
            if init {
                if workspace.config_path.exists() {
                    println!(
                        "Config already exists at {}",
                        path_display(&workspace.config_path)
                    );
                } else {
                    workspace.config.save_to_path(&workspace.config_path)?;
                    println!(
                        "✅ Wrote default config to {}",
                        path_display(&workspace.config_path)
                    );
                }
            }
            workspace
                .config
                .print_all(&workspace.config_path, &workspace.personas_path);
            Ok(())
        }
    }
}
