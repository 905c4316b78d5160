//! # Nile Care CLI (`nile`)
//!
//! Command-line front end for the Nile Care document and question-answering
//! service.
//!
//! ## Usage
//!
//! ```bash
//! nile --config ./config/nile.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `nile login <email>` | Obtain and persist a bearer token |
//! | `nile logout` | Forget the persisted token |
//! | `nile whoami` | Restore the session and show the verified user |
//! | `nile ask "<question>"` | Ask a single question |
//! | `nile chat` | Interactive question loop |
//! | `nile docs list` | List uploaded documents (admin) |
//! | `nile docs embed <id>` | Trigger embedding of a document (admin) |
//! | `nile docs upload <file>` | Store a PDF and register it (admin) |
//! | `nile health` | Backend health check |
//! | `nile completions <shell>` | Print a shell completion script |

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use nilecare_client::ask::{self, Place};
use nilecare_client::models::Language;
use nilecare_client::{auth_cmd, config, docs_cmd, health};

/// Nile Care CLI: ask questions against the embedded corpus and manage
/// the documents behind it.
#[derive(Parser)]
#[command(
    name = "nile",
    about = "Nile Care client: ask questions and manage the document corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Optional. When the file does not exist, defaults plus the
    /// NILE_API_URL / NILE_CLOUD_NAME / NILE_UPLOAD_PRESET environment
    /// variables are used.
    #[arg(long, global = true, default_value = "./config/nile.toml")]
    config: PathBuf,

    /// Log requests and session transitions to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the bearer token.
    Login {
        /// Account e-mail.
        email: String,

        /// Password. Falls back to NILE_PASSWORD, then a hidden terminal prompt.
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the persisted token. No network call.
    Logout,

    /// Show the user the persisted token belongs to.
    Whoami,

    /// Ask a single question.
    Ask {
        question: String,

        #[command(flatten)]
        opts: AskOpts,
    },

    /// Ask questions interactively until EOF or /quit.
    Chat {
        #[command(flatten)]
        opts: AskOpts,
    },

    /// Manage documents (admin).
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Check backend health.
    Health,

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct AskOpts {
    /// Answer language.
    #[arg(long, value_enum, default_value_t = Language::En)]
    lang: Language,

    /// Place name for weather context.
    #[arg(long)]
    location: Option<String>,

    /// Latitude for weather context (requires --lon).
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude for weather context (requires --lat).
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,
}

impl AskOpts {
    fn place(&self) -> Place {
        Place {
            location: self.location.clone(),
            latitude: self.lat,
            longitude: self.lon,
        }
    }
}

#[derive(Subcommand)]
enum DocsAction {
    /// List documents and their embedding status.
    List,

    /// Request embedding of a document. Does not wait for completion.
    Embed {
        id: String,

        /// Re-fetch the list afterwards and print the document's status.
        #[arg(long)]
        refresh: bool,
    },

    /// Upload a file to object storage and register it with the backend.
    Upload {
        path: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "nilecare_client=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "nile", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        config::Config::minimal()?
    };

    match cli.command {
        Commands::Login { email, password } => {
            auth_cmd::run_login(&cfg, &email, password).await?;
        }
        Commands::Logout => {
            auth_cmd::run_logout(&cfg)?;
        }
        Commands::Whoami => {
            auth_cmd::run_whoami(&cfg).await?;
        }
        Commands::Ask { question, opts } => {
            ask::run_ask(&cfg, &question, opts.lang, &opts.place()).await?;
        }
        Commands::Chat { opts } => {
            ask::run_chat(&cfg, opts.lang, &opts.place()).await?;
        }
        Commands::Docs { action } => match action {
            DocsAction::List => {
                docs_cmd::run_docs_list(&cfg).await?;
            }
            DocsAction::Embed { id, refresh } => {
                docs_cmd::run_docs_embed(&cfg, &id, refresh).await?;
            }
            DocsAction::Upload { path } => {
                docs_cmd::run_docs_upload(&cfg, &path).await?;
            }
        },
        Commands::Health => {
            health::run_health(&cfg).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
