//! CogniDoc CLI - terminal client for the CogniDoc document Q&A service
//!
//! Upload PDFs, Word documents and emails, then ask questions about them.

mod api;
mod auth;
mod chat;
mod config;
mod models;
mod router;
mod session;
mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::AuthMode;
use crate::session::SessionStore;

#[derive(Parser)]
#[command(name = "cognidoc")]
#[command(about = "Terminal client for CogniDoc document question answering", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend base URL for this run (not saved)
    #[arg(long, global = true, env = "COGNIDOC_API_BASE")]
    api_base: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in (or register) with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "COGNIDOC_PASSWORD", hide_env_values = true)]
        password: String,

        /// Create a new account instead of logging in
        #[arg(long)]
        register: bool,
    },

    /// Sign in with Google through the backend
    Oauth {
        /// Handle a callback URL copied from the browser instead of listening
        #[arg(long)]
        paste: Option<String>,
    },

    /// Log out and clear the stored credential
    Logout,

    /// Show credential, theme and backend settings
    Status,

    /// Show or toggle the light/dark theme
    Theme {
        #[arg(short, long)]
        toggle: bool,
    },

    /// Upload a local .pdf, .docx or .eml file
    Upload { path: PathBuf },

    /// Ask the backend to fetch and index a document URL
    Fetch { url: String },

    /// Ask a question (one question per line)
    Ask {
        text: String,

        /// Document URL to query against
        #[arg(short, long)]
        document: Option<String>,

        /// Continue an existing chat session
        #[arg(short, long)]
        session: Option<String>,

        /// Save the answer as JSON to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// List saved chat sessions
    History,

    /// Print the messages of a chat session
    Show { session_id: String },

    /// Launch the terminal user interface
    Tui {
        /// Start at this path (/, /login, /chat or an /auth-redirect callback)
        #[arg(long, default_value = "/")]
        open: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging. The TUI owns the terminal, so its logs go to an
    // in-memory buffer shown in the debug pane.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());
    let log_buffer = match cli.command {
        Commands::Tui { .. } => {
            let buffer = tui::log_capture::LogBuffer::new();
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(buffer.clone()),
                )
                .init();
            Some(buffer)
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init();
            None
        }
    };

    let mut store = SessionStore::open_default()?;
    if let Some(api_base) = cli.api_base {
        store.override_api_base(api_base);
    }

    match cli.command {
        Commands::Login {
            email,
            password,
            register,
        } => {
            let mode = if register {
                AuthMode::Register
            } else {
                AuthMode::Login
            };
            auth::login::login(&mut store, &email, &password, mode).await?;
        }
        Commands::Oauth { paste } => {
            auth::oauth::login(&mut store, paste.as_deref()).await?;
        }
        Commands::Logout => {
            tracing::info!("Logging out...");
            auth::logout(&mut store)?;
        }
        Commands::Status => {
            auth::status(&store);
        }
        Commands::Theme { toggle } => {
            let theme = if toggle {
                store.toggle_theme()?
            } else {
                store.theme()
            };
            println!("Theme: {}", theme);
        }
        Commands::Upload { path } => {
            chat::cli::upload(&mut store, &path).await?;
        }
        Commands::Fetch { url } => {
            chat::cli::fetch(&mut store, &url).await?;
        }
        Commands::Ask {
            text,
            document,
            session,
            save,
        } => {
            chat::cli::ask(&mut store, &text, document, session, save.as_deref()).await?;
        }
        Commands::History => {
            chat::cli::history(&mut store).await?;
        }
        Commands::Show { session_id } => {
            chat::cli::show(&mut store, &session_id).await?;
        }
        Commands::Tui { open } => {
            let log_buffer = log_buffer.unwrap_or_default();
            tui::run(store, log_buffer, router::Route::parse(&open)).await?;
        }
    }

    Ok(())
}
