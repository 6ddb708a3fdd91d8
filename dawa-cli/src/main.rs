//! Dawa chat CLI and MCP Server.

mod commands;
mod config;
mod handlers;
mod mcp;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::chat;
use rust_i18n::t;

rust_i18n::i18n!("src/locales", fallback = "en");

/// Dawa marketplace chat CLI and MCP Server
#[derive(Parser)]
#[command(name = "dawa")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "plain")]
    format: output::OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Language for output
    #[arg(short, long, global = true, default_value = "en")]
    lang: String,

    /// API base URL
    #[arg(long, global = true, env = "DAWA_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Run as MCP Server
    #[arg(long)]
    mcp: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage authentication
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Conversations with buyers and sellers
    #[command(alias = "c")]
    Chat {
        #[command(subcommand)]
        action: chat::ChatAction,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Login with token and uid
    Login {
        /// Access token
        #[arg(short, long)]
        token: String,
        /// User ID
        #[arg(short, long)]
        uid: String,
    },
    /// Logout
    Logout,
    /// Show current auth status
    Status,
}

fn init_tracing(default_level: tracing::Level) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    rust_i18n::set_locale(&cli.lang);

    if cli.mcp {
        init_tracing(tracing::Level::INFO);
        return mcp::run_server(cli.base_url).await;
    }

    if cli.verbose {
        init_tracing(tracing::Level::DEBUG);
    }

    let command = cli
        .command
        .ok_or_else(|| anyhow::anyhow!("{}", t!("no_command")))?;

    match command {
        Commands::Auth { action } => handle_auth(action).await,
        Commands::Chat { action } => {
            chat::handle(action, cli.format, cli.base_url.as_deref()).await
        }
        Commands::Config => {
            let cfg = config::load_config()?;
            println!(
                "{}",
                t!("config_file", path = config::config_path()?.display())
            );
            println!(
                "{}",
                t!(
                    "base_url",
                    url = config::base_url(&cfg, cli.base_url.as_deref())
                )
            );
            println!("{}", t!("authenticated", status = cfg.auth.is_some()));
            if let Some(auth) = &cfg.auth {
                println!("{}", t!("user_id", uid = &auth.uid));
            }
            Ok(())
        }
    }
}

async fn handle_auth(action: AuthAction) -> Result<()> {
    match action {
        AuthAction::Login { token, uid } => {
            let mut cfg = config::load_config()?;
            cfg.auth = Some(config::AuthConfig {
                token: token.clone(),
                uid: uid.clone(),
            });
            config::save_config(&cfg)?;
            println!("{}", t!("logged_in_as", uid = &uid));
            Ok(())
        }
        AuthAction::Logout => {
            let mut cfg = config::load_config()?;
            cfg.auth = None;
            config::save_config(&cfg)?;
            println!("{}", t!("logged_out"));
            Ok(())
        }
        AuthAction::Status => {
            let cfg = config::load_config()?;
            if let Some(auth) = &cfg.auth {
                println!("{}", t!("logged_in_as", uid = &auth.uid));
            } else {
                println!("{}", t!("not_logged_in"));
            }
            Ok(())
        }
    }
}
