//! Scanlane CLI - Database migrations, demo data and admin tokens.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! scanlane-cli migrate
//!
//! # Load the bundled demo stores, catalogs and review questions
//! scanlane-cli seed
//!
//! # Load a custom seed file instead
//! scanlane-cli seed --file stores.yaml
//!
//! # Create an admin and print their bearer token
//! scanlane-cli admin create -e admin@example.com -n "Admin Name"
//!
//! # Issue another token for an existing admin
//! scanlane-cli admin token -e admin@example.com
//! ```
//!
//! All commands read `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "scanlane-cli")]
#[command(author, version, about = "Scanlane CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with demo data
    Seed {
        /// YAML seed file (defaults to the bundled demo data)
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Manage admins
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin and issue a bearer token
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,
    },
    /// Issue an additional bearer token for an existing admin
    Token {
        /// Admin email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(file.as_deref()).await?,
        Commands::Admin { action } => match action {
            AdminAction::Create { email, name } => {
                commands::admin::create(&email, &name).await?;
            }
            AdminAction::Token { email } => {
                commands::admin::issue_token(&email).await?;
            }
        },
    }
    Ok(())
}
