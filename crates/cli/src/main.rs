//! Proshop CLI - migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! proshop-cli migrate
//!
//! # Grant or revoke the admin capability
//! proshop-cli admin grant -e admin@example.com
//! proshop-cli admin revoke -e admin@example.com
//!
//! # Price a cart file the way the storefront would
//! proshop-cli quote cart.json
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "proshop-cli")]
#[command(author, version, about = "Proshop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage the admin capability of customer accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Print the price breakdown for a cart file
    Quote {
        /// JSON file with an `items` array of line items
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Let a customer deliver orders and list all orders
    Grant {
        /// Customer email address
        #[arg(short, long)]
        email: String,
    },
    /// Remove the admin capability
    Revoke {
        /// Customer email address
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
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => {
                commands::admin::set_admin(&email, true).await?;
            }
            AdminAction::Revoke { email } => {
                commands::admin::set_admin(&email, false).await?;
            }
        },
        Commands::Quote { path } => commands::quote::run(&path)?,
    }
    Ok(())
}
