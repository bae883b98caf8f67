//! Corner Shop CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the shop schema and the session table
//! cs-cli migrate
//!
//! # Create an admin account
//! cs-cli admin create -e admin@example.com -u admin -p 'long-password'
//!
//! # Grant (or with --revoke, remove) admin rights
//! cs-cli admin promote -e someone@example.com
//!
//! # Load products from a YAML file
//! cs-cli seed products seed/products.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `SHOP_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cs-cli")]
#[command(author, version, about = "Corner Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the database from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin username
        #[arg(short, long)]
        username: String,

        /// Admin password
        #[arg(short, long)]
        password: String,
    },
    /// Change an existing account's admin flag
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Remove admin rights instead of granting them
        #[arg(long)]
        revoke: bool,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert products listed in a YAML file
    Products {
        /// Path to the YAML file
        file: String,

        /// Validate the file without writing anything
        #[arg(long)]
        dry_run: bool,
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
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                username,
                password,
            } => {
                commands::admin::create_user(&email, &username, &password).await?;
            }
            AdminAction::Promote { email, revoke } => {
                commands::admin::set_admin(&email, !revoke).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, dry_run } => {
                commands::seed::products(&file, dry_run).await?;
            }
        },
    }
    Ok(())
}
