//! Chapter CLI - migrations, accounts, admin access and content editing.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! chapter migrate
//!
//! # Create a sign-in account, then make it an administrator
//! chapter user create -e officer@club.org -p 'correct horse'
//! chapter admin grant <uid>
//!
//! # Admin sign-in (persists across invocations)
//! chapter login -e officer@club.org -p 'correct horse'
//! chapter whoami
//!
//! # Edit content (requires an admin session)
//! chapter content create events '{"title": "Meeting", "date": "2025-01-01"}'
//! chapter content list events --sort -date
//!
//! chapter logout
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "chapter")]
#[command(author, version, about = "Chapter site CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage sign-in accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage admin records
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Sign in as an administrator
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Sign out and clear the local session
    Logout,
    /// Show the signed-in user and admin status
    Whoami,
    /// Read and edit site content
    Content {
        #[command(subcommand)]
        action: ContentAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new email/password account
    Create {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password (at least 8 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant admin access to a user id
    Grant { uid: String },
    /// Revoke admin access from a user id
    Revoke { uid: String },
}

#[derive(Subcommand)]
enum ContentAction {
    /// List a content collection
    List {
        collection: String,

        /// Field to sort by; prefix with '-' for descending
        #[arg(short, long, allow_hyphen_values = true)]
        sort: Option<String>,
    },
    /// Create an entity from a JSON object
    Create { collection: String, json: String },
    /// Merge a JSON object into an entity (creates it if absent)
    Update {
        collection: String,
        id: String,
        json: String,
    },
    /// Delete an entity
    Delete { collection: String, id: String },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chapter=info,chapter_site=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::load().await?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&ctx).await?,
        Commands::User { action } => match action {
            UserAction::Create { email, password } => {
                commands::user::create(&ctx, &email, &password).await?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Grant { uid } => commands::admin::grant(&ctx, &uid).await?,
            AdminAction::Revoke { uid } => commands::admin::revoke(&ctx, &uid).await?,
        },
        Commands::Login { email, password } => {
            commands::session::login(&ctx, &email, &password).await?;
        }
        Commands::Logout => commands::session::logout(&ctx).await?,
        Commands::Whoami => commands::session::whoami(&ctx).await?,
        Commands::Content { action } => match action {
            ContentAction::List { collection, sort } => {
                commands::content::list(&ctx, &collection, sort.as_deref()).await?;
            }
            ContentAction::Create { collection, json } => {
                commands::content::create(&ctx, &collection, &json).await?;
            }
            ContentAction::Update {
                collection,
                id,
                json,
            } => commands::content::update(&ctx, &collection, &id, &json).await?,
            ContentAction::Delete { collection, id } => {
                commands::content::delete(&ctx, &collection, &id).await?;
            }
        },
    }
    Ok(())
}
