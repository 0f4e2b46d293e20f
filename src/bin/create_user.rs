use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use auth_api::auth::accounts::Registration;
use auth_api::auth::{AuthConfig, AuthState, PgCredentialStore};

#[derive(Parser, Debug)]
#[command(name = "create_user", about = "Provision a user account directly in the database")]
struct Args {
    /// Unique login name (stored lower-cased).
    #[arg(long)]
    username: String,

    /// Email address for the account (case insensitive).
    #[arg(long)]
    email: String,

    /// Full display name.
    #[arg(long)]
    full_name: String,

    /// Plaintext password to hash and store for this user.
    #[arg(long)]
    password: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;
    auth_api::db::run_migrations(&pool).await?;

    let config = AuthConfig::from_env()?;
    let state = AuthState::from_config(config, Arc::new(PgCredentialStore::new(pool)))?;

    let registration = Registration {
        full_name: args.full_name,
        email: args.email,
        username: args.username,
        password: args.password,
        avatar: None,
        cover_image: None,
    };

    match state.register(registration).await {
        Ok(profile) => {
            println!("Created user '{}' with id {}", profile.username, profile.id);
            Ok(())
        }
        Err(err) => {
            writeln!(io::stderr(), "error: {err}")?;
            std::process::exit(1);
        }
    }
}
