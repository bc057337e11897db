// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
//! Creates or updates a calendar account. Users are never created by the
//! server itself; this is the out-of-band path.
use anyhow::{bail, Result};
use calendar_common::Role;
use calendar_server::auth::hash_password;
use calendar_server::config::AppConfig;
use calendar_server::database;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "provision-user", about = "Create or update a calendar user")]
struct Args {
    /// Login name, unique across the calendar.
    username: String,

    /// Role granted to the account (USER or ADMIN).
    #[arg(long, default_value = "USER")]
    role: Role,

    /// Name shown in the calendar, defaults to the username.
    #[arg(long)]
    display_name: Option<String>,

    /// Password for the account. Read from CALENDAR_PASSWORD when omitted.
    #[arg(long, env = "CALENDAR_PASSWORD", hide_env_values = true)]
    password: String,

    /// Overrides DATABASE_URL.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if args.password.is_empty() {
        bail!("Password cannot be empty.");
    }

    let config = AppConfig::from_env()?;
    let database_url = args.database_url.unwrap_or(config.database_url);
    let pool = database::establish_connection_pool(&database_url).await?;

    let hash = hash_password(&args.password)?;
    let display_name = args.display_name.unwrap_or_else(|| args.username.clone());
    database::upsert_user(&pool, &args.username, &hash, args.role, &display_name).await?;

    tracing::info!("User {} provisioned with role {}.", args.username, args.role);
    pool.close().await;
    Ok(())
}
