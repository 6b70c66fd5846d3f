use anyhow::{Context, Result};
use catalog_cli::{hash_password, init_tracing};
use catalog_core::Config;
use catalog_db::UserRepository;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

#[derive(Parser, Debug)]
#[command(name = "create_user")]
#[command(about = "Create an API account or reset its password")]
struct Args {
    username: String,

    #[arg(long, env = "CATALOG_NEW_PASSWORD", hide_env_values = true)]
    password: String,

    /// Grant staff permission, required for every API route
    #[arg(long)]
    staff: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    if args.username.trim().is_empty() {
        anyhow::bail!("Username cannot be empty");
    }

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    let hash = hash_password(&args.password)?;
    let user = UserRepository::new(pool)
        .upsert(args.username.trim(), &hash, args.staff)
        .await?;

    println!(
        "Saved user {} ({})",
        user.username,
        if user.is_staff { "staff" } else { "no staff permission" }
    );
    Ok(())
}
