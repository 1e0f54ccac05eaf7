use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use migrations::Migrator;
use sea_orm_migration::MigratorTrait;
use sweetshop_api::{config, db};
use tracing::info;

#[derive(Parser)]
#[command(name = "migration", about = "Manage the sweetshop database schema", version)]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long, global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations
    Up {
        /// Apply at most this many
        #[arg(short, long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        #[arg(short, long, default_value_t = 1)]
        steps: u32,
    },
    /// Show which migrations are applied
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;

    match cli.command {
        Command::Up { steps } => {
            Migrator::up(&pool, steps).await?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        Command::Status => {
            Migrator::status(&pool).await?;
        }
        Command::Fresh => {
            Migrator::fresh(&pool).await?;
            info!("Database recreated");
        }
    }

    Ok(())
}
