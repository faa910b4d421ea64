//! Schema management and operator tooling for the storefront database.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;
use uuid::Uuid;

use storefront_api::{
    auth::{AuthService, AuthUser},
    config, db,
    migrator::Migrator,
};

#[derive(Parser)]
#[command(
    name = "storefront-migrate",
    about = "Apply or roll back storefront schema migrations",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Up {
        #[arg(long, help = "Apply at most this many migrations")]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Show applied and pending migrations
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
    /// Mint a merchant JWT signed with the configured secret
    IssueToken(IssueTokenArgs),
}

#[derive(Args)]
struct IssueTokenArgs {
    #[arg(long)]
    user_id: Uuid,
    #[arg(long, default_value = "admin")]
    role: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long, help = "Merchant account the staff user belongs to")]
    parent_id: Option<Uuid>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("loading configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    if let Commands::IssueToken(args) = &cli.command {
        let auth = AuthService::new(cfg.jwt_secret.clone());
        let token = auth.issue_token(&AuthUser {
            id: args.user_id,
            name: args.name.clone(),
            email: args.email.clone(),
            role_name: args.role.clone(),
            parent_id: args.parent_id,
        })?;
        println!("{token}");
        return Ok(());
    }

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("connecting to database")?;

    match cli.command {
        Commands::Up { steps } => {
            Migrator::up(&pool, steps).await?;
            info!("Migrations applied");
        }
        Commands::Down { steps } => {
            Migrator::down(&pool, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        Commands::Status => Migrator::status(&pool).await?,
        Commands::Fresh => {
            Migrator::fresh(&pool).await?;
            info!("Schema recreated");
        }
        Commands::IssueToken(_) => {}
    }

    Ok(())
}
