use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::{Claude, Completion, Gemini};
use magpie_common::{Config, Difficulty, HuntRequest, Provider, SafetyValidator};
use magpie_hunt::store::{
    migrate, InMemoryAuditLog, InMemoryHuntStore, PgAuditLog, PgHuntStore,
};
use magpie_hunt::{AiContentGenerator, AuditLog, HuntGenerator, HuntStore, ResponseParser};

#[derive(Parser)]
#[command(name = "magpie", about = "Generate and review AI scavenger hunts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one hunt and print the result as JSON
    Generate {
        /// Place the hunt is themed around
        #[arg(long)]
        location: String,

        /// Number of items (4, 9, 16, 25 or 36 for the standard grids)
        #[arg(long, default_value_t = 9)]
        items: u32,

        /// TODDLER, EXPLORER or EXPERT
        #[arg(long, default_value = "EXPLORER")]
        difficulty: Difficulty,
    },
    /// List audit entries flagged by players
    Reported,
}

fn build_model(config: &Config) -> Result<Arc<dyn Completion>> {
    let api_key = config.require_api_key()?;
    Ok(match config.provider {
        Provider::Gemini => Arc::new(
            Gemini::new(api_key, &config.model).with_timeout(config.request_timeout),
        ),
        Provider::Claude => Arc::new(
            Claude::new(api_key, &config.model).with_timeout(config.request_timeout),
        ),
    })
}

async fn build_sinks(config: &Config) -> Result<(Arc<dyn HuntStore>, Arc<dyn AuditLog>)> {
    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .context("connect to DATABASE_URL")?;
            migrate(&pool).await?;
            info!("Connected to database");
            Ok((
                Arc::new(PgHuntStore::new(pool.clone())),
                Arc::new(PgAuditLog::new(pool)),
            ))
        }
        None => {
            info!("DATABASE_URL not set, hunts and audit log are kept in memory");
            Ok((
                Arc::new(InMemoryHuntStore::new()),
                Arc::new(InMemoryAuditLog::new()),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("magpie=info".parse()?))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let (hunts, audit) = build_sinks(&config).await?;

    match cli.command {
        Command::Generate {
            location,
            items,
            difficulty,
        } => {
            let request = HuntRequest::new(&location, items, difficulty)?;
            let model = build_model(&config)?;
            let orchestrator = HuntGenerator::new(
                Arc::new(AiContentGenerator::new(model)),
                SafetyValidator::new(),
                ResponseParser::new(),
                hunts,
                audit,
            );

            let result = orchestrator.generate(&request).await;
            if result.requires_review() {
                info!(location = request.location.as_str(), "Hunt rejected, flagged for review");
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Reported => {
            let entries = audit.reported().await?;
            info!(count = entries.len(), "Loaded reported content");
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}
