use clap::{Parser, Subcommand};
use pulse_sync::{BrandScope, TickOutcome, TriggerSource};

#[derive(Debug, Parser)]
#[command(name = "pulse-cli")]
#[command(about = "Pulse analytics sync command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a full brand sync against the upstream now.
    SyncBrands,
    /// Refresh a single brand from the upstream list.
    Resync {
        #[arg(long)]
        brand_id: i64,
    },
    /// Sync posts over the trailing window for all active brands, or one.
    SyncPosts {
        #[arg(long)]
        brand_id: Option<i64>,
    },
    /// Run one schedule tick (fires an automatic sync if one is due).
    Tick,
    /// List recent sync runs.
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Store the upstream API credentials.
    SetCredentials {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        account_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = pulse_core::load_app_config()?;
    let pool_config = pulse_db::PoolConfig::from_app_config(&config);
    let pool = pulse_db::connect_pool(&config.database_url, pool_config).await?;
    pulse_db::run_migrations(&pool).await?;
    let sync_config = pulse_sync::SyncConfig::from_app_config(&config);

    match cli.command {
        Commands::SyncBrands => {
            let outcome = pulse_sync::run_brand_sync(
                &pool,
                &sync_config,
                TriggerSource::Manual,
                BrandScope::All,
            )
            .await?;
            println!(
                "brand sync complete: fetched {} (created {}, updated {}, marked deleted {}, skipped {})",
                outcome.total_fetched,
                outcome.created,
                outcome.updated,
                outcome.marked_deleted,
                outcome.skipped,
            );
        }
        Commands::Resync { brand_id } => {
            let outcome = pulse_sync::run_brand_sync(
                &pool,
                &sync_config,
                TriggerSource::Manual,
                BrandScope::One(brand_id),
            )
            .await?;
            println!(
                "brand {brand_id} resynced (created {}, updated {})",
                outcome.created, outcome.updated,
            );
        }
        Commands::SyncPosts { brand_id } => {
            let report = pulse_sync::run_post_sync(&pool, &sync_config, brand_id).await?;
            println!(
                "post sync complete: {} brands, {} posts fetched, {} stored",
                report.brands.len(),
                report.total_fetched,
                report.total_stored,
            );
            for brand in &report.brands {
                for error in &brand.errors {
                    eprintln!("  brand {}: {error}", brand.brand_id);
                }
            }
        }
        Commands::Tick => match pulse_sync::run_schedule_tick(&pool, &sync_config).await? {
            TickOutcome::Disabled => println!("automatic sync is disabled"),
            TickOutcome::NotDue { next_run_at } => {
                println!("not due; next run at {next_run_at}");
            }
            TickOutcome::Ran { outcome, next_run_at } => {
                match outcome {
                    Ok(sync) => println!(
                        "ran automatic sync (run {}): created {}, updated {}, marked deleted {}",
                        sync.run_id, sync.created, sync.updated, sync.marked_deleted,
                    ),
                    Err(message) => eprintln!("automatic sync failed: {message}"),
                }
                if let Some(next) = next_run_at {
                    println!("next run at {next}");
                }
            }
        },
        Commands::Runs { limit } => {
            let runs = pulse_db::list_sync_runs(&pool, limit).await?;
            if runs.is_empty() {
                println!("no sync runs recorded");
            }
            for run in runs {
                let finished = run
                    .finished_at
                    .map_or_else(|| "-".to_string(), |t| t.to_rfc3339());
                println!(
                    "{}  {:7}  {:7}  started {}  finished {}  +{} ~{} -{}{}",
                    run.public_id,
                    run.source,
                    run.status,
                    run.started_at.to_rfc3339(),
                    finished,
                    run.created,
                    run.updated,
                    run.marked_deleted,
                    run.error_message
                        .map_or_else(String::new, |m| format!("  ({m})")),
                );
            }
        }
        Commands::SetCredentials {
            access_token,
            account_id,
        } => {
            pulse_db::save_credentials(&pool, access_token.trim(), account_id.trim()).await?;
            println!("credentials stored for account {}", account_id.trim());
        }
    }

    Ok(())
}
