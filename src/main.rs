use clap::{Parser, Subcommand};
use tracing::error;

use pos_reconciler::config::Config;
use pos_reconciler::error::Result;
use pos_reconciler::{constants, logging, pipeline};
use pos_reconciler::storage::{InMemoryStore, Store};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pos_reconciler")]
#[command(about = "Multi-source restaurant sales reconciliation pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest, clean, and reconcile the source exports
    Process {
        /// Specific sources to process (comma-separated). Available: toast, doordash, square
        #[arg(long)]
        sources: Option<String>,
        /// Export cleaned data to CSV files
        #[arg(long)]
        export_csv: bool,
        /// Skip database loading, keep results in memory only
        #[arg(long)]
        no_load_db: bool,
    },
    /// Create the database schema
    SetupDb,
}

fn parse_sources(sources: Option<String>) -> Vec<String> {
    match sources {
        Some(list) => list.split(',').map(|s| s.trim().to_lowercase()).collect(),
        None => pipeline::all_source_names(),
    }
}

async fn make_store(no_load_db: bool) -> Result<Arc<dyn Store>> {
    if no_load_db {
        return Ok(Arc::new(InMemoryStore::new()));
    }

    #[cfg(feature = "db")]
    {
        let manager = pos_reconciler::db::DatabaseManager::new().await?;
        Ok(Arc::new(manager))
    }
    #[cfg(not(feature = "db"))]
    {
        println!("⚠️  Built without the db feature, keeping results in memory");
        Ok(Arc::new(InMemoryStore::new()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging();
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process { sources, export_csv, no_load_db } => {
            println!("🔄 Running reconciliation pipeline...");

            let source_names = parse_sources(sources);
            for name in &source_names {
                let known = [
                    constants::TOAST_SOURCE,
                    constants::DOORDASH_SOURCE,
                    constants::SQUARE_SOURCE,
                ];
                if !known.contains(&name.as_str()) {
                    println!("⚠️  Unknown source: {}", name);
                }
            }

            let config = Config::load()?;
            let store = make_store(no_load_db).await?;
            store.execute_ddl().await?;

            match pipeline::run(&config, &source_names, store.as_ref(), export_csv).await {
                Ok(summary) => {
                    println!("\n📊 Pipeline Results:");
                    println!("   Locations: {}", summary.locations);
                    println!("   Products: {}", summary.products);
                    println!("   Orders: {}", summary.orders);
                    println!("   Order items: {}", summary.order_items);
                    println!("\n✅ Complete! Data processed{}.", if no_load_db {
                        ""
                    } else {
                        " and loaded to database"
                    });
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::SetupDb => {
            println!("🔧 Setting up database schema...");

            #[cfg(feature = "db")]
            {
                let manager = pos_reconciler::db::DatabaseManager::new().await?;
                manager.run_migrations().await?;
                println!("✅ Database schema created successfully");
            }
            #[cfg(not(feature = "db"))]
            {
                println!("❌ Built without the db feature; rebuild with --features db");
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
