mod changes;
mod crawler;
mod db;
mod parser;
mod processor;
mod runner;
mod settings;

use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::crawler::FirecrawlClient;
use crate::runner::Runner;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "macrobell", about = "Menu price change tracker via Firecrawl")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and register store ids
    Init {
        /// Store id to track (repeatable)
        #[arg(short, long = "store")]
        stores: Vec<String>,
    },
    /// Crawl every registered store and record price changes
    Run,
    /// Show database statistics
    Stats,
    /// Show the recorded price history of one item at one store
    History {
        store_id: String,
        item: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Init { stores } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let added = db::register_stores(&conn, &stores)?;
            println!(
                "Schema ready at {}. Registered {} new stores ({} given).",
                settings.db_path.display(),
                added,
                stores.len()
            );
            Ok(())
        }
        Commands::Run => {
            // Provider access is checked before any store is touched.
            let provider = FirecrawlClient::from_settings(&settings.provider)?;
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;

            let today = chrono::Local::now().date_naive();
            let summary = Runner::new(&conn, provider, settings)
                .run(today)
                .context("Scrape run aborted")?;
            println!("{}", summary);
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Stores:       {}", s.stores);
            println!("Scraped:      {}", s.scraped);
            println!("Unscraped:    {}", s.unscraped);
            println!("Items:        {}", s.items);
            println!("Observations: {}", s.observations);
            println!("Last scrape:  {}", s.last_scrape.as_deref().unwrap_or("-"));
            Ok(())
        }
        Commands::History { store_id, item } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let rows = db::price_history(&conn, &store_id, &item)?;
            if rows.is_empty() {
                println!("No prices recorded for '{}' at store {}.", item, store_id);
            } else {
                println!("{:<10} | {:>8}", "Date", "Price");
                println!("{}", "-".repeat(21));
                for r in &rows {
                    println!("{:<10} | {:>8}", r.scrape_date, format!("${:.2}", r.price));
                }
                let last = db::last_scraped(&conn, &store_id)?;
                println!(
                    "\n{} changes | store last scraped {}",
                    rows.len(),
                    last.as_deref().unwrap_or("never")
                );
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
