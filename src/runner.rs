use std::fmt;

use anyhow::Result;
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::crawler::PageProvider;
use crate::db;
use crate::processor::{self, ScrapeContext, StoreOutcome};
use crate::settings::Settings;

/// Totals for one run over every registered store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stores: usize,
    pub scraped: usize,
    pub failed: usize,
    pub items_processed: usize,
    pub prices_changed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stores == 0 {
            return write!(f, "No stores found in the database. Run 'init --store <ID>' first.");
        }
        write!(
            f,
            "Scraped {}/{} stores ({} failed). Processed {} items, recorded {} price changes.",
            self.scraped, self.stores, self.failed, self.items_processed, self.prices_changed,
        )
    }
}

pub struct Runner<'a, P> {
    conn: &'a Connection,
    provider: P,
    settings: Settings,
}

impl<'a, P: PageProvider> Runner<'a, P> {
    pub fn new(conn: &'a Connection, provider: P, settings: Settings) -> Self {
        Self {
            conn,
            provider,
            settings,
        }
    }

    /// Process every store in id order. Store-level failures are logged and
    /// skipped; only loading the store list can fail the run.
    pub fn run(self, today: NaiveDate) -> Result<RunSummary> {
        let store_ids = db::fetch_store_ids(self.conn)?;
        let mut summary = RunSummary {
            stores: store_ids.len(),
            ..Default::default()
        };
        if store_ids.is_empty() {
            info!("No stores registered; nothing to scrape");
            return Ok(summary);
        }
        info!("Loaded {} stores for a full scrape", store_ids.len());

        let ctx = ScrapeContext::new(self.settings, today);

        let pb = ProgressBar::new(store_ids.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} stores ({msg})")?
                .progress_chars("=> "),
        );

        for store_id in &store_ids {
            pb.set_message(store_id.clone());
            match processor::process_store(self.conn, &self.provider, &ctx, store_id) {
                Ok(StoreOutcome::Done(counts)) => {
                    summary.scraped += 1;
                    summary.items_processed += counts.items_processed;
                    summary.prices_changed += counts.prices_changed;
                }
                Ok(StoreOutcome::FetchFailed(e)) => {
                    summary.failed += 1;
                    warn!(store_id = %store_id, stage = "fetch", "Crawl failed: {}", e);
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(store_id = %store_id, stage = "extract", "Store skipped: {:#}", e);
                }
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!(
            "Run complete: {} scraped, {} failed, {} price changes",
            summary.scraped, summary.failed, summary.prices_changed
        );
        Ok(summary)
    }
}
