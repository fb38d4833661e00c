use std::collections::HashSet;

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::changes::{self, PriceCheck};
use crate::crawler::{CrawlError, CrawlRequest, PageProvider};
use crate::db::{self, PriceRow};
use crate::parser::filter::ItemFilter;
use crate::parser::{self, items};
use crate::settings::Settings;

/// Per-run inputs shared by every store.
pub struct ScrapeContext {
    pub settings: Settings,
    pub filter: ItemFilter,
    pub today: NaiveDate,
}

impl ScrapeContext {
    pub fn new(settings: Settings, today: NaiveDate) -> Self {
        let filter = ItemFilter::new(&settings.filter.excluded_suffixes);
        Self {
            settings,
            filter,
            today,
        }
    }

    pub fn crawl_request(&self, store_id: &str) -> CrawlRequest {
        let crawl = &self.settings.crawl;
        CrawlRequest {
            url: crawl.store_url(store_id),
            include_paths: crawl.include_paths.clone(),
            exclude_paths: crawl.exclude_paths(),
            max_depth: crawl.max_depth,
            limit: crawl.limit,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    pub items_processed: usize,
    pub prices_changed: usize,
}

#[derive(Debug)]
pub enum StoreOutcome {
    /// Pages were extracted and the store's observations committed.
    Done(StoreCounts),
    /// The provider errored or returned nothing; the store was left untouched.
    FetchFailed(CrawlError),
}

/// Crawl one store and record its price changes.
///
/// All inserts and the `last_scraped_date` update share one transaction. An
/// error returned from here leaves the store exactly as it was.
pub fn process_store<P: PageProvider>(
    conn: &Connection,
    provider: &P,
    ctx: &ScrapeContext,
    store_id: &str,
) -> Result<StoreOutcome> {
    let request = ctx.crawl_request(store_id);
    info!(store_id, url = %request.url, "Crawling menu pages");

    let pages = match provider.crawl(&request) {
        Ok(pages) if pages.is_empty() => return Ok(StoreOutcome::FetchFailed(CrawlError::Empty)),
        Ok(pages) => pages,
        Err(e) => return Ok(StoreOutcome::FetchFailed(e)),
    };
    info!(store_id, pages = pages.len(), "Crawl returned pages, processing items");

    let tx = conn.unchecked_transaction()?;
    let mut seen: HashSet<&str> = HashSet::new();
    let mut counts = StoreCounts::default();

    for page in &pages {
        let Some(text) = parser::page_text(page) else {
            debug!(store_id, "Skipping page without text content");
            continue;
        };

        for candidate in items::candidates(text) {
            counts.items_processed += 1;

            if ctx.filter.is_excluded(candidate.name) {
                continue;
            }
            let Some(price) = items::parse_price(candidate.price_text) else {
                continue;
            };
            if !seen.insert(candidate.name) {
                continue;
            }

            let check = changes::check(&tx, store_id, candidate.name, price)?;
            if !check.is_change() {
                continue;
            }
            match check {
                PriceCheck::Changed { from } => {
                    info!(store_id, item = candidate.name, "Price change: ${} -> ${}", from, price)
                }
                _ => info!(store_id, item = candidate.name, "New item at ${}", price),
            }

            db::insert_price(
                &tx,
                &PriceRow {
                    store_id: store_id.to_string(),
                    item_name: candidate.name.to_string(),
                    price,
                    scrape_date: ctx.today,
                },
            )?;
            counts.prices_changed += 1;
        }
    }

    db::mark_scraped(&tx, store_id, ctx.today)?;
    tx.commit()?;

    info!(
        store_id,
        "Finished store: processed {} items, recorded {} price changes",
        counts.items_processed,
        counts.prices_changed
    );
    Ok(StoreOutcome::Done(counts))
}
