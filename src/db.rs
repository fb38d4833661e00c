use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS stores (
            store_id          TEXT PRIMARY KEY,
            last_scraped_date TEXT
        );

        CREATE TABLE IF NOT EXISTS prices (
            id          INTEGER PRIMARY KEY,
            store_id    TEXT NOT NULL REFERENCES stores(store_id),
            item_name   TEXT NOT NULL,
            price       REAL NOT NULL,
            scrape_date TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_prices_store_item
            ON prices(store_id, item_name, scrape_date);
        ",
    )?;
    Ok(())
}

// ── Stores ──

pub fn register_stores(conn: &Connection, store_ids: &[String]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO stores (store_id) VALUES (?1)")?;
        for id in store_ids {
            count += stmt.execute(rusqlite::params![id])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_store_ids(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT store_id FROM stores ORDER BY store_id")?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_scraped(conn: &Connection, store_id: &str, date: NaiveDate) -> Result<()> {
    conn.execute(
        "UPDATE stores SET last_scraped_date = ?1 WHERE store_id = ?2",
        rusqlite::params![date.format(DATE_FORMAT).to_string(), store_id],
    )?;
    Ok(())
}

pub fn last_scraped(conn: &Connection, store_id: &str) -> Result<Option<String>> {
    let date = conn
        .query_row(
            "SELECT last_scraped_date FROM stores WHERE store_id = ?1",
            rusqlite::params![store_id],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(date.flatten())
}

// ── Prices ──

pub struct PriceRow {
    pub store_id: String,
    pub item_name: String,
    pub price: f64,
    pub scrape_date: NaiveDate,
}

/// Most recent recorded price for an item at a store.
pub fn latest_price(conn: &Connection, store_id: &str, item_name: &str) -> Result<Option<f64>> {
    let price = conn
        .query_row(
            "SELECT price FROM prices
             WHERE store_id = ?1 AND item_name = ?2
             ORDER BY scrape_date DESC, id DESC
             LIMIT 1",
            rusqlite::params![store_id, item_name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(price)
}

pub fn insert_price(conn: &Connection, row: &PriceRow) -> Result<()> {
    conn.execute(
        "INSERT INTO prices (store_id, item_name, price, scrape_date) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            row.store_id,
            row.item_name,
            row.price,
            row.scrape_date.format(DATE_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub struct HistoryRow {
    pub price: f64,
    pub scrape_date: String,
}

/// Every recorded price for an item at a store, oldest first.
pub fn price_history(conn: &Connection, store_id: &str, item_name: &str) -> Result<Vec<HistoryRow>> {
    let mut stmt = conn.prepare(
        "SELECT price, scrape_date FROM prices
         WHERE store_id = ?1 AND item_name = ?2
         ORDER BY scrape_date, id",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![store_id, item_name], |row| {
            Ok(HistoryRow {
                price: row.get(0)?,
                scrape_date: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub stores: usize,
    pub scraped: usize,
    pub unscraped: usize,
    pub observations: usize,
    pub items: usize,
    pub last_scrape: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let stores: usize = conn.query_row("SELECT COUNT(*) FROM stores", [], |r| r.get(0))?;
    let scraped: usize = conn.query_row(
        "SELECT COUNT(*) FROM stores WHERE last_scraped_date IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let observations: usize = conn.query_row("SELECT COUNT(*) FROM prices", [], |r| r.get(0))?;
    let items: usize = conn.query_row(
        "SELECT COUNT(*) FROM (SELECT DISTINCT store_id, item_name FROM prices)",
        [],
        |r| r.get(0),
    )?;
    let last_scrape: Option<String> =
        conn.query_row("SELECT MAX(last_scraped_date) FROM stores", [], |r| r.get(0))?;
    Ok(Stats {
        stores,
        scraped,
        unscraped: stores - scraped,
        observations,
        items,
        last_scrape,
    })
}
