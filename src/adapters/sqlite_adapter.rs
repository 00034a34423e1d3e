//! SQLite data adapter.
//!
//! Same two-table layout as the production store: `symbols` holds one row
//! per ticker, `historical_prices` one row per `(symbol_id, trade_date)`.
//! Prices are stored as decimal text so nothing is lost to binary floats.

use crate::domain::error::EngineError;
use crate::domain::series::DateRange;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, PriceRow};
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn query_err(e: rusqlite::Error) -> EngineError {
    EngineError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, EngineError> {
        let db_path = config
            .get_trimmed("sqlite", "path")
            .ok_or_else(|| EngineError::missing("sqlite", "path"))?;

        let pool_size = config.get_integer("sqlite", "pool_size")?.unwrap_or(4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| EngineError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    /// A private in-memory database. The pool holds a single connection so
    /// every call sees the same data.
    pub fn in_memory() -> Result<Self, EngineError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| EngineError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, EngineError> {
        self.pool.get().map_err(|e: r2d2::Error| EngineError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), EngineError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS symbols (
                    symbol_id INTEGER PRIMARY KEY,
                    symbol TEXT NOT NULL UNIQUE
                );
                CREATE TABLE IF NOT EXISTS historical_prices (
                    symbol_id INTEGER NOT NULL REFERENCES symbols(symbol_id),
                    trade_date TEXT NOT NULL,
                    open TEXT NOT NULL,
                    high TEXT NOT NULL,
                    low TEXT NOT NULL,
                    close TEXT NOT NULL,
                    volume INTEGER NOT NULL,
                    UNIQUE (symbol_id, trade_date)
                );
                CREATE INDEX IF NOT EXISTS idx_prices_date ON historical_prices(trade_date);",
            )
            .map_err(query_err)
    }

    /// Insert rows in one transaction, creating symbols as needed. A row for
    /// an existing `(symbol, trade_date)` replaces the old one.
    pub fn insert_rows(&self, rows: &[PriceRow]) -> Result<(), EngineError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for row in rows {
            tx.execute(
                "INSERT OR IGNORE INTO symbols (symbol) VALUES (?1)",
                params![row.symbol],
            )
            .map_err(query_err)?;
            tx.execute(
                "INSERT OR REPLACE INTO historical_prices
                     (symbol_id, trade_date, open, high, low, close, volume)
                 SELECT symbol_id, ?2, ?3, ?4, ?5, ?6, ?7 FROM symbols WHERE symbol = ?1",
                params![
                    row.symbol,
                    row.trade_date.format(DATE_FORMAT).to_string(),
                    row.open.to_string(),
                    row.high.to_string(),
                    row.low.to_string(),
                    row.close.to_string(),
                    row.volume
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        debug!(rows = rows.len(), "inserted price rows");
        Ok(())
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| EngineError::DatabaseQuery {
        reason: format!("invalid trade_date '{raw}': {e}"),
    })
}

fn parse_price(raw: &str) -> Result<Decimal, EngineError> {
    Decimal::from_str(raw).map_err(|e| EngineError::DatabaseQuery {
        reason: format!("invalid price '{raw}': {e}"),
    })
}

impl DataPort for SqliteAdapter {
    fn fetch(&self, symbols: &[String], range: DateRange) -> Result<Vec<PriceRow>, EngineError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;

        let placeholders: Vec<String> = (0..symbols.len()).map(|i| format!("?{}", i + 3)).collect();
        let query = format!(
            "SELECT s.symbol, p.trade_date, p.open, p.high, p.low, p.close, p.volume
             FROM historical_prices p
             JOIN symbols s ON s.symbol_id = p.symbol_id
             WHERE p.trade_date >= ?1 AND p.trade_date <= ?2 AND s.symbol IN ({})
             ORDER BY s.symbol, p.trade_date",
            placeholders.join(", ")
        );

        let mut args = vec![
            range.start.format(DATE_FORMAT).to_string(),
            range.end.format(DATE_FORMAT).to_string(),
        ];
        args.extend(symbols.iter().cloned());

        let mut stmt = conn.prepare(&query).map_err(query_err)?;
        let raw = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    [
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ],
                    row.get::<_, i64>(6)?,
                ))
            })
            .map_err(query_err)?;

        let mut rows = Vec::new();
        for item in raw {
            let (symbol, date, [open, high, low, close], volume) = item.map_err(query_err)?;
            rows.push(PriceRow {
                symbol,
                trade_date: parse_date(&date)?,
                open: parse_price(&open)?,
                high: parse_price(&high)?,
                low: parse_price(&low)?,
                close: parse_price(&close)?,
                volume,
            });
        }
        Ok(rows)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT s.symbol FROM symbols s
                 WHERE EXISTS (SELECT 1 FROM historical_prices p WHERE p.symbol_id = s.symbol_id)
                 ORDER BY s.symbol",
            )
            .map_err(query_err)?;
        let symbols = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_err)?;
        Ok(symbols)
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError> {
        let conn = self.conn()?;
        let (first, last, count): (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(p.trade_date), MAX(p.trade_date), COUNT(*)
                 FROM historical_prices p
                 JOIN symbols s ON s.symbol_id = p.symbol_id
                 WHERE s.symbol = ?1",
                params![symbol],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match (first, last) {
            (Some(first), Some(last)) if count > 0 => Ok(Some((
                parse_date(&first)?,
                parse_date(&last)?,
                count as usize,
            ))),
            _ => Ok(None),
        }
    }
}
