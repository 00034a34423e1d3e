//! PostgreSQL data adapter.
//!
//! Reads `symbols` joined with `historical_prices`. Prices are
//! `NUMERIC(18,6)` and decode straight into `Decimal`.

use crate::domain::error::EngineError;
use crate::domain::series::DateRange;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, PriceRow};
use chrono::NaiveDate;
use postgres::NoTls;
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;

pub struct PostgresAdapter {
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

fn query_err(e: postgres::Error) -> EngineError {
    EngineError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, EngineError> {
        // [postgres] connection_string first, then [database] conninfo
        let connection_string = config
            .get_trimmed("postgres", "connection_string")
            .or_else(|| config.get_trimmed("database", "conninfo"))
            .ok_or_else(|| EngineError::missing("database", "conninfo"))?;

        let pg_config = connection_string
            .parse::<postgres::Config>()
            .map_err(|e| EngineError::invalid("postgres", "connection_string", e.to_string()))?;
        let pool_size = config.get_integer("postgres", "pool_size")?.unwrap_or(4).max(1) as u32;

        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| EngineError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<PostgresConnectionManager<NoTls>>, EngineError> {
        self.pool.get().map_err(|e: r2d2::Error| EngineError::Database {
            reason: e.to_string(),
        })
    }
}

impl DataPort for PostgresAdapter {
    fn fetch(&self, symbols: &[String], range: DateRange) -> Result<Vec<PriceRow>, EngineError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let query = "SELECT s.symbol, p.trade_date, p.open, p.high, p.low, p.close, p.volume \
                     FROM historical_prices p \
                     JOIN symbols s ON s.symbol_id = p.symbol_id \
                     WHERE s.symbol = ANY($1) AND p.trade_date >= $2 AND p.trade_date <= $3 \
                     ORDER BY s.symbol, p.trade_date";

        let rows = self
            .conn()?
            .query(query, &[&symbols, &range.start, &range.end])
            .map_err(query_err)?;

        rows.iter()
            .map(|row| {
                Ok(PriceRow {
                    symbol: row.try_get(0)?,
                    trade_date: row.try_get(1)?,
                    open: row.try_get(2)?,
                    high: row.try_get(3)?,
                    low: row.try_get(4)?,
                    close: row.try_get(5)?,
                    volume: row.try_get(6)?,
                })
            })
            .collect::<Result<Vec<_>, postgres::Error>>()
            .map_err(query_err)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let query = "SELECT s.symbol FROM symbols s \
                     WHERE EXISTS (SELECT 1 FROM historical_prices p WHERE p.symbol_id = s.symbol_id) \
                     ORDER BY s.symbol";

        let rows = self.conn()?.query(query, &[]).map_err(query_err)?;
        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError> {
        let query = "SELECT MIN(p.trade_date), MAX(p.trade_date), COUNT(*) \
                     FROM historical_prices p \
                     JOIN symbols s ON s.symbol_id = p.symbol_id \
                     WHERE s.symbol = $1";

        let row = self
            .conn()?
            .query_one(query, &[&symbol])
            .map_err(query_err)?;

        let first: Option<NaiveDate> = row.get(0);
        let last: Option<NaiveDate> = row.get(1);
        let count: i64 = row.get(2);

        match (first, last) {
            (Some(first), Some(last)) if count > 0 => Ok(Some((first, last, count as usize))),
            _ => Ok(None),
        }
    }
}
