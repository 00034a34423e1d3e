//! Open position state and closed trade records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Long-only position for one symbol. A flat position has zero shares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    pub shares_held: i64,
    pub average_entry_price: Decimal,
    /// Notional plus entry fee paid to open the position.
    pub cash_committed: Decimal,
    pub entry_fee: Decimal,
    pub entry_date: Option<NaiveDate>,
}

impl Position {
    pub fn flat() -> Self {
        Position::default()
    }

    pub fn is_open(&self) -> bool {
        self.shares_held > 0
    }

    pub fn market_value(&self, price: Decimal) -> Decimal {
        Decimal::from(self.shares_held) * price
    }

    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        Decimal::from(self.shares_held) * (price - self.average_entry_price)
    }
}

/// A completed round trip. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trade {
    pub symbol: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: i64,
    /// Entry plus exit fee.
    pub fees: Decimal,
    pub realized_pnl: Decimal,
    pub forced_close: bool,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.realized_pnl > Decimal::ZERO
    }

    pub fn entry_notional(&self) -> Decimal {
        Decimal::from(self.quantity) * self.entry_price
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}

pub type TradeLog = Vec<Trade>;
