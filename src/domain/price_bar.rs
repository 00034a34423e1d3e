//! Daily OHLCV bar.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::fixed;

/// Upper bound (exclusive) on a plausible share price.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// One trading day for one symbol. Prices carry 6 fractional digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceBar {
    pub trade_date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl PriceBar {
    pub fn new(
        trade_date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: i64,
    ) -> Self {
        PriceBar {
            trade_date,
            open: fixed::round_price(open),
            high: fixed::round_price(high),
            low: fixed::round_price(low),
            close: fixed::round_price(close),
            volume,
        }
    }

    /// Check `low <= open, close <= high`, non-negative prices and volume.
    ///
    /// Returns a short description of the first violated rule.
    pub fn check(&self) -> Result<(), String> {
        if self.high < self.low {
            return Err(format!("high {} below low {}", self.high, self.low));
        }
        for (name, value) in [("open", self.open), ("close", self.close)] {
            if value < self.low || value > self.high {
                return Err(format!(
                    "{name} {value} outside [{}, {}]",
                    self.low, self.high
                ));
            }
        }
        if self.low.is_sign_negative() && !self.low.is_zero() {
            return Err(format!("negative low {}", self.low));
        }
        if self.high >= MAX_PRICE {
            return Err(format!("high {} exceeds price ceiling", self.high));
        }
        if self.volume < 0 {
            return Err(format!("negative volume {}", self.volume));
        }
        Ok(())
    }

    /// Close in fixed-point micro-units.
    pub fn close_micros(&self) -> Option<i64> {
        fixed::to_micros(self.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_bar() -> PriceBar {
        PriceBar::new(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            dec!(100),
            dec!(110),
            dec!(90),
            dec!(105),
            50_000,
        )
    }

    #[test]
    fn valid_bar_passes() {
        assert!(sample_bar().check().is_ok());
    }

    #[test]
    fn flat_bar_passes() {
        let bar = PriceBar::new(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            dec!(10),
            dec!(10),
            dec!(10),
            dec!(10),
            0,
        );
        assert!(bar.check().is_ok());
    }

    #[test]
    fn high_below_low_fails() {
        let bar = PriceBar {
            high: dec!(80),
            ..sample_bar()
        };
        let reason = bar.check().unwrap_err();
        assert!(reason.starts_with("high 80 below low 90"));
    }

    #[test]
    fn close_above_high_fails() {
        let bar = PriceBar {
            close: dec!(111),
            ..sample_bar()
        };
        assert!(bar.check().unwrap_err().starts_with("close 111 outside"));
    }

    #[test]
    fn open_below_low_fails() {
        let bar = PriceBar {
            open: dec!(89.5),
            ..sample_bar()
        };
        assert!(bar.check().unwrap_err().starts_with("open 89.5 outside"));
    }

    #[test]
    fn negative_volume_fails() {
        let bar = PriceBar {
            volume: -1,
            ..sample_bar()
        };
        assert_eq!(bar.check().unwrap_err(), "negative volume -1");
    }

    #[test]
    fn negative_prices_fail() {
        let bar = PriceBar::new(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            dec!(-1),
            dec!(-1),
            dec!(-2),
            dec!(-1),
            10,
        );
        assert!(bar.check().unwrap_err().starts_with("negative low"));
    }

    #[test]
    fn price_ceiling_enforced() {
        let bar = PriceBar::new(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            dec!(10),
            dec!(1000000000),
            dec!(10),
            dec!(10),
            10,
        );
        assert!(bar.check().unwrap_err().contains("price ceiling"));
    }

    #[test]
    fn new_rounds_to_six_digits() {
        let bar = PriceBar::new(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            dec!(1.23456789),
            dec!(2),
            dec!(1),
            dec!(1.5000005),
            1,
        );
        assert_eq!(bar.open, dec!(1.234568));
        assert_eq!(bar.close, dec!(1.500001));
        assert_eq!(bar.close_micros(), Some(1_500_001));
    }
}
