//! Fill simulation: sizing, fees, entry and exit at the bar's close.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::position::{Position, Trade};
use super::strategy::FeeModel;

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryResult {
    Entered {
        quantity: i64,
        cost: Decimal,
        fee: Decimal,
    },
    InsufficientCapital {
        budget: Decimal,
    },
}

/// Largest whole share count whose notional fits in `budget`. Fees are not
/// part of sizing, so the same bar buys the same quantity under any fee
/// model. Saturates at `i64::MAX`.
pub fn size_entry(budget: Decimal, price: Decimal) -> i64 {
    if price <= Decimal::ZERO || budget <= Decimal::ZERO {
        return 0;
    }
    match budget.checked_div(price) {
        Some(shares) => shares.floor().to_i64().unwrap_or(i64::MAX),
        None => i64::MAX,
    }
}

/// Open a long position at `price` with `sizing` of the available cash.
///
/// The fee is paid from cash on top of the sized notional. When cash cannot
/// cover both, the entry is skipped.
pub fn enter_long(
    position: &mut Position,
    cash: &mut Decimal,
    price: Decimal,
    date: NaiveDate,
    sizing: Decimal,
    fees: &FeeModel,
) -> EntryResult {
    let budget = *cash * sizing;
    let quantity = size_entry(budget, price);
    if quantity == 0 {
        return EntryResult::InsufficientCapital { budget };
    }

    let cost = Decimal::from(quantity) * price;
    let fee = fees.fee(cost);
    if cost + fee > *cash {
        return EntryResult::InsufficientCapital { budget };
    }
    *cash -= cost + fee;

    *position = Position {
        shares_held: quantity,
        average_entry_price: price,
        cash_committed: cost + fee,
        entry_fee: fee,
        entry_date: Some(date),
    };

    EntryResult::Entered {
        quantity,
        cost,
        fee,
    }
}

/// Close the whole position at `price` and return the trade. `None` if flat.
pub fn exit_long(
    position: &mut Position,
    cash: &mut Decimal,
    symbol: &str,
    price: Decimal,
    date: NaiveDate,
    fees: &FeeModel,
    forced_close: bool,
) -> Option<Trade> {
    if !position.is_open() {
        return None;
    }
    let entry_date = position.entry_date?;
    let closed = std::mem::take(position);

    let quantity = Decimal::from(closed.shares_held);
    let proceeds = quantity * price;
    let exit_fee = fees.fee(proceeds);
    *cash += proceeds - exit_fee;

    let realized_pnl =
        quantity * (price - closed.average_entry_price) - closed.entry_fee - exit_fee;

    Some(Trade {
        symbol: symbol.to_string(),
        entry_date,
        exit_date: date,
        entry_price: closed.average_entry_price,
        exit_price: price,
        quantity: closed.shares_held,
        fees: closed.entry_fee + exit_fee,
        realized_pnl,
        forced_close,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn size_whole_shares() {
        assert_eq!(size_entry(dec!(5000), dec!(12)), 416);
        assert_eq!(size_entry(dec!(5000), dec!(5000)), 1);
        assert_eq!(size_entry(dec!(4999.99), dec!(5000)), 0);
    }

    #[test]
    fn size_zero_price_or_budget() {
        assert_eq!(size_entry(dec!(1000), dec!(0)), 0);
        assert_eq!(size_entry(dec!(0), dec!(10)), 0);
    }

    #[test]
    fn size_saturates_instead_of_wrapping() {
        // 1e14 / 1e-6 shares does not fit in i64.
        assert_eq!(size_entry(dec!(100000000000000), dec!(0.000001)), i64::MAX);
        assert_eq!(
            size_entry(dec!(1000000000000), dec!(0.000001)),
            1_000_000_000_000_000_000
        );
    }

    #[test]
    fn fee_does_not_change_quantity() {
        // Fee-inclusive sizing would buy 99 here: 100 * 10 * 1.01 > 1000.
        let mut position = Position::flat();
        let mut cash = dec!(2000);
        let fees = FeeModel::Proportional(dec!(0.01));
        let result = enter_long(&mut position, &mut cash, dec!(10), date(2), dec!(0.5), &fees);
        assert_eq!(
            result,
            EntryResult::Entered {
                quantity: 100,
                cost: dec!(1000),
                fee: dec!(10),
            }
        );
        assert_eq!(cash, dec!(990));
    }

    #[test]
    fn fee_not_covered_by_cash_skips_entry() {
        let mut position = Position::flat();
        let mut cash = dec!(1000);
        let fees = FeeModel::Flat(dec!(5));
        let result = enter_long(&mut position, &mut cash, dec!(10), date(2), dec!(1), &fees);
        assert_eq!(
            result,
            EntryResult::InsufficientCapital { budget: dec!(1000) }
        );
        assert_eq!(cash, dec!(1000));
        assert!(!position.is_open());
    }

    #[test]
    fn enter_deducts_cost_and_fee() {
        let mut position = Position::flat();
        let mut cash = dec!(10000);
        let fees = FeeModel::Proportional(dec!(0.001));
        let result = enter_long(&mut position, &mut cash, dec!(12), date(2), dec!(0.5), &fees);
        assert_eq!(
            result,
            EntryResult::Entered {
                quantity: 416,
                cost: dec!(4992),
                fee: dec!(4.992),
            }
        );
        assert_eq!(cash, dec!(5003.008));
        assert_eq!(position.shares_held, 416);
        assert_eq!(position.cash_committed, dec!(4996.992));
        assert_eq!(position.entry_date, Some(date(2)));
    }

    #[test]
    fn enter_insufficient_capital_leaves_state() {
        let mut position = Position::flat();
        let mut cash = dec!(100);
        let result = enter_long(
            &mut position,
            &mut cash,
            dec!(500),
            date(2),
            dec!(1),
            &FeeModel::None,
        );
        assert_eq!(
            result,
            EntryResult::InsufficientCapital { budget: dec!(100) }
        );
        assert_eq!(cash, dec!(100));
        assert!(!position.is_open());
    }

    #[test]
    fn round_trip_pnl_nets_both_fees() {
        let mut position = Position::flat();
        let mut cash = dec!(10000);
        let fees = FeeModel::Proportional(dec!(0.001));
        enter_long(&mut position, &mut cash, dec!(12), date(2), dec!(0.5), &fees);
        let trade = exit_long(&mut position, &mut cash, "AAA", dec!(15), date(4), &fees, false)
            .unwrap();
        assert_eq!(trade.quantity, 416);
        assert_eq!(trade.fees, dec!(11.232));
        assert_eq!(trade.realized_pnl, dec!(1248) - dec!(11.232));
        assert_eq!(cash, dec!(10000) + trade.realized_pnl);
        assert!(!position.is_open());
        assert!(!trade.forced_close);
    }

    #[test]
    fn exit_when_flat_is_none() {
        let mut position = Position::flat();
        let mut cash = dec!(1);
        assert!(exit_long(
            &mut position,
            &mut cash,
            "AAA",
            dec!(1),
            date(3),
            &FeeModel::None,
            true
        )
        .is_none());
    }
}
