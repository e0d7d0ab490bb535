//! Position — one open exposure to a single instrument.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Side of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

/// An open position. Quantity is strictly positive; direction lives in `side`.
///
/// The side never changes in place — a reversal closes the position and opens
/// a fresh one on the other side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub instrument: String,
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    /// Last mark-to-market price, None until the first mark.
    pub mark_price: Option<f64>,
    /// PnL realized by partial reductions of this position.
    pub realized_pnl: f64,
}

impl Position {
    pub fn new(
        instrument: String,
        side: Side,
        quantity: f64,
        entry_price: f64,
        entry_time: DateTime<Utc>,
    ) -> Self {
        debug_assert!(quantity > 0.0, "position quantity must be positive");
        debug_assert!(entry_price > 0.0, "entry price must be positive");
        Self {
            instrument,
            side,
            quantity,
            entry_price,
            entry_time,
            mark_price: None,
            realized_pnl: 0.0,
        }
    }

    /// Update the mark price. Unrealized PnL is derived from it.
    pub fn update_mark(&mut self, price: f64) {
        self.mark_price = Some(price);
    }

    /// Price used for valuation: the last mark, or entry before any mark.
    pub fn valuation_price(&self) -> f64 {
        self.mark_price.unwrap_or(self.entry_price)
    }

    /// Unrealized PnL at the current mark. Longs gain when price rises,
    /// shorts gain when price falls.
    pub fn unrealized_pnl(&self) -> f64 {
        let price = self.valuation_price();
        match self.side {
            Side::Long => (price - self.entry_price) * self.quantity,
            Side::Short => (self.entry_price - price) * self.quantity,
        }
    }

    /// Signed market value: positive for longs, negative for shorts.
    ///
    /// A short is a liability (the cover cost), so it reduces portfolio
    /// value as the price rises. The sign convention is what makes the
    /// conservation identity close for both sides.
    pub fn market_value(&self) -> f64 {
        let gross = self.quantity * self.valuation_price();
        match self.side {
            Side::Long => gross,
            Side::Short => -gross,
        }
    }

    /// Notional at entry, always positive.
    pub fn entry_notional(&self) -> f64 {
        self.quantity * self.entry_price
    }

    /// Realized + unrealized PnL.
    pub fn total_pnl(&self) -> f64 {
        self.realized_pnl + self.unrealized_pnl()
    }

    /// PnL of closing `quantity` units at `exit_price`, gross of costs.
    pub fn pnl_at(&self, exit_price: f64, quantity: f64) -> f64 {
        match self.side {
            Side::Long => (exit_price - self.entry_price) * quantity,
            Side::Short => (self.entry_price - exit_price) * quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn long_gains_when_price_rises() {
        let mut pos = Position::new("BTC-USD".into(), Side::Long, 10.0, 100.0, entry_time());
        pos.update_mark(110.0);
        assert_eq!(pos.unrealized_pnl(), 100.0);
        assert_eq!(pos.market_value(), 1100.0);
    }

    #[test]
    fn short_gains_when_price_falls() {
        let mut pos = Position::new("BTC-USD".into(), Side::Short, 10.0, 100.0, entry_time());
        pos.update_mark(90.0);
        assert_eq!(pos.unrealized_pnl(), 100.0);
        assert_eq!(pos.market_value(), -900.0);
    }

    #[test]
    fn valuation_falls_back_to_entry_before_first_mark() {
        let pos = Position::new("BTC-USD".into(), Side::Long, 5.0, 200.0, entry_time());
        assert_eq!(pos.valuation_price(), 200.0);
        assert_eq!(pos.unrealized_pnl(), 0.0);
        assert_eq!(pos.market_value(), 1000.0);
    }

    #[test]
    fn pnl_at_is_side_dependent() {
        let long = Position::new("X".into(), Side::Long, 10.0, 100.0, entry_time());
        let short = Position::new("X".into(), Side::Short, 10.0, 100.0, entry_time());
        assert_eq!(long.pnl_at(110.0, 10.0), 100.0);
        assert_eq!(short.pnl_at(110.0, 10.0), -100.0);
    }

    #[test]
    fn opposite_side() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::Short.opposite(), Side::Long);
    }
}
