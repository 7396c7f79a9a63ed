//! Per-token inventory position.

use super::ids::TokenId;
use super::money::{Price, Volume};

/// Per-token position: shares held, volume-weighted average entry
/// price, realized P&L, and cumulative fees (negative total = net
/// rebates earned).
#[derive(Debug, Clone)]
pub struct Position {
    token_id: TokenId,
    size: Volume,
    avg_entry_price: Price,
    realized_pnl: Price,
    total_fees_paid: Price,
}

impl Position {
    #[must_use]
    pub fn flat(token_id: TokenId) -> Self {
        Self {
            token_id,
            size: Volume::ZERO,
            avg_entry_price: Price::ZERO,
            realized_pnl: Price::ZERO,
            total_fees_paid: Price::ZERO,
        }
    }

    #[must_use]
    pub const fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    #[must_use]
    pub const fn size(&self) -> Volume {
        self.size
    }

    #[must_use]
    pub const fn avg_entry_price(&self) -> Price {
        self.avg_entry_price
    }

    #[must_use]
    pub const fn realized_pnl(&self) -> Price {
        self.realized_pnl
    }

    #[must_use]
    pub const fn total_fees_paid(&self) -> Price {
        self.total_fees_paid
    }

    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }

    /// Unrealized P&L against a mark price.
    #[must_use]
    pub fn unrealized_pnl(&self, mark: Price) -> Price {
        if self.size.is_zero() {
            Price::ZERO
        } else {
            (mark - self.avg_entry_price) * self.size
        }
    }

    /// Apply a BUY fill: volume-weighted average entry, size increases,
    /// realized P&L is unchanged.
    pub fn apply_buy(&mut self, fill_size: Volume, fill_price: Price, fee: Price) {
        let new_size = self.size + fill_size;
        if new_size > Volume::ZERO {
            self.avg_entry_price =
                (self.size * self.avg_entry_price + fill_size * fill_price) / new_size;
        }
        self.size = new_size;
        self.total_fees_paid += fee;
    }

    /// Apply a SELL fill: size decreases, average entry is unchanged,
    /// realized P&L accrues `(price - avg_entry) * size`.
    pub fn apply_sell(&mut self, fill_size: Volume, fill_price: Price, fee: Price) {
        self.realized_pnl += (fill_price - self.avg_entry_price) * fill_size;
        self.size -= fill_size;
        if self.size <= Volume::ZERO {
            self.size = Volume::ZERO;
            self.avg_entry_price = Price::ZERO;
        }
        self.total_fees_paid += fee;
    }

    /// Authoritative overwrite from a REST positions snapshot.
    pub fn set_authoritative(&mut self, size: Volume, avg_price: Price) {
        self.size = size;
        self.avg_entry_price = if size.is_zero() { Price::ZERO } else { avg_price };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position() -> Position {
        Position::flat(TokenId::from("tok"))
    }

    #[test]
    fn buy_updates_volume_weighted_average() {
        let mut p = position();
        p.apply_buy(dec!(100), dec!(0.40), dec!(0.01));
        p.apply_buy(dec!(100), dec!(0.60), dec!(0.01));
        assert_eq!(p.size, dec!(200));
        assert_eq!(p.avg_entry_price, dec!(0.50));
        assert_eq!(p.realized_pnl, Price::ZERO);
    }

    #[test]
    fn sell_accrues_realized_pnl_without_moving_average() {
        let mut p = position();
        p.apply_buy(dec!(100), dec!(0.40), dec!(0));
        p.apply_sell(dec!(40), dec!(0.50), dec!(0));
        assert_eq!(p.size, dec!(60));
        assert_eq!(p.avg_entry_price, dec!(0.40));
        assert_eq!(p.realized_pnl, dec!(4.00));
    }

    #[test]
    fn scenario_empty_start_single_fill() {
        let mut p = position();
        p.apply_buy(dec!(5), dec!(0.49), dec!(-0.01));
        assert_eq!(p.size, dec!(5));
        assert_eq!(p.avg_entry_price, dec!(0.49));
        assert_eq!(p.total_fees_paid, dec!(-0.01));
    }

    #[test]
    fn selling_to_flat_resets_average_entry() {
        let mut p = position();
        p.apply_buy(dec!(10), dec!(0.40), dec!(0));
        p.apply_sell(dec!(10), dec!(0.50), dec!(0));
        assert!(p.is_flat());
        assert_eq!(p.avg_entry_price, Price::ZERO);
    }

    #[test]
    fn snapshot_equal_to_local_state_is_a_no_op() {
        let mut p = position();
        p.apply_buy(dec!(10), dec!(0.40), dec!(0));
        let before = (p.size, p.avg_entry_price, p.realized_pnl);
        p.set_authoritative(dec!(10), dec!(0.40));
        assert_eq!((p.size, p.avg_entry_price, p.realized_pnl), before);
    }
}
