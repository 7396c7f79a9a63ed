//! Quote Engine: decides what to quote for one token given
//! its order book, inventory, and risk state.

use crate::core::domain::{MarketState, Price, Quote, QuoteDecision, Volume};

/// Tunables for the quoting formula.
#[derive(Debug, Clone)]
pub struct QuoteConfig {
    /// Minimum resting size a book level must carry before it's used as the
    /// quoting reference; below this, the raw top of book is used instead.
    pub min_reference_size: Volume,
    /// Half-spread applied to the reference mid when quoting both sides.
    pub half_spread: Price,
    /// Base quote size before inventory skew and the circuit breaker's
    /// position-limit multiplier are applied.
    pub base_size: Volume,
    /// Inventory beyond which the engine stops quoting that side entirely.
    pub max_position: Volume,
    /// Floor/ceiling the tradable band.
    pub min_price: Price,
    pub max_price: Price,
    /// Half-width (in percentage points, i.e. divided by 100 before use)
    /// of the rebate-eligible band around mid. A candidate quote further
    /// from mid than this is skipped rather than clamped into range.
    pub max_spread_pct: Price,
    /// If true, a momentum cooldown cancels resting quotes outright; if
    /// false it only suppresses requoting, leaving the current quote
    /// resting.
    pub cancel_on_momentum: bool,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            min_reference_size: dec!(50),
            half_spread: dec!(0.01),
            base_size: dec!(100),
            max_position: dec!(500),
            min_price: dec!(0.10),
            max_price: dec!(0.90),
            max_spread_pct: dec!(10),
            cancel_on_momentum: true,
        }
    }
}

/// Computes the next [`QuoteDecision`] for a market given its current state.
pub struct QuoteEngine {
    config: QuoteConfig,
}

impl QuoteEngine {
    #[must_use]
    pub fn new(config: QuoteConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn max_position(&self) -> Volume {
        self.config.max_position
    }

    /// Decide what to quote for `market`, applying the circuit breaker's
    /// position-limit multiplier to the base size.
    #[must_use]
    pub fn decide(&self, market: &MarketState, position_limit_multiplier: Volume) -> QuoteDecision {
        if !market.orderbook().is_consistent() {
            return QuoteDecision::CancelAll;
        }
        if market.in_momentum_cooldown(chrono::Utc::now()) {
            return if self.config.cancel_on_momentum { QuoteDecision::CancelAll } else { QuoteDecision::KeepCurrent };
        }

        let book = market.orderbook();
        let Some((top_bid, _)) = book.best_bid() else { return QuoteDecision::CancelAll };
        let Some((top_ask, _)) = book.best_ask() else { return QuoteDecision::CancelAll };

        // Rule 1: quote off a level carrying at least min_reference_size,
        // falling back to the raw top of book when nothing qualifies.
        let (bid_ref, bid_ref_size) =
            book.best_bid_with_min_size(self.config.min_reference_size).unwrap_or((top_bid, Volume::ZERO));
        let (ask_ref, ask_ref_size) =
            book.best_ask_with_min_size(self.config.min_reference_size).unwrap_or((top_ask, Volume::ZERO));

        // Rule 2: improve by one tick once the reference level is deep
        // (>= 1.5x min_reference_size); otherwise match it outright.
        let tick = book.tick_size();
        let improve_threshold = self.config.min_reference_size * Volume::new(15, 1);
        let mut bid_price = if bid_ref_size >= improve_threshold { bid_ref + tick } else { bid_ref };
        let mut ask_price = if ask_ref_size >= improve_threshold { ask_ref - tick } else { ask_ref };

        // Rule 3 (ask floor): never sell below the position's average entry
        // once a long position exists.
        let position = market.position();
        if position.size() > Volume::ZERO {
            ask_price = ask_price.max(position.avg_entry_price());
        }

        bid_price = bid_price.round_dp(2);
        ask_price = ask_price.round_dp(2);

        // Rule 4: candidates would cross — fall back to the unimproved top
        // of book rather than cancelling outright.
        if bid_price >= ask_price {
            bid_price = top_bid;
            ask_price = top_ask;
            if bid_price >= ask_price {
                return QuoteDecision::CancelAll;
            }
        }

        // Rule 5: price band and rebate-eligible band, applied per side —
        // a quote may end up one-sided rather than skipped entirely.
        let mid = (top_bid + top_ask) / Price::from(2);
        let rebate_half_width = self.config.max_spread_pct / Price::from(100);
        let bid_valid = bid_price > self.config.min_price
            && bid_price < self.config.max_price
            && bid_price >= mid - rebate_half_width;
        let ask_valid = ask_price > self.config.min_price
            && ask_price < self.config.max_price
            && ask_price <= mid + rebate_half_width;

        if !bid_valid && !ask_valid {
            return QuoteDecision::CancelAll;
        }

        // Inventory-skewed sizing. SELL always quotes at the full trade
        // size to qualify for two-sided rebate liquidity, overriding the
        // naive heuristic of shrinking (or zeroing) the ask to whatever is
        // currently held.
        let trade_size = self.config.base_size * position_limit_multiplier;
        let bid_size = if bid_valid && position.size() < self.config.max_position { trade_size } else { Volume::ZERO };
        let ask_size = if ask_valid { trade_size } else { Volume::ZERO };

        if bid_size <= Volume::ZERO && ask_size <= Volume::ZERO {
            return QuoteDecision::CancelAll;
        }

        let quote = Quote::new(market.token_id().clone(), bid_price, bid_size, ask_price, ask_size, chrono::Utc::now());

        if let Some(existing) = market.last_quote() {
            if quotes_equivalent(existing, &quote) {
                return QuoteDecision::KeepCurrent;
            }
        }

        QuoteDecision::PlaceQuote(quote)
    }
}

/// Skip replacing a resting quote for sub-tick price/size noise.
fn quotes_equivalent(a: &Quote, b: &Quote) -> bool {
    a.bid_price() == b.bid_price()
        && a.ask_price() == b.ask_price()
        && a.bid_size() == b.bid_size()
        && a.ask_size() == b.ask_size()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{MarketId, TokenId};
    use rust_decimal_macros::dec;

    fn market_with_book(bid: Price, bid_size: Volume, ask: Price, ask_size: Volume) -> MarketState {
        let token = TokenId::new("tok");
        let mut market = MarketState::new(
            token.clone(),
            TokenId::new("tok-other"),
            MarketId::new("cond"),
            dec!(0.01),
            chrono::Utc::now(),
            chrono::Utc::now() + chrono::Duration::days(1),
        );
        market.orderbook_mut().set_level(crate::core::domain::Side::Bid, bid, bid_size);
        market.orderbook_mut().set_level(crate::core::domain::Side::Ask, ask, ask_size);
        market
    }

    #[test]
    fn deep_book_improves_by_a_tick_each_side() {
        let engine = QuoteEngine::new(QuoteConfig::default());
        let market = market_with_book(dec!(0.48), dec!(100), dec!(0.52), dec!(100));
        let decision = engine.decide(&market, dec!(1.0));
        match decision {
            QuoteDecision::PlaceQuote(q) => {
                assert_eq!(q.bid_price(), dec!(0.49));
                assert_eq!(q.ask_price(), dec!(0.51));
            }
            other => panic!("expected PlaceQuote, got {other:?}"),
        }
    }

    #[test]
    fn thin_book_matches_reference_level_instead_of_improving() {
        let engine = QuoteEngine::new(QuoteConfig::default());
        // Size sits above min_reference_size (50) but below the 1.5x improve
        // threshold (75), so the engine should match rather than improve.
        let market = market_with_book(dec!(0.48), dec!(60), dec!(0.52), dec!(60));
        let decision = engine.decide(&market, dec!(1.0));
        match decision {
            QuoteDecision::PlaceQuote(q) => {
                assert_eq!(q.bid_price(), dec!(0.48));
                assert_eq!(q.ask_price(), dec!(0.52));
            }
            other => panic!("expected PlaceQuote, got {other:?}"),
        }
    }

    #[test]
    fn inconsistent_book_cancels_all() {
        let engine = QuoteEngine::new(QuoteConfig::default());
        let market = market_with_book(dec!(0.55), dec!(100), dec!(0.52), dec!(100));
        assert_eq!(engine.decide(&market, dec!(1.0)), QuoteDecision::CancelAll);
    }

    #[test]
    fn insufficient_reference_size_falls_back_to_top_of_book() {
        let engine = QuoteEngine::new(QuoteConfig::default());
        let market = market_with_book(dec!(0.48), dec!(1), dec!(0.52), dec!(1));
        let decision = engine.decide(&market, dec!(1.0));
        match decision {
            QuoteDecision::PlaceQuote(q) => {
                assert_eq!(q.bid_price(), dec!(0.48));
                assert_eq!(q.ask_price(), dec!(0.52));
            }
            other => panic!("expected PlaceQuote, got {other:?}"),
        }
    }

    #[test]
    fn empty_book_cancels_all() {
        let engine = QuoteEngine::new(QuoteConfig::default());
        let token = TokenId::new("tok");
        let market = MarketState::new(
            token,
            TokenId::new("tok-other"),
            MarketId::new("cond"),
            dec!(0.01),
            chrono::Utc::now(),
            chrono::Utc::now() + chrono::Duration::days(1),
        );
        assert_eq!(engine.decide(&market, dec!(1.0)), QuoteDecision::CancelAll);
    }

    #[test]
    fn ask_never_prices_below_average_entry() {
        let engine = QuoteEngine::new(QuoteConfig::default());
        let mut market = market_with_book(dec!(0.48), dec!(100), dec!(0.52), dec!(100));
        market.position_mut().apply_buy(dec!(200), dec!(0.55), dec!(0));
        let decision = engine.decide(&market, dec!(1.0));
        match decision {
            QuoteDecision::PlaceQuote(q) => assert_eq!(q.ask_price(), dec!(0.55)),
            other => panic!("expected PlaceQuote, got {other:?}"),
        }
    }

    #[test]
    fn two_sided_rebate_liquidity_quotes_full_trade_size_even_near_flat() {
        let engine = QuoteEngine::new(QuoteConfig::default());
        let market = market_with_book(dec!(0.48), dec!(100), dec!(0.52), dec!(100));
        let decision = engine.decide(&market, dec!(1.0));
        match decision {
            QuoteDecision::PlaceQuote(q) => {
                assert_eq!(q.ask_size(), dec!(100));
                assert_eq!(q.bid_size(), dec!(100));
            }
            other => panic!("expected PlaceQuote, got {other:?}"),
        }
    }

    #[test]
    fn position_at_max_suppresses_bid_only() {
        let engine = QuoteEngine::new(QuoteConfig::default());
        let mut market = market_with_book(dec!(0.48), dec!(100), dec!(0.52), dec!(100));
        market.position_mut().apply_buy(dec!(500), dec!(0.45), dec!(0));
        let decision = engine.decide(&market, dec!(1.0));
        match decision {
            QuoteDecision::PlaceQuote(q) => {
                assert!(!q.has_bid());
                assert!(q.has_ask());
            }
            other => panic!("expected PlaceQuote, got {other:?}"),
        }
    }

    #[test]
    fn quote_outside_rebate_band_is_skipped_one_sided() {
        let mut config = QuoteConfig::default();
        config.max_spread_pct = dec!(1);
        let engine = QuoteEngine::new(config);
        // mid ~0.50, half-width 0.005 -> an unimproved/deeply-skewed ask
        // far from mid should be dropped while the bid still quotes.
        let market = market_with_book(dec!(0.49), dec!(1), dec!(0.80), dec!(1));
        let decision = engine.decide(&market, dec!(1.0));
        match decision {
            QuoteDecision::PlaceQuote(q) => assert!(!q.has_ask()),
            QuoteDecision::CancelAll => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn position_limit_multiplier_shrinks_size() {
        let engine = QuoteEngine::new(QuoteConfig::default());
        let market = market_with_book(dec!(0.48), dec!(100), dec!(0.52), dec!(100));
        let QuoteDecision::PlaceQuote(quote) = engine.decide(&market, dec!(0.5)) else {
            panic!("expected PlaceQuote")
        };
        assert_eq!(quote.bid_size(), dec!(50));
    }

    #[test]
    fn zero_multiplier_cancels_all() {
        let engine = QuoteEngine::new(QuoteConfig::default());
        let market = market_with_book(dec!(0.48), dec!(100), dec!(0.52), dec!(100));
        assert_eq!(engine.decide(&market, dec!(0.0)), QuoteDecision::CancelAll);
    }

    #[test]
    fn momentum_cooldown_cancels_when_configured_to() {
        let engine = QuoteEngine::new(QuoteConfig::default());
        let mut market = market_with_book(dec!(0.48), dec!(100), dec!(0.52), dec!(100));
        market.trigger_momentum_cooldown(chrono::Utc::now() + chrono::Duration::seconds(30));
        assert_eq!(engine.decide(&market, dec!(1.0)), QuoteDecision::CancelAll);
    }

    #[test]
    fn momentum_cooldown_keeps_current_quote_when_not_configured_to_cancel() {
        let mut config = QuoteConfig::default();
        config.cancel_on_momentum = false;
        let engine = QuoteEngine::new(config);
        let mut market = market_with_book(dec!(0.48), dec!(100), dec!(0.52), dec!(100));
        market.trigger_momentum_cooldown(chrono::Utc::now() + chrono::Duration::seconds(30));
        assert_eq!(engine.decide(&market, dec!(1.0)), QuoteDecision::KeepCurrent);
    }
}
