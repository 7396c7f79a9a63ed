//! Domain-level validation errors.

use thiserror::Error;

use super::ids::TokenId;
use super::money::{Price, Volume};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("size must be positive, got {size}")]
    NonPositiveSize { size: Volume },

    #[error("price {price} outside the tradable band (0.10, 0.90)")]
    PriceOutOfBand { price: Price },

    #[error("order book for {token_id} is transiently inconsistent (best bid ≥ best ask)")]
    BookInconsistent { token_id: TokenId },

    #[error("quote would cross: bid {bid} >= ask {ask}")]
    QuoteCrosses { bid: Price, ask: Price },

    #[error("unknown token {token_id}")]
    UnknownToken { token_id: TokenId },
}
