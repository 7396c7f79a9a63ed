//! Money type aliases. `Decimal` throughout avoids the float-precision
//! issues that matter when summing fees and P&L over a trading session.

use rust_decimal::Decimal;

pub type Price = Decimal;
pub type Volume = Decimal;
