//! Settled price resolution.

use bigdecimal::BigDecimal;

/// Resolves the settled price of a transaction.
///
/// A negotiated unit price wins over the listed one. With neither, the price
/// is zero until the parties negotiate one.
pub fn resolve(
    negotiated_price: Option<&BigDecimal>,
    listed_price: Option<&BigDecimal>,
    quantity: i32,
) -> BigDecimal {
    match negotiated_price.or(listed_price) {
        Some(unit_price) => unit_price * BigDecimal::from(quantity),
        None => BigDecimal::from(0),
    }
}
