//! # Pricing
//!
//! Effective unit price of a product after its percentage discount.
//!
//! ```text
//! base_price ₱500.00, discount 15%
//!      │
//!      ▼
//! savings     = round_half_up(50000 × 15 / 100) = 7500  (₱75.00)
//! final_price = 50000 − 7500                    = 42500 (₱425.00)
//! ```
//!
//! Every cart line and every order line is priced through here, so the
//! checkout payload and the re-derived totals agree to the centavo.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Product;

/// Highest discount a product can carry.
pub const MAX_DISCOUNT_PERCENTAGE: u8 = 100;

/// Price breakdown shown on product cards and cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceInfo {
    pub original_price: Money,
    pub discount_percentage: u8,
    pub final_price: Money,
    /// Per-unit savings.
    pub savings: Money,
}

impl PriceInfo {
    #[inline]
    pub fn has_discount(&self) -> bool {
        !self.savings.is_zero()
    }
}

/// Prices one unit of `product`.
pub fn calculate_price_info(product: &Product) -> PriceInfo {
    price_info(product.base_price, product.discount_percentage)
}

/// Prices one unit at `base_price` with `discount_percentage` off.
///
/// Discounts above 100% are treated as 100% so the final price never goes
/// negative.
///
/// ```rust
/// use pharmaline_core::money::Money;
/// use pharmaline_core::pricing::price_info;
///
/// let info = price_info(Money::from_centavos(50_000), 15);
/// assert_eq!(info.savings.centavos(), 7_500);
/// assert_eq!(info.final_price.centavos(), 42_500);
/// ```
pub fn price_info(base_price: Money, discount_percentage: u8) -> PriceInfo {
    let discount_percentage = discount_percentage.min(MAX_DISCOUNT_PERCENTAGE);
    let savings = base_price.percentage(discount_percentage);

    PriceInfo {
        original_price: base_price,
        discount_percentage,
        final_price: base_price - savings,
        savings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peso(p: i64) -> Money {
        Money::from_pesos(p, 0)
    }

    #[test]
    fn test_fifteen_percent_off_500() {
        let product = Product::new("p1", "VITC-1000", "Vitamin C 1000mg", peso(500))
            .with_discount(15);
        let info = calculate_price_info(&product);

        assert_eq!(info.original_price, peso(500));
        assert_eq!(info.discount_percentage, 15);
        assert_eq!(info.savings, peso(75));
        assert_eq!(info.final_price, peso(425));
        assert!(info.has_discount());
    }

    #[test]
    fn test_no_discount() {
        let info = price_info(Money::from_centavos(12_345), 0);
        assert_eq!(info.final_price, Money::from_centavos(12_345));
        assert!(info.savings.is_zero());
        assert!(!info.has_discount());
    }

    #[test]
    fn test_full_discount_is_free() {
        let info = price_info(peso(80), 100);
        assert!(info.final_price.is_zero());
        assert_eq!(info.savings, peso(80));
    }

    #[test]
    fn test_discount_above_100_is_clamped() {
        let info = price_info(peso(80), 150);
        assert_eq!(info.discount_percentage, 100);
        assert!(info.final_price.is_zero());
    }

    #[test]
    fn test_savings_round_half_up() {
        // ₱12.35 × 10% = 123.5 centavos → 124
        let info = price_info(Money::from_centavos(1235), 10);
        assert_eq!(info.savings.centavos(), 124);
        assert_eq!(info.final_price.centavos(), 1111);
    }

    #[test]
    fn test_final_never_negative() {
        for pct in [0u8, 1, 33, 50, 99, 100, 101, 255] {
            let info = price_info(Money::from_centavos(999), pct);
            assert!(!info.final_price.is_negative());
            assert_eq!(info.final_price + info.savings, info.original_price);
        }
    }
}
