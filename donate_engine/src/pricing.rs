//! The checkout pricing arithmetic.
//!
//! All figures are whole rubles and every intermediate stays non-negative. The order of operations is fixed:
//! the trade-in surcharge credit comes off the base price first, then the coupon percentage applies to that
//! subtotal.

use dpg_common::Rubles;
use serde::Serialize;

/// The full price breakdown for a single-product order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    /// The product's list price.
    pub base: Rubles,
    /// The portion of the trade-in credit actually applied. Never exceeds `base`.
    pub applied_surcharge: Rubles,
    /// `base - applied_surcharge`.
    pub subtotal: Rubles,
    /// The coupon discount, floored to whole rubles.
    pub coupon_discount: Rubles,
    /// The amount the buyer is asked to pay. Never negative.
    pub payable: Rubles,
}

impl PriceBreakdown {
    /// Total discount against the list price.
    pub fn total_discount(&self) -> Rubles {
        self.base - self.payable
    }
}

/// Compute the price breakdown for `base`, applying an optional trade-in `credit` and an optional coupon
/// `percent` discount.
///
/// The credit is clamped to `[0, base]` before it is applied. The percentage is clamped to `[0, 100]` and the
/// resulting discount is floored, so a 10% coupon on a 905₽ subtotal discounts 90₽, not 90.5₽.
pub fn price_order(base: Rubles, credit: Option<Rubles>, percent: Option<i64>) -> PriceBreakdown {
    let credit = credit.unwrap_or_default().floor_at_zero();
    let applied_surcharge = credit.min(base);
    let subtotal = (base - applied_surcharge).floor_at_zero();
    let percent = percent.unwrap_or(0).clamp(0, 100);
    let coupon_discount = Rubles::new(subtotal.value() * percent / 100);
    let payable = (subtotal - coupon_discount).floor_at_zero();
    PriceBreakdown { base, applied_surcharge, subtotal, coupon_discount, payable }
}
