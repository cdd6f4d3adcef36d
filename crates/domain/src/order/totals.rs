//! Recomputation of an order's financial totals.

use super::{Offer, Order};

/// Processing fee charged on the buyer total: `bps` basis points plus a
/// fixed amount per charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub transaction_fee_bps: i64,
    pub transaction_fee_fixed_cents: i64,
}

impl FeeSchedule {
    pub fn transaction_fee_cents(&self, buyer_total_cents: i64) -> i64 {
        if buyer_total_cents <= 0 {
            return 0;
        }
        (buyer_total_cents * self.transaction_fee_bps + 5_000) / 10_000
            + self.transaction_fee_fixed_cents
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            transaction_fee_bps: 290,
            transaction_fee_fixed_cents: 30,
        }
    }
}

fn commission(amount_cents: i64, rate: f64) -> i64 {
    (amount_cents as f64 * rate).round() as i64
}

/// Overwrites every derived total on `order`.
///
/// Running it twice with the same inputs yields the same order. Offer-mode
/// orders take their item, shipping and tax amounts from `offer`; buy-mode
/// orders price from their line items and keep the shipping and tax already
/// quoted.
pub fn recompute_totals(
    order: &mut Order,
    commission_rate: f64,
    offer: Option<&Offer>,
    fees: &FeeSchedule,
) {
    for item in &mut order.line_items {
        item.commission_fee_cents = commission(item.total_list_price_cents(), commission_rate);
    }

    order.total_list_price_cents = order
        .line_items
        .iter()
        .map(|item| item.total_list_price_cents())
        .sum();

    match offer {
        Some(offer) => {
            order.items_total_cents = offer.amount_cents;
            order.shipping_total_cents = offer.shipping_total_cents;
            order.tax_total_cents = offer.tax_total_cents;
        }
        None => order.items_total_cents = order.total_list_price_cents,
    }

    order.commission_fee_cents = commission(order.items_total_cents, commission_rate);
    order.buyer_total_cents =
        order.items_total_cents + order.shipping_total_cents + order.tax_total_cents;
    order.transaction_fee_cents = fees.transaction_fee_cents(order.buyer_total_cents);
    order.seller_total_cents =
        order.buyer_total_cents - order.commission_fee_cents - order.transaction_fee_cents;
}
