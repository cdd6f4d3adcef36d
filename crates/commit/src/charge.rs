//! Description and metadata sent with every charge.

use common::OrderId;
use domain::Order;
use serde::{Deserialize, Serialize};

/// Maximum number of slug characters kept from the partner name.
const DESCRIPTION_NAME_LENGTH: usize = 12;

/// Lowercase slug of `name`. Non-ASCII text is transliterated first, then
/// every run of characters outside `[a-z0-9_]` becomes a single `-`, with
/// none leading or trailing.
pub fn parameterize(name: &str) -> String {
    let ascii = deunicode::deunicode(name);
    let mut slug = String::with_capacity(ascii.len());
    let mut separator = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if separator && !slug.is_empty() {
                slug.push('-');
            }
            separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            separator = true;
        }
    }

    slug
}

/// Statement descriptor for a charge, e.g. `GAGOSIAN-GAL via Artsy`.
pub fn charge_description(partner_name: Option<&str>, suffix: &str) -> String {
    let name: String = parameterize(partner_name.unwrap_or_default())
        .chars()
        .take(DESCRIPTION_NAME_LENGTH)
        .collect();
    format!("{}{}", name.to_uppercase(), suffix)
}

/// Metadata attached to the charge so it can be traced back to the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeMetadata {
    pub exchange_order_id: OrderId,
    pub buyer_id: String,
    pub buyer_type: String,
    pub seller_id: String,
    pub seller_type: String,
    #[serde(rename = "type")]
    pub charge_type: String,
}

impl ChargeMetadata {
    pub fn for_order(order: &Order) -> Self {
        let charge_type = if order.is_auction_seller() {
            "auction-bn"
        } else {
            "bn-mo"
        };

        Self {
            exchange_order_id: order.id,
            buyer_id: order.buyer_id.clone(),
            buyer_type: order.buyer_type.clone(),
            seller_id: order.seller_id.clone(),
            seller_type: order.seller_type.clone(),
            charge_type: charge_type.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DEFAULT_CHARGE_DESCRIPTION_SUFFIX;
    use domain::AUCTION_SELLER_TYPE;

    #[test]
    fn test_parameterize() {
        assert_eq!(parameterize("Gagosian Gallery"), "gagosian-gallery");
        assert_eq!(parameterize("  David Zwirner!! & Co. "), "david-zwirner-co");
        assert_eq!(parameterize("Pace_NYC"), "pace_nyc");
        assert_eq!(parameterize("Hauser--Wirth"), "hauser-wirth");
        assert_eq!(parameterize(""), "");
    }

    #[test]
    fn test_parameterize_transliterates() {
        assert_eq!(parameterize("Galerie Müller"), "galerie-muller");
        assert_eq!(parameterize("Galería Élan"), "galeria-elan");
        assert_eq!(parameterize("Straße"), "strasse");
        assert_eq!(
            charge_description(Some("Galerie Müller"), DEFAULT_CHARGE_DESCRIPTION_SUFFIX),
            "GALERIE-MULL via Artsy"
        );
    }

    #[test]
    fn test_description_truncates_and_upcases() {
        assert_eq!(
            charge_description(Some("Gagosian Gallery"), DEFAULT_CHARGE_DESCRIPTION_SUFFIX),
            "GAGOSIAN-GAL via Artsy"
        );
        assert_eq!(charge_description(Some("Pace"), " via Artsy"), "PACE via Artsy");
    }

    #[test]
    fn test_description_without_name() {
        assert_eq!(charge_description(None, " via Artsy"), " via Artsy");
    }

    #[test]
    fn test_metadata_type_tag() {
        let mut order = Order::new("user-1", "user", "partner-1", "gallery", "USD");
        let metadata = ChargeMetadata::for_order(&order);
        assert_eq!(metadata.charge_type, "bn-mo");
        assert_eq!(metadata.exchange_order_id, order.id);

        order.seller_type = AUCTION_SELLER_TYPE.to_string();
        let json = serde_json::to_value(ChargeMetadata::for_order(&order)).unwrap();
        assert_eq!(json["type"], "auction-bn");
        assert_eq!(json["seller_id"], "partner-1");
    }
}
