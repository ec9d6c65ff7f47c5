// Listing and competitor offer records.

use serde::{Deserialize, Serialize};

/// Seller label used for the user's own row in exports and charts.
pub const OWN_SELLER_LABEL: &str = "You";

/// A competing seller's offer for the same product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorOffer {
    /// Seller identity. Not required to be unique within a listing.
    pub seller: String,
    /// Listed price.
    pub price: f64,
    /// Shipping cost charged to the buyer.
    pub shipping: f64,
}

impl CompetitorOffer {
    pub fn new(seller: impl Into<String>, price: f64, shipping: f64) -> Self {
        CompetitorOffer {
            seller: seller.into(),
            price,
            shipping,
        }
    }

    /// Price plus shipping.
    pub fn total(&self) -> f64 {
        self.price + self.shipping
    }
}

/// One tracked product: the user's own price and the competitors seen for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub sku: String,
    pub my_price: f64,
    pub my_shipping: f64,
    /// Display order is insertion order.
    pub competitors: Vec<CompetitorOffer>,
}

impl Listing {
    pub fn new(sku: impl Into<String>, my_price: f64, my_shipping: f64) -> Self {
        Listing {
            sku: sku.into(),
            my_price,
            my_shipping,
            competitors: Vec::new(),
        }
    }

    /// Builder-style helper to attach competitors.
    pub fn with_competitors(mut self, competitors: Vec<CompetitorOffer>) -> Self {
        self.competitors = competitors;
        self
    }

    /// The user's price plus shipping.
    pub fn my_total(&self) -> f64 {
        self.my_price + self.my_shipping
    }
}
