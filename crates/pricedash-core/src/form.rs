// Add-product form: the user's own price plus three newline-delimited lists
// of competitor sellers, prices and shipping costs.

use thiserror::Error;
use tracing::debug;

use crate::listing::CompetitorOffer;
use crate::money::parse_amount;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("SKU must not be empty")]
    MissingSku,
}

/// Raw contents of the add-product form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductForm {
    pub sku: String,
    pub my_price: f64,
    pub my_shipping: f64,
    /// One seller per line.
    pub sellers: String,
    /// One price per line, same position as `sellers`.
    pub prices: String,
    /// One shipping cost per line, same position as `sellers`.
    pub shipping: String,
}

impl ProductForm {
    /// Zip the three competitor lists line by line.
    ///
    /// Lines beyond the shortest list are dropped, and a line with a blank
    /// seller or a price or shipping that does not parse is skipped.
    pub fn competitors(&self) -> Vec<CompetitorOffer> {
        let sellers = self.sellers.trim().lines();
        let prices = self.prices.trim().lines();
        let shipping = self.shipping.trim().lines();

        sellers
            .zip(prices)
            .zip(shipping)
            .filter_map(|((seller, price), ship)| {
                let seller = seller.trim();
                if seller.is_empty() {
                    debug!("skipping competitor line with blank seller");
                    return None;
                }
                match (parse_amount(price), parse_amount(ship)) {
                    (Ok(p), Ok(s)) => Some(CompetitorOffer::new(seller, p, s)),
                    (p, s) => {
                        debug!("skipping competitor line '{}': {:?} / {:?}", seller, p, s);
                        None
                    }
                }
            })
            .collect()
    }

    /// The trimmed SKU, or an error if the form was submitted without one.
    pub fn sku(&self) -> Result<&str, FormError> {
        let sku = self.sku.trim();
        if sku.is_empty() {
            Err(FormError::MissingSku)
        } else {
            Ok(sku)
        }
    }
}
