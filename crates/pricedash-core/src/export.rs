// CSV export of every listing and competitor as flat rows.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::listing::OWN_SELLER_LABEL;
use crate::store::ListingStore;

/// One exported row. Column names match the export header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "Seller")]
    pub seller: String,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Shipping")]
    pub shipping: f64,
    #[serde(rename = "Total")]
    pub total: f64,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Flatten the store: for each listing in store order, the user's row
/// followed by one row per competitor in stored order.
pub fn export_rows(store: &ListingStore) -> Vec<ExportRow> {
    let mut rows = Vec::new();
    for listing in store.iter() {
        rows.push(ExportRow {
            sku: listing.sku.clone(),
            seller: OWN_SELLER_LABEL.to_string(),
            price: listing.my_price,
            shipping: listing.my_shipping,
            total: listing.my_total(),
        });
        rows.extend(listing.competitors.iter().map(|c| ExportRow {
            sku: listing.sku.clone(),
            seller: c.seller.clone(),
            price: c.price,
            shipping: c.shipping,
            total: c.total(),
        }));
    }
    rows
}

/// Write the export rows as CSV with a `SKU,Seller,Price,Shipping,Total`
/// header. Returns the number of data rows written.
pub fn write_csv<W: Write>(store: &ListingStore, wtr: W) -> Result<usize, ExportError> {
    let rows = export_rows(store);
    let mut writer = csv::Writer::from_writer(wtr);
    if rows.is_empty() {
        writer.write_record(["SKU", "Seller", "Price", "Shipping", "Total"])?;
    }
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(rows.len())
}

/// Write the export to `path`, replacing any existing file.
pub fn write_csv_path(store: &ListingStore, path: &Path) -> Result<usize, ExportError> {
    let file = std::fs::File::create(path).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let written = write_csv(store, file)?;
    info!("Exported {} rows to {}", written, path.display());
    Ok(written)
}
