// A user session: one listing store plus the dashboard's view state.
//
// Each front-end action maps to one call here followed by a fresh
// `dashboard()` read; nothing is recomputed in the background.

use std::io::{Read, Write};
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::analyzer::{self, ListingReport};
use crate::config::Config;
use crate::export::{self, ExportError};
use crate::form::{FormError, ProductForm};
use crate::import::{self, ImportError, ImportSummary};
use crate::store::{ListingStore, StoreError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns the listing store for one user session.
#[derive(Debug, Clone)]
pub struct Session {
    store: ListingStore,
    overpriced_ratio: f64,
    search: String,
    overpriced_only: bool,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Session {
            store: ListingStore::with_undo_capacity(config.undo.capacity),
            overpriced_ratio: config.pricing.overpriced_ratio,
            search: String::new(),
            overpriced_only: false,
        }
    }

    pub fn store(&self) -> &ListingStore {
        &self.store
    }

    /// Mutable access for competitor-level edits (add, remove, table edits,
    /// undo).
    pub fn store_mut(&mut self) -> &mut ListingStore {
        &mut self.store
    }

    pub fn overpriced_ratio(&self) -> f64 {
        self.overpriced_ratio
    }

    // -- View state --

    /// Set the SKU search term. Empty clears the search.
    pub fn set_search(&mut self, term: &str) {
        self.search = term.trim().to_string();
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    pub fn set_overpriced_only(&mut self, on: bool) {
        self.overpriced_only = on;
    }

    pub fn overpriced_only(&self) -> bool {
        self.overpriced_only
    }

    // -- Actions --

    /// Submit the add-product form. Replaces any listing with the same SKU.
    /// Returns the number of competitors that were parsed from the form.
    pub fn add_product(&mut self, form: &ProductForm) -> Result<usize, SessionError> {
        let sku = form.sku()?;
        let competitors = form.competitors();
        let count = competitors.len();
        self.store
            .upsert_listing(sku, form.my_price, form.my_shipping, competitors)?;
        info!("Added {} with {} competitors", sku, count);
        Ok(count)
    }

    pub fn import_csv<R: Read>(&mut self, rdr: R) -> Result<ImportSummary, ImportError> {
        import::import_csv(&mut self.store, rdr)
    }

    pub fn import_csv_path(&mut self, path: &Path) -> Result<ImportSummary, ImportError> {
        import::import_csv_path(&mut self.store, path)
    }

    pub fn export_csv<W: Write>(&self, wtr: W) -> Result<usize, ExportError> {
        export::write_csv(&self.store, wtr)
    }

    pub fn export_csv_path(&self, path: &Path) -> Result<usize, ExportError> {
        export::write_csv_path(&self.store, path)
    }

    // -- Read side --

    /// Reports for every listing passing the search and overpriced filters,
    /// in store order.
    pub fn dashboard(&self) -> Vec<ListingReport> {
        self.store
            .search(&self.search)
            .filter(|l| !self.overpriced_only || analyzer::is_overpriced(l, self.overpriced_ratio))
            .map(|l| ListingReport::build(l, self.overpriced_ratio))
            .collect()
    }

    /// Report for a single SKU regardless of filters.
    pub fn report(&self, sku: &str) -> Option<ListingReport> {
        self.store
            .get(sku)
            .map(|l| ListingReport::build(l, self.overpriced_ratio))
    }
}
