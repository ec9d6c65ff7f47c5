// Listing store: the SKU-keyed collection of listings plus the undo log of
// recently deleted competitor offers.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::{debug, info};

use crate::listing::{CompetitorOffer, Listing};

/// Default number of deleted competitor offers kept for undo.
pub const DEFAULT_UNDO_CAPACITY: usize = 50;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("validation error for `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("unknown SKU '{0}'")]
    NotFound(String),

    #[error("competitor index {index} out of range for SKU '{sku}' ({len} competitors)")]
    Index {
        sku: String,
        index: usize,
        len: usize,
    },
}

// ---------------------------------------------------------------------------
// ListingStore
// ---------------------------------------------------------------------------

/// A deleted competitor offer and the SKU it was removed from.
pub type DeletedOffer = (String, CompetitorOffer);

/// Owns every listing for one session. Listings iterate in the order their
/// SKU was first inserted; re-adding a SKU replaces it in place.
#[derive(Debug, Clone)]
pub struct ListingStore {
    listings: Vec<Listing>,
    /// Most recent deletion last.
    undo_buffer: VecDeque<DeletedOffer>,
    undo_capacity: usize,
}

impl Default for ListingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingStore {
    /// Create an empty store with the default undo capacity.
    pub fn new() -> Self {
        Self::with_undo_capacity(DEFAULT_UNDO_CAPACITY)
    }

    /// Create an empty store keeping at most `capacity` undo entries
    /// (at least one).
    pub fn with_undo_capacity(capacity: usize) -> Self {
        ListingStore {
            listings: Vec::new(),
            undo_buffer: VecDeque::new(),
            undo_capacity: capacity.max(1),
        }
    }

    // -- Read side --

    pub fn get(&self, sku: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.sku == sku)
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.get(sku).is_some()
    }

    /// All listings in store order.
    pub fn iter(&self) -> impl Iterator<Item = &Listing> {
        self.listings.iter()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Number of pending undo entries.
    pub fn undo_len(&self) -> usize {
        self.undo_buffer.len()
    }

    /// The entry `undo_last_delete` would restore next.
    pub fn peek_undo(&self) -> Option<&DeletedOffer> {
        self.undo_buffer.back()
    }

    /// Listings whose SKU contains `term`, ignoring case. An empty or
    /// whitespace-only term matches everything.
    pub fn search<'a>(&'a self, term: &str) -> impl Iterator<Item = &'a Listing> + 'a {
        let needle = term.trim().to_lowercase();
        self.listings
            .iter()
            .filter(move |l| needle.is_empty() || l.sku.to_lowercase().contains(&needle))
    }

    // -- Mutations --

    /// Create a listing or fully replace an existing one. No merge: the prior
    /// competitor list is discarded.
    pub fn upsert_listing(
        &mut self,
        sku: &str,
        my_price: f64,
        my_shipping: f64,
        competitors: Vec<CompetitorOffer>,
    ) -> Result<(), StoreError> {
        check_name("sku", sku)?;
        check_amount("my_price", my_price)?;
        check_amount("my_shipping", my_shipping)?;
        check_offers(&competitors)?;

        let listing = Listing {
            sku: sku.to_string(),
            my_price,
            my_shipping,
            competitors,
        };

        match self.position(sku) {
            Some(idx) => {
                info!("Replaced listing '{}' ({} competitors)", sku, listing.competitors.len());
                self.listings[idx] = listing;
            }
            None => {
                info!("Created listing '{}' ({} competitors)", sku, listing.competitors.len());
                self.listings.push(listing);
            }
        }
        Ok(())
    }

    /// Append a competitor offer to an existing listing.
    pub fn add_competitor(&mut self, sku: &str, offer: CompetitorOffer) -> Result<(), StoreError> {
        let idx = self.require(sku)?;
        check_offer(&offer)?;
        debug!("Added competitor '{}' to '{}'", offer.seller, sku);
        self.listings[idx].competitors.push(offer);
        Ok(())
    }

    /// Remove the competitor at `index` and remember it for undo.
    pub fn remove_competitor_at(
        &mut self,
        sku: &str,
        index: usize,
    ) -> Result<CompetitorOffer, StoreError> {
        let idx = self.require(sku)?;
        let competitors = &mut self.listings[idx].competitors;
        if index >= competitors.len() {
            return Err(StoreError::Index {
                sku: sku.to_string(),
                index,
                len: competitors.len(),
            });
        }
        let removed = competitors.remove(index);
        info!("Removed competitor '{}' from '{}'", removed.seller, sku);
        self.push_undo(sku.to_string(), removed.clone());
        Ok(removed)
    }

    /// Replace a listing's competitors with an edited list.
    ///
    /// Every old offer with no remaining match in `new_list` (matched one to
    /// one on seller, price and shipping) is recorded as a deletion, in old
    /// list order. The new list is then stored as given, so reorders, edits
    /// and duplicates are all accepted. Returns the number of deletions.
    pub fn replace_competitors(
        &mut self,
        sku: &str,
        new_list: Vec<CompetitorOffer>,
    ) -> Result<usize, StoreError> {
        let idx = self.require(sku)?;
        check_offers(&new_list)?;

        let mut matched = vec![false; new_list.len()];
        let mut deleted = Vec::new();
        for old in &self.listings[idx].competitors {
            let hit = new_list
                .iter()
                .enumerate()
                .position(|(i, candidate)| !matched[i] && candidate == old);
            match hit {
                Some(i) => matched[i] = true,
                None => deleted.push(old.clone()),
            }
        }

        let deletions = deleted.len();
        for offer in deleted {
            self.push_undo(sku.to_string(), offer);
        }
        self.listings[idx].competitors = new_list;

        if deletions > 0 {
            info!("Edited competitors of '{}': {} deleted", sku, deletions);
        } else {
            debug!("Edited competitors of '{}'", sku);
        }
        Ok(deletions)
    }

    /// Restore the most recently deleted competitor offer by appending it to
    /// its listing.
    ///
    /// Returns `Ok(None)` when there is nothing to undo. If the listing was
    /// removed after the deletion, fails with `NotFound` and leaves the undo
    /// entry in place; the SKU is never recreated.
    pub fn undo_last_delete(&mut self) -> Result<Option<DeletedOffer>, StoreError> {
        let idx = match self.undo_buffer.back() {
            None => return Ok(None),
            Some((sku, _)) => self
                .position(sku)
                .ok_or_else(|| StoreError::NotFound(sku.clone()))?,
        };
        let Some((sku, offer)) = self.undo_buffer.pop_back() else {
            return Ok(None);
        };
        self.listings[idx].competitors.push(offer.clone());
        info!("Restored competitor '{}' to '{}'", offer.seller, sku);
        Ok(Some((sku, offer)))
    }

    /// Drop the most recent undo entry without restoring it.
    pub fn discard_last_delete(&mut self) -> Option<DeletedOffer> {
        let dropped = self.undo_buffer.pop_back();
        if let Some((sku, offer)) = &dropped {
            debug!("Discarded undo entry '{}' for '{}'", offer.seller, sku);
        }
        dropped
    }

    /// Delete a whole listing. Pending undo entries for it are kept.
    pub fn remove_listing(&mut self, sku: &str) -> Result<Listing, StoreError> {
        let idx = self.require(sku)?;
        info!("Removed listing '{}'", sku);
        Ok(self.listings.remove(idx))
    }

    // -- Internals --

    fn position(&self, sku: &str) -> Option<usize> {
        self.listings.iter().position(|l| l.sku == sku)
    }

    fn require(&self, sku: &str) -> Result<usize, StoreError> {
        self.position(sku)
            .ok_or_else(|| StoreError::NotFound(sku.to_string()))
    }

    fn push_undo(&mut self, sku: String, offer: CompetitorOffer) {
        if self.undo_buffer.len() == self.undo_capacity {
            self.undo_buffer.pop_front();
        }
        self.undo_buffer.push_back((sku, offer));
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn check_amount(field: &str, value: f64) -> Result<(), StoreError> {
    if !value.is_finite() {
        return Err(StoreError::Validation {
            field: field.into(),
            message: format!("must be a finite amount, got {value}"),
        });
    }
    if value < 0.0 {
        return Err(StoreError::Validation {
            field: field.into(),
            message: format!("must be >= 0, got {value}"),
        });
    }
    Ok(())
}

/// SKUs and seller names must be non-blank and carry no surrounding
/// whitespace; CSV import trims both, so anything else would not survive an
/// export and re-import.
fn check_name(field: &str, value: &str) -> Result<(), StoreError> {
    let message = if value.trim().is_empty() {
        "must not be empty"
    } else if value.trim() != value {
        "must not have leading or trailing whitespace"
    } else {
        return Ok(());
    };
    Err(StoreError::Validation {
        field: field.into(),
        message: message.into(),
    })
}

fn check_offer(offer: &CompetitorOffer) -> Result<(), StoreError> {
    check_name("seller", &offer.seller)?;
    check_amount("price", offer.price)?;
    check_amount("shipping", offer.shipping)
}

fn check_offers(offers: &[CompetitorOffer]) -> Result<(), StoreError> {
    for (i, offer) in offers.iter().enumerate() {
        check_offer(offer).map_err(|e| match e {
            StoreError::Validation { field, message } => StoreError::Validation {
                field: format!("competitors[{i}].{field}"),
                message,
            },
            other => other,
        })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
