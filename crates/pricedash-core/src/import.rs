// CSV import of competitor research sheets.
//
// Two header layouts are accepted: the research layout exported from the
// pricing spreadsheet (`SKU, Seller's Name, Listed Price, BUYER Shipping
// Cost`) and this tool's own export layout (`SKU, Seller, Price, Shipping,
// Total`). Missing columns are fatal; bad cells only fail their row.

use std::io::Read;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::listing::{CompetitorOffer, OWN_SELLER_LABEL};
use crate::money::parse_amount;
use crate::store::ListingStore;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One data row as read from the sheet, before any parsing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    /// Blank on continuation rows; inherited from the row above.
    pub sku: Option<String>,
    /// Blank marks the user's own listing.
    pub seller: Option<String>,
    pub price: String,
    pub shipping: String,
}

impl RawRow {
    pub fn new(sku: Option<&str>, seller: Option<&str>, price: &str, shipping: &str) -> Self {
        RawRow {
            sku: sku.map(str::to_string),
            seller: seller.map(str::to_string),
            price: price.to_string(),
            shipping: shipping.to_string(),
        }
    }
}

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    /// Zero-based index of the data row (header excluded).
    pub row: usize,
    pub reason: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    /// SKUs that did not exist before the import.
    pub created: usize,
    /// Existing SKUs that received at least one new competitor.
    pub updated: usize,
    pub competitors_appended: usize,
    pub failures: Vec<RowFailure>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("missing required column `{0}`")]
    MissingColumn(String),

    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// ---------------------------------------------------------------------------
// Header layouts
// ---------------------------------------------------------------------------

const COL_SKU: &str = "SKU";
const COL_RESEARCH_SELLER: &str = "Seller's Name";
const COL_RESEARCH_PRICE: &str = "Listed Price";
const COL_RESEARCH_SHIPPING: &str = "BUYER Shipping Cost";
const COL_EXPORT_SELLER: &str = "Seller";
const COL_EXPORT_PRICE: &str = "Price";
const COL_EXPORT_SHIPPING: &str = "Shipping";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Research,
    Export,
}

/// Column positions resolved from the header row.
#[derive(Debug)]
struct Columns {
    layout: Layout,
    sku: usize,
    seller: usize,
    price: usize,
    shipping: usize,
}

impl Columns {
    fn resolve(headers: &[String]) -> Result<Self, ImportError> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |name: &str| find(name).ok_or_else(|| ImportError::MissingColumn(name.into()));

        let sku = require(COL_SKU)?;
        let (layout, seller) = match (find(COL_RESEARCH_SELLER), find(COL_EXPORT_SELLER)) {
            (Some(i), _) => (Layout::Research, i),
            (None, Some(i)) => (Layout::Export, i),
            (None, None) => return Err(ImportError::MissingColumn(COL_RESEARCH_SELLER.into())),
        };
        let (price, shipping) = match layout {
            Layout::Research => (require(COL_RESEARCH_PRICE)?, require(COL_RESEARCH_SHIPPING)?),
            Layout::Export => (require(COL_EXPORT_PRICE)?, require(COL_EXPORT_SHIPPING)?),
        };

        Ok(Columns {
            layout,
            sku,
            seller,
            price,
            shipping,
        })
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read every data row of a CSV sheet.
///
/// Fails only on structural problems (unreadable header, missing required
/// column, I/O). Short rows yield blank cells and fail later, per row.
pub fn read_csv<R: Read>(rdr: R) -> Result<Vec<RawRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .trim()
                .to_string()
        })
        .collect();
    let cols = Columns::resolve(&headers)?;
    debug!("CSV header resolved as {:?}", cols);

    let mut rows = Vec::new();
    let mut record = csv::ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        let cell = |idx: usize| -> String {
            record
                .get(idx)
                .map(|b| String::from_utf8_lossy(b).trim().to_string())
                .unwrap_or_default()
        };
        let non_blank = |s: String| if s.is_empty() { None } else { Some(s) };

        let mut seller = non_blank(cell(cols.seller));
        if cols.layout == Layout::Export && seller.as_deref() == Some(OWN_SELLER_LABEL) {
            seller = None;
        }

        rows.push(RawRow {
            sku: non_blank(cell(cols.sku)),
            seller,
            price: cell(cols.price),
            shipping: cell(cols.shipping),
        });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Importing
// ---------------------------------------------------------------------------

/// Merge raw rows into the store.
///
/// Blank SKUs inherit the SKU of the nearest row above. Rows are grouped by
/// SKU in first-seen order. For a SKU new to the store, the row with a blank
/// seller supplies the user's own price and shipping; for a known SKU that
/// row is ignored. Every other row is appended as a competitor in row order.
/// Bad rows are reported in the summary and never abort the import.
pub fn import_rows(store: &mut ListingStore, rows: &[RawRow]) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for (sku, group) in group_by_sku(rows, &mut summary.failures) {
        let exists = store.contains(&sku);
        let first_row = group[0].0;
        let mut own: Option<(f64, f64)> = None;
        let mut offers = Vec::new();

        for (idx, row) in group {
            let seller = row
                .seller
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty());

            match seller {
                None if exists => {
                    debug!("row {}: keeping existing own price for '{}'", idx, sku);
                }
                None => match parse_amounts(row) {
                    Ok(pair) if own.is_none() => own = Some(pair),
                    Ok(_) => summary.failures.push(RowFailure {
                        row: idx,
                        reason: format!("duplicate own-listing row for SKU '{sku}'"),
                    }),
                    Err(reason) => summary.failures.push(RowFailure { row: idx, reason }),
                },
                Some(name) => match parse_amounts(row) {
                    Ok((price, shipping)) => {
                        offers.push(CompetitorOffer::new(name, price, shipping));
                    }
                    Err(reason) => summary.failures.push(RowFailure { row: idx, reason }),
                },
            }
        }

        let appended = offers.len();
        if exists {
            let mut added = 0;
            for offer in offers {
                match store.add_competitor(&sku, offer) {
                    Ok(()) => added += 1,
                    Err(e) => summary.failures.push(RowFailure {
                        row: first_row,
                        reason: e.to_string(),
                    }),
                }
            }
            // Known SKUs only count as updated when something was appended.
            if added > 0 {
                summary.updated += 1;
                summary.competitors_appended += added;
            }
        } else if let Some((price, shipping)) = own {
            match store.upsert_listing(&sku, price, shipping, offers) {
                Ok(()) => {
                    summary.created += 1;
                    summary.competitors_appended += appended;
                }
                Err(e) => summary.failures.push(RowFailure {
                    row: first_row,
                    reason: e.to_string(),
                }),
            }
        } else {
            summary.failures.push(RowFailure {
                row: first_row,
                reason: format!("no own-listing row (blank seller) for new SKU '{sku}'"),
            });
        }
    }

    info!(
        "Import finished: {} created, {} updated, {} competitors appended, {} failures",
        summary.created,
        summary.updated,
        summary.competitors_appended,
        summary.failures.len()
    );
    for f in &summary.failures {
        warn!("import row {}: {}", f.row, f.reason);
    }
    summary
}

/// Read a CSV sheet and merge it into the store. The store is untouched when
/// this returns an error.
pub fn import_csv<R: Read>(store: &mut ListingStore, rdr: R) -> Result<ImportSummary, ImportError> {
    let rows = read_csv(rdr)?;
    Ok(import_rows(store, &rows))
}

/// Path-based wrapper around `import_csv`.
pub fn import_csv_path(store: &mut ListingStore, path: &Path) -> Result<ImportSummary, ImportError> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    info!("Importing {}", path.display());
    import_csv(store, file)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Forward-fill SKUs and group row indices by SKU in first-seen order.
fn group_by_sku<'a>(
    rows: &'a [RawRow],
    failures: &mut Vec<RowFailure>,
) -> Vec<(String, Vec<(usize, &'a RawRow)>)> {
    let mut groups: Vec<(String, Vec<(usize, &RawRow)>)> = Vec::new();
    let mut current: Option<String> = None;

    for (idx, row) in rows.iter().enumerate() {
        if let Some(sku) = row.sku.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            current = Some(sku.to_string());
        }
        let Some(sku) = current.as_ref() else {
            failures.push(RowFailure {
                row: idx,
                reason: "blank SKU with no preceding SKU to inherit".into(),
            });
            continue;
        };
        match groups.iter_mut().find(|(key, _)| key == sku) {
            Some((_, members)) => members.push((idx, row)),
            None => groups.push((sku.clone(), vec![(idx, row)])),
        }
    }
    groups
}

fn parse_amounts(row: &RawRow) -> Result<(f64, f64), String> {
    let price = parse_amount(&row.price).map_err(|e| format!("price: {e}"))?;
    let shipping = parse_amount(&row.shipping).map_err(|e| format!("shipping: {e}"))?;
    Ok((price, shipping))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sku: Option<&str>, seller: Option<&str>, price: &str, shipping: &str) -> RawRow {
        RawRow::new(sku, seller, price, shipping)
    }

    #[test]
    fn own_row_and_competitor_create_listing() {
        let mut store = ListingStore::new();
        let rows = vec![
            row(Some("SKU-2"), None, "$20.00", "$3.00"),
            row(Some("SKU-2"), Some("X"), "$18", "$0"),
        ];
        let summary = import_rows(&mut store, &rows);

        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.competitors_appended, 1);
        assert!(summary.failures.is_empty());

        let l = store.get("SKU-2").unwrap();
        assert_eq!(l.my_price, 20.0);
        assert_eq!(l.my_shipping, 3.0);
        assert_eq!(l.competitors, vec![CompetitorOffer::new("X", 18.0, 0.0)]);
    }

    #[test]
    fn blank_skus_are_forward_filled() {
        let mut store = ListingStore::new();
        let rows = vec![
            row(Some("A"), None, "10", "1"),
            row(None, Some("s1"), "9", "1"),
            row(Some("  "), Some("s2"), "8", "1"),
            row(Some("B"), None, "5", "0"),
            row(None, Some("s3"), "4", "0"),
        ];
        let summary = import_rows(&mut store, &rows);
        assert_eq!(summary.created, 2);
        assert_eq!(store.get("A").unwrap().competitors.len(), 2);
        assert_eq!(store.get("B").unwrap().competitors[0].seller, "s3");
    }

    #[test]
    fn leading_blank_sku_is_row_failure() {
        let mut store = ListingStore::new();
        let rows = vec![
            row(None, Some("orphan"), "1", "1"),
            row(Some("A"), None, "10", "1"),
        ];
        let summary = import_rows(&mut store, &rows);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].row, 0);
        assert_eq!(summary.created, 1);
    }

    #[test]
    fn groups_keep_first_seen_order_across_interleaving() {
        let mut store = ListingStore::new();
        let rows = vec![
            row(Some("B"), None, "1", "0"),
            row(Some("A"), None, "1", "0"),
            row(Some("B"), Some("late"), "2", "0"),
        ];
        import_rows(&mut store, &rows);
        let skus: Vec<_> = store.iter().map(|l| l.sku.as_str()).collect();
        assert_eq!(skus, vec!["B", "A"]);
        assert_eq!(store.get("B").unwrap().competitors[0].seller, "late");
    }

    #[test]
    fn existing_sku_keeps_own_price_and_appends() {
        let mut store = ListingStore::new();
        store
            .upsert_listing("A", 7.0, 1.0, vec![CompetitorOffer::new("old", 6.0, 0.0)])
            .unwrap();
        let rows = vec![
            row(Some("A"), None, "99", "99"),
            row(None, Some("old"), "6", "0"),
            row(None, Some("new"), "5", "0"),
        ];
        let summary = import_rows(&mut store, &rows);
        assert_eq!(summary.created, 0);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.competitors_appended, 2);

        let l = store.get("A").unwrap();
        assert_eq!((l.my_price, l.my_shipping), (7.0, 1.0));
        // No dedup at import time.
        let sellers: Vec<_> = l.competitors.iter().map(|c| c.seller.as_str()).collect();
        assert_eq!(sellers, vec!["old", "old", "new"]);
    }

    #[test]
    fn existing_sku_with_nothing_appended_is_not_updated() {
        let mut store = ListingStore::new();
        store.upsert_listing("A", 7.0, 1.0, vec![]).unwrap();
        store.upsert_listing("B", 3.0, 0.0, vec![]).unwrap();
        let rows = vec![
            row(Some("A"), None, "99", "99"),
            row(Some("B"), Some("late"), "oops", "0"),
        ];
        let summary = import_rows(&mut store, &rows);
        assert_eq!(summary.created, 0);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.competitors_appended, 0);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].row, 1);
    }

    #[test]
    fn bad_money_fails_only_that_row() {
        let mut store = ListingStore::new();
        let rows = vec![
            row(Some("A"), None, "$1,234.56", "$0"),
            row(None, Some("good"), "$1,000", "5"),
            row(None, Some("bad"), "call us", "5"),
            row(None, Some("neg"), "5", "-1"),
        ];
        let summary = import_rows(&mut store, &rows);
        assert_eq!(summary.competitors_appended, 1);
        let failed: Vec<_> = summary.failures.iter().map(|f| f.row).collect();
        assert_eq!(failed, vec![2, 3]);
        assert!(summary.failures[0].reason.starts_with("price:"));
        assert!(summary.failures[1].reason.starts_with("shipping:"));
        assert_eq!(store.get("A").unwrap().my_price, 1234.56);
    }

    #[test]
    fn new_sku_without_own_row_is_skipped() {
        let mut store = ListingStore::new();
        let rows = vec![
            row(Some("A"), Some("s1"), "1", "0"),
            row(None, Some("s2"), "2", "0"),
        ];
        let summary = import_rows(&mut store, &rows);
        assert_eq!(summary.created, 0);
        assert_eq!(summary.competitors_appended, 0);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].row, 0);
        assert!(!store.contains("A"));
    }

    #[test]
    fn duplicate_own_row_uses_first() {
        let mut store = ListingStore::new();
        let rows = vec![
            row(Some("A"), None, "1", "0"),
            row(Some("A"), None, "2", "0"),
        ];
        let summary = import_rows(&mut store, &rows);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].row, 1);
        assert_eq!(store.get("A").unwrap().my_price, 1.0);
    }

    #[test]
    fn own_row_with_bad_money_then_valid_own_row() {
        let mut store = ListingStore::new();
        let rows = vec![
            row(Some("A"), None, "n/a", "0"),
            row(Some("A"), None, "3", "0"),
        ];
        let summary = import_rows(&mut store, &rows);
        assert_eq!(summary.created, 1);
        assert_eq!(store.get("A").unwrap().my_price, 3.0);
        assert_eq!(summary.failures.len(), 1);
    }

    // -- CSV reading --

    #[test]
    fn reads_research_layout_with_extra_columns() {
        let csv_data = "\
SKU,Item Title,Seller's Name,Listed Price,BUYER Shipping Cost,Notes
SKU-2,Widget,,$20.00,$3.00,mine
,Widget,X,$18,$0,
";
        let rows = read_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![
                row(Some("SKU-2"), None, "$20.00", "$3.00"),
                row(None, Some("X"), "$18", "$0"),
            ]
        );
    }

    #[test]
    fn quoted_thousands_separators_survive() {
        let csv_data = "\
SKU,Seller's Name,Listed Price,BUYER Shipping Cost
P1,,\"$1,234.56\",$0
";
        let mut store = ListingStore::new();
        let summary = import_csv(&mut store, csv_data.as_bytes()).unwrap();
        assert!(summary.failures.is_empty());
        assert_eq!(store.get("P1").unwrap().my_price, 1234.56);
    }

    #[test]
    fn missing_column_is_fatal_and_leaves_store_untouched() {
        let mut store = ListingStore::new();
        store.upsert_listing("KEEP", 1.0, 1.0, vec![]).unwrap();

        let csv_data = "\
SKU,Seller's Name,Listed Price
A,,1
";
        let err = import_csv(&mut store, csv_data.as_bytes()).unwrap_err();
        assert!(
            matches!(err, ImportError::MissingColumn(ref c) if c == "BUYER Shipping Cost"),
            "got {err:?}"
        );
        assert_eq!(store.len(), 1);

        let err = read_csv("Seller's Name,Listed Price\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(ref c) if c == "SKU"));

        let err = read_csv("".as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(_)));
    }

    #[test]
    fn short_rows_fail_per_row() {
        let csv_data = "\
SKU,Seller's Name,Listed Price,BUYER Shipping Cost
A,,5,1
,short
,ok,4,0
";
        let mut store = ListingStore::new();
        let summary = import_csv(&mut store, csv_data.as_bytes()).unwrap();
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].row, 1);
        assert_eq!(store.get("A").unwrap().competitors.len(), 1);
    }

    #[test]
    fn export_layout_treats_you_as_own_row() {
        let csv_data = "\
SKU,Seller,Price,Shipping,Total
SKU-1,You,10.0,2.0,12.0
SKU-1,A,9.0,1.0,10.0
";
        let rows = read_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(rows[0].seller, None);
        assert_eq!(rows[1].seller.as_deref(), Some("A"));
    }

    #[test]
    fn research_layout_keeps_literal_you_seller() {
        let csv_data = "\
SKU,Seller's Name,Listed Price,BUYER Shipping Cost
A,,5,1
,You,4,0
";
        let rows = read_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(rows[1].seller.as_deref(), Some("You"));
    }

    #[test]
    fn header_names_are_trimmed_and_bom_stripped() {
        let csv_data = "\u{feff}SKU , Seller's Name ,Listed Price,BUYER Shipping Cost\nA,,1,1\n";
        let rows = read_csv(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut store = ListingStore::new();
        let err = import_csv_path(&mut store, Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }
}
