// Pricing analyzer: competitor statistics, competitive standing and the
// price-reduction suggestion for a single listing.
//
// Every function here is pure and works on a borrowed `Listing`, so callers
// can run them against any snapshot of the store.

use serde::Serialize;

use crate::listing::{Listing, OWN_SELLER_LABEL};

/// Ratio over the cheapest competitor total above which a listing counts as
/// overpriced.
pub const DEFAULT_OVERPRICED_RATIO: f64 = 1.1;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Aggregate statistics over competitor totals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

/// Where the user's total sits relative to the competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceStanding {
    /// Strictly below every competitor.
    Lowest,
    /// Strictly above every competitor.
    Highest,
    /// Anywhere in between, including ties with the cheapest or dearest.
    MidRange,
    /// No competitors recorded.
    NoData,
}

impl PriceStanding {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            PriceStanding::Lowest => "LOWEST",
            PriceStanding::Highest => "HIGHEST",
            PriceStanding::MidRange => "MID-RANGE",
            PriceStanding::NoData => "NO DATA",
        }
    }
}

/// One bar of the total-price comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    pub seller: String,
    pub total: f64,
    pub is_you: bool,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

pub fn my_total(listing: &Listing) -> f64 {
    listing.my_total()
}

/// Competitor totals in competitor order.
pub fn competitor_totals(listing: &Listing) -> Vec<f64> {
    listing.competitors.iter().map(|c| c.total()).collect()
}

/// Min, max and mean of the competitor totals, or `None` without competitors.
pub fn stats(listing: &Listing) -> Option<Stats> {
    let totals = competitor_totals(listing);
    if totals.is_empty() {
        return None;
    }
    let min = totals.iter().copied().fold(f64::INFINITY, f64::min);
    let max = totals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let average = totals.iter().sum::<f64>() / totals.len() as f64;
    Some(Stats { min, max, average })
}

/// True when the user's total exceeds the cheapest competitor total times
/// `threshold_ratio`. Always false without competitors.
pub fn is_overpriced(listing: &Listing, threshold_ratio: f64) -> bool {
    match stats(listing) {
        Some(s) => my_total(listing) > s.min * threshold_ratio,
        None => false,
    }
}

/// Classify the user's total against the competitor range. Ties with the
/// minimum or maximum are `MidRange`.
pub fn classify(listing: &Listing) -> PriceStanding {
    let Some(s) = stats(listing) else {
        return PriceStanding::NoData;
    };
    let mine = my_total(listing);
    if mine < s.min {
        PriceStanding::Lowest
    } else if mine > s.max {
        PriceStanding::Highest
    } else {
        PriceStanding::MidRange
    }
}

/// How much to lower the total by to match the cheapest competitor.
///
/// This is a reduction amount ("lower by $X"), not a new target price. `None`
/// unless the listing is overpriced at `threshold_ratio`.
pub fn suggest_price(listing: &Listing, threshold_ratio: f64) -> Option<f64> {
    if !is_overpriced(listing, threshold_ratio) {
        return None;
    }
    stats(listing).map(|s| my_total(listing) - s.min)
}

/// Chart data: every competitor plus the user, one bar per distinct
/// (seller, total) pair, cheapest first. Earlier entries win on duplicates
/// and equal totals keep their relative order.
pub fn chart_series(listing: &Listing) -> Vec<ChartBar> {
    let candidates = listing
        .competitors
        .iter()
        .map(|c| ChartBar {
            seller: c.seller.clone(),
            total: c.total(),
            is_you: false,
        })
        .chain(std::iter::once(ChartBar {
            seller: OWN_SELLER_LABEL.to_string(),
            total: listing.my_total(),
            is_you: true,
        }));

    let mut bars: Vec<ChartBar> = Vec::new();
    for bar in candidates {
        if bars
            .iter()
            .any(|b| b.seller == bar.seller && b.total == bar.total)
        {
            continue;
        }
        bars.push(bar);
    }

    bars.sort_by(|a, b| a.total.total_cmp(&b.total));
    bars
}

// ---------------------------------------------------------------------------
// Listing report
// ---------------------------------------------------------------------------

/// Everything the dashboard shows for one listing, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingReport {
    pub sku: String,
    pub my_price: f64,
    pub my_shipping: f64,
    pub my_total: f64,
    pub competitor_count: usize,
    pub stats: Option<Stats>,
    pub standing: PriceStanding,
    pub overpriced: bool,
    /// Amount to lower the total by; present only when overpriced.
    pub suggested_reduction: Option<f64>,
    pub chart: Vec<ChartBar>,
}

impl ListingReport {
    pub fn build(listing: &Listing, threshold_ratio: f64) -> Self {
        ListingReport {
            sku: listing.sku.clone(),
            my_price: listing.my_price,
            my_shipping: listing.my_shipping,
            my_total: my_total(listing),
            competitor_count: listing.competitors.len(),
            stats: stats(listing),
            standing: classify(listing),
            overpriced: is_overpriced(listing, threshold_ratio),
            suggested_reduction: suggest_price(listing, threshold_ratio),
            chart: chart_series(listing),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
