// Plain-text rendering of dashboard state for the terminal session.

use std::fmt::Write;

use pricedash_core::analyzer::{ChartBar, ListingReport, PriceStanding};
use pricedash_core::import::ImportSummary;
use pricedash_core::listing::Listing;
use pricedash_core::money::format_amount;
use pricedash_core::session::Session;

/// Width of the longest bar in the total-price chart.
const CHART_WIDTH: usize = 30;

pub const HELP: &str = "\
Commands:
  show [json]                              dashboard (optionally as JSON)
  search [term]                            filter SKUs (no term clears)
  filter on|off                            only show overpriced listings
  add <sku> <price> <shipping>             add/replace a product; then enter
                                           sellers, prices and shipping costs,
                                           one per line, each list ending with '.'
  comp add <sku> <price> <shipping> <seller...>
  comp rm <sku> <index>                    delete a competitor (undoable)
  edit <sku>                               retype the competitor table as
                                           seller,price,shipping lines ending with '.'
  undo                                     restore the last deleted competitor
  undo drop                                forget the last deleted competitor
  delete <sku>                             remove a whole listing
  import <path>                            merge a research CSV
  export [path]                            write all listings as CSV
  help | quit";

/// Render every visible listing, preceded by a one-line header.
pub fn dashboard(session: &Session) -> String {
    let reports = session.dashboard();
    let mut out = String::new();

    let mut header = format!("Product Dashboard ({} of {} listings", reports.len(), session.store().len());
    if !session.search_term().is_empty() {
        let _ = write!(header, ", search '{}'", session.search_term());
    }
    if session.overpriced_only() {
        header.push_str(", overpriced only");
    }
    header.push(')');
    out.push_str(&header);
    out.push('\n');

    for report in &reports {
        if let Some(listing) = session.store().get(&report.sku) {
            out.push('\n');
            out.push_str(&listing_block(listing, report));
        }
    }

    let pending = session.store().undo_len();
    if pending > 0 {
        let _ = writeln!(out, "\n{pending} deleted competitor(s) can be restored with `undo`.");
    }
    out
}

/// One listing: own total, competitor stats and table, chart and verdict.
pub fn listing_block(listing: &Listing, report: &ListingReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== SKU: {} ==", report.sku);
    let _ = writeln!(
        out,
        "Your Total Price: {} (Price: {}, Shipping: {})",
        format_amount(report.my_total),
        format_amount(report.my_price),
        format_amount(report.my_shipping)
    );

    let Some(stats) = report.stats else {
        let _ = writeln!(out, "No competitor data added yet.");
        return out;
    };

    let _ = writeln!(out, "Competitor Stats:");
    let _ = writeln!(out, "  Average: {}", format_amount(stats.average));
    let _ = writeln!(out, "  Lowest:  {}", format_amount(stats.min));
    let _ = writeln!(out, "  Highest: {}", format_amount(stats.max));

    let _ = writeln!(out, "Competitors:");
    for (i, c) in listing.competitors.iter().enumerate() {
        let _ = writeln!(
            out,
            "  [{i}] {:<24} {:>10} + {:>8} = {:>10}",
            c.seller,
            format_amount(c.price),
            format_amount(c.shipping),
            format_amount(c.total())
        );
    }

    out.push_str(&chart(&report.chart));
    let _ = writeln!(out, "{}", standing_message(report.standing));
    if let Some(delta) = report.suggested_reduction {
        let _ = writeln!(
            out,
            "Suggestion: Lower price by {} to be most competitive.",
            format_amount(delta)
        );
    }
    out
}

/// Text bar chart of totals, cheapest first. The user's bar is marked `*`.
pub fn chart(bars: &[ChartBar]) -> String {
    let max = bars.iter().map(|b| b.total).fold(0.0_f64, f64::max);
    let mut out = String::from("Total Price Comparison:\n");
    for bar in bars {
        let len = if max > 0.0 {
            ((bar.total / max) * CHART_WIDTH as f64).round() as usize
        } else {
            0
        };
        let glyph = if bar.is_you { "*" } else { "#" };
        let _ = writeln!(
            out,
            "  {:<24} {:>10} {}",
            bar.seller,
            format_amount(bar.total),
            glyph.repeat(len)
        );
    }
    out
}

pub fn standing_message(standing: PriceStanding) -> &'static str {
    match standing {
        PriceStanding::Lowest => "You are the lowest priced!",
        PriceStanding::Highest => "You are the highest priced!",
        PriceStanding::MidRange => "You are mid-range in pricing.",
        PriceStanding::NoData => "No competitor data added yet.",
    }
}

pub fn import_summary(summary: &ImportSummary) -> String {
    let mut out = format!(
        "CSV imported: {} created, {} updated, {} competitors appended",
        summary.created, summary.updated, summary.competitors_appended
    );
    if !summary.failures.is_empty() {
        let _ = write!(out, "\n{} row(s) skipped:", summary.failures.len());
        for f in &summary.failures {
            // Data rows start on line 2, after the header.
            let _ = write!(out, "\n  line {}: {}", f.row + 2, f.reason);
        }
    }
    out
}
