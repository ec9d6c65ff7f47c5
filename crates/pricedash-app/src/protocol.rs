// User commands accepted by the interactive session.
//
// One line in, one command out. Commands that need more input (the add-product
// form and the competitor table editor) are completed by the session loop,
// which reads `.`-terminated blocks after the command line.

use std::path::PathBuf;

use pricedash_core::form::ProductForm;
use pricedash_core::listing::CompetitorOffer;
use pricedash_core::money::{parse_amount, MoneyError};
use thiserror::Error;

/// Line that terminates a multi-line block.
pub const BLOCK_END: &str = ".";

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Render the dashboard, or dump it as JSON.
    Show { json: bool },
    /// Set (or clear, when empty) the SKU search term.
    Search(String),
    /// Toggle the overpriced-only filter.
    Filter(bool),
    /// Add-product form. Competitor lists are read as three blocks.
    Add(ProductForm),
    CompAdd { sku: String, offer: CompetitorOffer },
    CompRemove { sku: String, index: usize },
    /// Replace a listing's competitor table. Rows are read as one block.
    Edit {
        sku: String,
        rows: Vec<CompetitorOffer>,
    },
    Undo,
    UndoDrop,
    Delete { sku: String },
    Import { path: PathBuf },
    Export { path: Option<PathBuf> },
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}' (try `help`)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid {field}: {source}")]
    Amount { field: &'static str, source: MoneyError },

    #[error("invalid competitor index '{0}'")]
    Index(String),

    #[error("table row {line}: {message}")]
    TableRow { line: usize, message: String },
}

const USAGE_ADD: &str = "add <sku> <price> <shipping>";
const USAGE_COMP_ADD: &str = "comp add <sku> <price> <shipping> <seller...>";
const USAGE_COMP_RM: &str = "comp rm <sku> <index>";
const USAGE_EDIT: &str = "edit <sku>";
const USAGE_DELETE: &str = "delete <sku>";
const USAGE_IMPORT: &str = "import <path>";
const USAGE_FILTER: &str = "filter on|off";

/// Parse one command line. Blank lines are not commands; callers skip them.
pub fn parse_command(line: &str) -> Result<UserCommand, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Unknown(String::new()));
    };
    let args: Vec<&str> = words.collect();

    match (head.to_lowercase().as_str(), args.as_slice()) {
        ("show" | "ls", []) => Ok(UserCommand::Show { json: false }),
        ("show" | "ls", ["json"]) => Ok(UserCommand::Show { json: true }),
        ("search", _) => Ok(UserCommand::Search(rest_of_line(line).to_string())),
        ("filter", [flag]) => match flag.to_lowercase().as_str() {
            "on" | "true" | "1" => Ok(UserCommand::Filter(true)),
            "off" | "false" | "0" => Ok(UserCommand::Filter(false)),
            _ => Err(CommandError::Usage(USAGE_FILTER)),
        },
        ("filter", _) => Err(CommandError::Usage(USAGE_FILTER)),
        ("add", [sku, price, shipping]) => Ok(UserCommand::Add(ProductForm {
            sku: sku.to_string(),
            my_price: amount("price", price)?,
            my_shipping: amount("shipping", shipping)?,
            ..ProductForm::default()
        })),
        ("add", _) => Err(CommandError::Usage(USAGE_ADD)),
        ("comp", ["add", sku, price, shipping, seller @ ..]) if !seller.is_empty() => {
            Ok(UserCommand::CompAdd {
                sku: sku.to_string(),
                offer: CompetitorOffer::new(
                    seller.join(" "),
                    amount("price", price)?,
                    amount("shipping", shipping)?,
                ),
            })
        }
        ("comp", ["add", ..]) => Err(CommandError::Usage(USAGE_COMP_ADD)),
        ("comp", ["rm", sku, index]) => Ok(UserCommand::CompRemove {
            sku: sku.to_string(),
            index: index
                .parse()
                .map_err(|_| CommandError::Index(index.to_string()))?,
        }),
        ("comp", _) => Err(CommandError::Usage(USAGE_COMP_RM)),
        ("edit", [sku]) => Ok(UserCommand::Edit {
            sku: sku.to_string(),
            rows: Vec::new(),
        }),
        ("edit", _) => Err(CommandError::Usage(USAGE_EDIT)),
        ("undo", []) => Ok(UserCommand::Undo),
        ("undo", ["drop"]) => Ok(UserCommand::UndoDrop),
        ("delete", [sku]) => Ok(UserCommand::Delete {
            sku: sku.to_string(),
        }),
        ("delete", _) => Err(CommandError::Usage(USAGE_DELETE)),
        ("import", [_, ..]) => Ok(UserCommand::Import {
            path: PathBuf::from(rest_of_line(line)),
        }),
        ("import", []) => Err(CommandError::Usage(USAGE_IMPORT)),
        ("export", []) => Ok(UserCommand::Export { path: None }),
        ("export", _) => Ok(UserCommand::Export {
            path: Some(PathBuf::from(rest_of_line(line))),
        }),
        ("help" | "?", _) => Ok(UserCommand::Help),
        ("quit" | "exit" | "q", _) => Ok(UserCommand::Quit),
        _ => Err(CommandError::Unknown(head.to_string())),
    }
}

/// Parse the competitor table block of `edit`: one `seller,price,shipping`
/// row per line, CSV-quoted where a field contains a comma. Blank lines are
/// ignored. Any bad row rejects the whole table.
pub fn parse_table(block: &str) -> Result<Vec<CompetitorOffer>, CommandError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(block.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| CommandError::TableRow {
            line: e.position().map(|p| p.line() as usize).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        if record.iter().all(str::is_empty) {
            continue;
        }
        let [seller, price, shipping] = [0, 1, 2].map(|i| record.get(i).unwrap_or(""));
        if record.len() != 3 || seller.is_empty() {
            return Err(CommandError::TableRow {
                line,
                message: "expected `seller,price,shipping`".into(),
            });
        }
        let parse = |raw: &str| {
            parse_amount(raw).map_err(|e| CommandError::TableRow {
                line,
                message: e.to_string(),
            })
        };
        rows.push(CompetitorOffer::new(seller, parse(price)?, parse(shipping)?));
    }
    Ok(rows)
}

/// Everything after the command word, with inner whitespace kept as typed.
fn rest_of_line(line: &str) -> &str {
    let line = line.trim();
    match line.find(char::is_whitespace) {
        Some(end) => line[end..].trim(),
        None => "",
    }
}

fn amount(field: &'static str, raw: &str) -> Result<f64, CommandError> {
    parse_amount(raw).map_err(|source| CommandError::Amount { field, source })
}
