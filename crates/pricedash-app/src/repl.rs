// Interactive command loop.
//
// Reads one command per line, applies it to the session and prints the
// result. A failed command prints `error: ...` and the loop carries on; only
// I/O failures on the terminal itself end the session early.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use tracing::{debug, info, warn};

use pricedash_core::session::Session;

use crate::protocol::{parse_command, parse_table, UserCommand, BLOCK_END};
use crate::render;

/// What the loop should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

pub struct Repl<R, W> {
    input: R,
    out: W,
    session: Session,
    default_export: PathBuf,
    prompt: bool,
}

impl<R: BufRead, W: Write> Repl<R, W> {
    pub fn new(input: R, out: W, session: Session, default_export: PathBuf) -> Self {
        Repl {
            input,
            out,
            session,
            default_export,
            prompt: true,
        }
    }

    /// Disable the `> ` prompt (for piped input and tests).
    pub fn without_prompt(mut self) -> Self {
        self.prompt = false;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Consume the loop and hand back the session and output sink.
    pub fn into_parts(self) -> (Session, W) {
        (self.session, self.out)
    }

    /// Run until `quit` or end of input.
    pub fn run(&mut self) -> anyhow::Result<()> {
        writeln!(self.out, "pricedash: type `help` for commands.")?;
        loop {
            if self.prompt {
                write!(self.out, "> ")?;
                self.out.flush()?;
            }
            let Some(line) = self.read_line()? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let outcome = match self.complete(&line) {
                Ok(cmd) => self.execute(cmd),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(Outcome::Continue(text)) => {
                    if !text.is_empty() {
                        writeln!(self.out, "{text}")?;
                    }
                }
                Ok(Outcome::Quit) => break,
                Err(e) => {
                    warn!("Command '{}' failed: {:#}", line.trim(), e);
                    writeln!(self.out, "error: {e:#}")?;
                }
            }
        }
        info!("Session ended with {} listings", self.session.store().len());
        Ok(())
    }

    /// Apply one fully formed command to the session.
    pub fn execute(&mut self, cmd: UserCommand) -> anyhow::Result<Outcome> {
        debug!("Executing {:?}", cmd);
        let text = match cmd {
            UserCommand::Show { json: false } => render::dashboard(&self.session),
            UserCommand::Show { json: true } => {
                serde_json::to_string_pretty(&self.session.dashboard())
                    .context("failed to serialize dashboard")?
            }
            UserCommand::Search(term) => {
                self.session.set_search(&term);
                render::dashboard(&self.session)
            }
            UserCommand::Filter(on) => {
                self.session.set_overpriced_only(on);
                render::dashboard(&self.session)
            }
            UserCommand::Add(form) => {
                let count = self.session.add_product(&form)?;
                format!("Added {} with {} competitors", form.sku.trim(), count)
            }
            UserCommand::CompAdd { sku, offer } => {
                let seller = offer.seller.clone();
                self.session.store_mut().add_competitor(&sku, offer)?;
                format!("Added competitor '{seller}' to {sku}")
            }
            UserCommand::CompRemove { sku, index } => {
                let removed = self.session.store_mut().remove_competitor_at(&sku, index)?;
                format!(
                    "Deleted competitor '{}' from {sku} (`undo` restores it)",
                    removed.seller
                )
            }
            UserCommand::Edit { sku, rows } => {
                let kept = rows.len();
                let deleted = self.session.store_mut().replace_competitors(&sku, rows)?;
                format!("Updated {sku}: {kept} competitors, {deleted} deleted")
            }
            UserCommand::Undo => match self.session.store_mut().undo_last_delete()? {
                Some((sku, offer)) => format!("Restored '{}' to {sku}", offer.seller),
                None => "Nothing to undo".to_string(),
            },
            UserCommand::UndoDrop => match self.session.store_mut().discard_last_delete() {
                Some((sku, offer)) => format!("Forgot deleted '{}' from {sku}", offer.seller),
                None => "Nothing to undo".to_string(),
            },
            UserCommand::Delete { sku } => {
                self.session.store_mut().remove_listing(&sku)?;
                format!("Deleted listing {sku}")
            }
            UserCommand::Import { path } => {
                let summary = self
                    .session
                    .import_csv_path(&path)
                    .with_context(|| format!("import of {} failed", path.display()))?;
                render::import_summary(&summary)
            }
            UserCommand::Export { path } => {
                let path = path.unwrap_or_else(|| self.default_export.clone());
                let rows = self
                    .session
                    .export_csv_path(&path)
                    .with_context(|| format!("export to {} failed", path.display()))?;
                format!("Exported {rows} rows to {}", path.display())
            }
            UserCommand::Help => render::HELP.to_string(),
            UserCommand::Quit => return Ok(Outcome::Quit),
        };
        Ok(Outcome::Continue(text))
    }

    /// Parse a command line and read any block input it needs.
    fn complete(&mut self, line: &str) -> anyhow::Result<UserCommand> {
        let cmd = parse_command(line)?;
        Ok(match cmd {
            UserCommand::Add(mut form) => {
                form.sellers = self.read_block("Competitor sellers")?;
                form.prices = self.read_block("Competitor prices")?;
                form.shipping = self.read_block("Competitor shipping")?;
                UserCommand::Add(form)
            }
            UserCommand::Edit { sku, .. } => {
                let block = self.read_block("Competitor table (seller,price,shipping)")?;
                UserCommand::Edit {
                    sku,
                    rows: parse_table(&block)?,
                }
            }
            other => other,
        })
    }

    fn read_line(&mut self) -> anyhow::Result<Option<String>> {
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .context("failed to read input")?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Lines up to a lone `.` (or end of input), joined with newlines.
    fn read_block(&mut self, title: &str) -> anyhow::Result<String> {
        if self.prompt {
            writeln!(self.out, "{title}, one per line, end with '{BLOCK_END}':")?;
        }
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            if line.trim() == BLOCK_END {
                break;
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricedash_core::config::Config;

    fn run_script(script: &str) -> (Session, String) {
        let mut repl = Repl::new(
            script.as_bytes(),
            Vec::new(),
            Session::new(&Config::default()),
            std::env::temp_dir().join("pricedash_repl_default_export.csv"),
        )
        .without_prompt();
        repl.run().unwrap();
        let (session, out) = repl.into_parts();
        (session, String::from_utf8(out).unwrap())
    }

    #[test]
    fn add_form_reads_three_blocks() {
        let (session, out) = run_script(
            "add SKU-1 10 2\nA\nB\n.\n9\n15\n.\n1\n0\n.\nshow\n",
        );
        let l = session.store().get("SKU-1").unwrap();
        assert_eq!(l.competitors.len(), 2);
        assert!(out.contains("Added SKU-1 with 2 competitors"));
        assert!(out.contains("You are mid-range in pricing."));
        assert!(out.contains("Suggestion: Lower price by $2.00"));
    }

    #[test]
    fn errors_do_not_end_the_session() {
        let (session, out) = run_script("comp rm NOPE 0\nbogus\nadd X 1 1\n.\n.\n.\nquit\nadd Y 1 1\n");
        assert!(out.contains("error: unknown SKU 'NOPE'"));
        assert!(out.contains("error: unknown command 'bogus'"));
        assert!(session.store().contains("X"));
        // Nothing after `quit` runs.
        assert!(!session.store().contains("Y"));
    }

    #[test]
    fn delete_edit_and_undo_round_trip() {
        let script = "\
add S 10 0
A
B
C
.
5
6
7
.
0
0
0
.
comp rm S 0
edit S
B,6,0
D,1,0
.
undo
undo
undo
";
        let (session, out) = run_script(script);
        assert!(out.contains("Deleted competitor 'A' from S"));
        assert!(out.contains("Updated S: 2 competitors, 1 deleted"));
        assert!(out.contains("Restored 'C' to S"));
        assert!(out.contains("Restored 'A' to S"));
        assert!(out.contains("Nothing to undo"));

        let sellers: Vec<_> = session
            .store()
            .get("S")
            .unwrap()
            .competitors
            .iter()
            .map(|c| c.seller.clone())
            .collect();
        assert_eq!(sellers, vec!["B", "D", "C", "A"]);
    }

    #[test]
    fn undo_after_listing_deleted_reports_not_found() {
        let script = "add S 1 0\nA\n.\n1\n.\n0\n.\ncomp rm S 0\ndelete S\nundo\nundo drop\nundo\n";
        let (session, out) = run_script(script);
        assert!(out.contains("error: unknown SKU 'S'"));
        assert!(out.contains("Forgot deleted 'A' from S"));
        assert!(out.ends_with("Nothing to undo\n"));
        assert!(!session.store().contains("S"));
    }

    #[test]
    fn bad_table_row_leaves_listing_unchanged() {
        let script = "add S 1 0\nA\n.\n1\n.\n0\n.\nedit S\nB,oops,0\n.\n";
        let (session, out) = run_script(script);
        assert!(out.contains("error: table row 1"));
        assert_eq!(session.store().get("S").unwrap().competitors[0].seller, "A");
        assert_eq!(session.store().undo_len(), 0);
    }

    #[test]
    fn show_json_serializes_reports() {
        let (_, out) = run_script("add S 10 2\nA\nB\n.\n9\n15\n.\n1\n0\n.\nshow json\n");
        let start = out.find('[').unwrap();
        let json: serde_json::Value = serde_json::from_str(out[start..].trim()).unwrap();
        assert_eq!(json[0]["sku"], "S");
        assert_eq!(json[0]["standing"], "MID_RANGE");
        assert_eq!(json[0]["overpriced"], true);
    }

    #[test]
    fn search_and_filter_shape_the_dashboard() {
        let script = "\
add ABC 10 2
A
.
9
.
1
.
add xyz 5 1
A
.
9
.
1
.
search abc
filter on
search
";
        let (session, out) = run_script(script);
        assert!(out.contains("Product Dashboard (1 of 2 listings, search 'abc')"));
        assert!(out.contains("Product Dashboard (1 of 2 listings, search 'abc', overpriced only)"));
        assert!(out.contains("Product Dashboard (1 of 2 listings, overpriced only)"));
        assert!(session.overpriced_only());
    }
}
