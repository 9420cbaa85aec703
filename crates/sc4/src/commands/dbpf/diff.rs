use std::{collections::HashSet, fmt::Display, path::PathBuf};

use clap::{Args, ValueEnum};
use itertools::Itertools;
use miette::Result;
use owo_colors::OwoColorize;
use sc4_dbpf::{DbpfFile, Entry, Tgi};
use similar::{ChangeTag, TextDiff};

use super::open;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Mode {
    /// Only name the entries that differ
    #[default]
    Semantic,
    /// Also show a line diff of changed exemplars and text
    Full,
}

#[derive(Debug, Eq, PartialEq)]
enum Change {
    Added(Tgi, &'static str),
    Removed(Tgi, &'static str),
    Comparison(String, String, String),
    Context(Vec<String>),
    Modified(Tgi, &'static str, Vec<Change>),
}

impl Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Added(tgi, label) => writeln!(f, "✅ {} {}", tgi.green(), label.dimmed()),
            Change::Removed(tgi, label) => writeln!(f, "❌ {} {}", tgi.red(), label.dimmed()),
            Change::Comparison(key, old, new) => {
                writeln!(f, "* {}: {} vs {}", key, old.red(), new.green())
            }
            Change::Context(lines) => {
                writeln!(f, "{}", lines.iter().map(|l| format!(" {l}")).join(""))
            }
            Change::Modified(tgi, label, related) => {
                writeln!(f, "🔃 {} {}", tgi.blue(), label.dimmed())?;
                let details = related.iter().map(|c| c.to_string()).join("");
                writeln!(
                    f,
                    "{}",
                    details
                        .split('\n')
                        .filter(|l| !l.trim().is_empty())
                        .map(|l| format!("  {l}"))
                        .join("\n")
                )
            }
        }
    }
}

#[derive(Args)]
pub struct DiffArgs {
    /// An input DBPF file
    #[arg(short, long, value_name = "FILE")]
    left: PathBuf,

    /// An input DBPF file
    #[arg(short, long, value_name = "FILE")]
    right: PathBuf,

    /// Comparison mode
    #[arg(short, long, value_enum, default_value_t = Mode::Semantic)]
    mode: Mode,
}

/// Render a decoded entry as lines of text, if it has a textual form
fn as_text(entry: &Entry) -> Option<String> {
    if let Some(exemplar) = entry.exemplar() {
        return Some(exemplar.to_text());
    }
    entry.text().map(|t| t.text.replace("\r\n", "\n"))
}

impl DiffArgs {
    fn line_diff(&self, old: &str, new: &str) -> Change {
        let diff = TextDiff::from_lines(old, new);
        let mut lines = Vec::new();
        for op in diff.ops() {
            for change in diff.iter_inline_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-".red().to_string(),
                    ChangeTag::Insert => "+".green().to_string(),
                    ChangeTag::Equal => continue,
                };
                let mut line = sign;
                for (emphasized, value) in change.iter_strings_lossy() {
                    let value = value.trim_end_matches(['\r', '\n']);
                    if emphasized {
                        if change.tag() == ChangeTag::Insert {
                            line.push_str(&format!("{}", value.green().underline()));
                        } else {
                            line.push_str(&format!("{}", value.red().underline()));
                        }
                    } else {
                        line.push_str(&format!("{}", value.dimmed()));
                    }
                }
                line.push('\n');
                lines.push(line);
            }
        }
        Change::Context(lines)
    }

    fn handle_entry(&self, left: &Entry, right: &Entry) -> Result<Option<Change>> {
        let data_left = left.decompressed_data()?;
        let data_right = right.decompressed_data()?;
        if data_left == data_right {
            return Ok(None);
        }

        let mut related = Vec::new();
        if data_left.len() != data_right.len() {
            related.push(Change::Comparison(
                "size".into(),
                data_left.len().to_string(),
                data_right.len().to_string(),
            ));
        }

        if self.mode == Mode::Full {
            if let (Some(old), Some(new)) = (as_text(left), as_text(right)) {
                related.push(self.line_diff(&old, &new));
            }
        }

        Ok(Some(Change::Modified(left.tgi(), left.kind().label(), related)))
    }

    fn handle_dbpf(&self, left: &DbpfFile, right: &DbpfFile) -> Result<Vec<Change>> {
        let mut result = Vec::new();

        let left_tgis = left.tgis().collect::<HashSet<_>>();
        let right_tgis = right.tgis().collect::<HashSet<_>>();

        if left.len() != right.len() {
            result.push(Change::Comparison(
                "entries".into(),
                left.len().to_string(),
                right.len().to_string(),
            ));
        }

        right
            .iter()
            .filter(|e| !left_tgis.contains(&e.tgi()))
            .map(|e| Change::Added(e.tgi(), e.kind().label()))
            .for_each(|c| result.push(c));

        left.iter()
            .filter(|e| !right_tgis.contains(&e.tgi()))
            .map(|e| Change::Removed(e.tgi(), e.kind().label()))
            .for_each(|c| result.push(c));

        for entry in left.iter().filter(|e| right_tgis.contains(&e.tgi())) {
            let other = right.by_tgi(&entry.tgi())?;
            if let Some(change) = self.handle_entry(entry, other)? {
                result.push(change);
            }
        }

        Ok(result)
    }

    pub fn handle(&self) -> Result<()> {
        let mut left = open(&self.left)?;
        let mut right = open(&self.right)?;

        if self.mode == Mode::Full {
            left.decode_all();
            right.decode_all();
        }

        let changes = self.handle_dbpf(&left, &right)?;
        if changes.is_empty() {
            println!("no differences");
        }
        for change in changes {
            print!("{change}");
        }

        Ok(())
    }
}
