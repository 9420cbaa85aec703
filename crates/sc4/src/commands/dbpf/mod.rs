use std::path::Path;

use miette::{Context, Result};
use sc4_dbpf::DbpfFile;

pub mod diff;
pub mod exemplars;
pub mod extract;
pub mod list;
pub mod pack;

#[derive(clap::Subcommand)]
pub enum DbpfCommands {
    /// Compare two DBPF files
    Diff(diff::DiffArgs),
    /// Print the exemplars and cohorts of a DBPF file
    Exemplars(exemplars::ExemplarsArgs),
    /// Extract a DBPF file into a directory
    Extract(extract::ExtractArgs),
    /// List the entries of a DBPF file
    List(list::ListArgs),
    /// Pack a directory into a DBPF file
    Pack(pack::PackArgs),
}

impl DbpfCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            DbpfCommands::Diff(diff) => diff.handle(),
            DbpfCommands::Exemplars(exemplars) => exemplars.handle(),
            DbpfCommands::Extract(extract) => extract.handle(),
            DbpfCommands::List(list) => list.handle(),
            DbpfCommands::Pack(pack) => pack.handle(),
        }
    }
}

/// Open an existing file, an absent path is an error here
pub(crate) fn open(path: &Path) -> Result<DbpfFile> {
    if !path.is_file() {
        return Err(miette::miette!("{} is not a file", path.display()));
    }
    let dbpf = DbpfFile::open(path).context(format!("path: {}", path.display()))?;
    Ok(dbpf)
}

/// Parse an id given as `0x` prefixed hex or plain decimal
pub(crate) fn parse_id(value: &str) -> std::result::Result<u32, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("{value}: {e}"))
}
