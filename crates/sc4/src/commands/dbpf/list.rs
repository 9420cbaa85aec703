use std::path::PathBuf;

use clap::Args;
use miette::Result;
use owo_colors::OwoColorize;
use sc4_dbpf::TgiMask;

use super::{open, parse_id};

#[derive(Args)]
pub struct ListArgs {
    /// An input DBPF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Only list entries of this type id
    #[arg(short = 't', long = "type", value_name = "ID", value_parser = parse_id)]
    type_id: Option<u32>,

    /// Only list entries of this group id
    #[arg(short, long = "group", value_name = "ID", value_parser = parse_id)]
    group_id: Option<u32>,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let dbpf = open(&self.file)?;
        let mask = TgiMask::new(self.type_id, self.group_id, None);

        let header = dbpf.header();
        println!(
            "{} entries, created {} modified {}",
            dbpf.len(),
            header.date_created,
            header.date_modified
        );

        for entry in dbpf.find(&mask) {
            let size = if entry.is_compressed() {
                format!("{} ({})", entry.decompressed_size(), entry.compressed_size())
            } else {
                entry.decompressed_size().to_string()
            };
            println!(
                "{:>5} {} {:<24} {}",
                entry.index(),
                entry.tgi().bold(),
                entry.kind().label().dimmed(),
                size
            );
        }

        Ok(())
    }
}
