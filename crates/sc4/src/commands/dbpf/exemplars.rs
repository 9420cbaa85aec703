use std::{collections::BTreeMap, path::PathBuf};

use clap::{Args, ValueEnum};
use miette::{IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use sc4_dbpf::Exemplar;

use super::open;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ExemplarsArgs {
    /// An input DBPF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

impl ExemplarsArgs {
    pub fn handle(&self) -> Result<()> {
        let mut dbpf = open(&self.file)?;
        dbpf.decode_all();

        let exemplars = dbpf
            .iter()
            .filter_map(|e| e.exemplar().map(|exemplar| (e.tgi().to_string(), exemplar)))
            .collect::<BTreeMap<String, &Exemplar>>();

        match self.format {
            Format::Text => {
                for (tgi, exemplar) in exemplars {
                    println!("{}", tgi.bold());
                    println!("{}", exemplar.to_text());
                }
            }
            Format::Json => {
                println!("{}", serde_json::to_string_pretty(&exemplars).into_diagnostic()?);
            }
        }

        for (tgi, issues) in dbpf.issues() {
            for issue in issues {
                eprintln!("{} {}: {}", "⚠".yellow(), tgi, issue);
            }
        }

        Ok(())
    }
}
