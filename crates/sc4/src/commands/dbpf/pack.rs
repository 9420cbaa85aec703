use std::path::PathBuf;

use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use sc4_dbpf::{tgi::DIRECTORY, DbpfFile, Entry, SaveOptions, Tgi};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Args)]
pub struct PackArgs {
    /// An input directory of `T-G-I.ext` files
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target DBPF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Compress entries with QFS
    #[arg(short, long, default_value_t = false)]
    compress: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl PackArgs {
    pub fn handle(&self) -> Result<()> {
        info!("creating {}", &self.file.display());

        if self.file.exists() && !self.overwrite {
            return Err(miette!("{} already exists", self.file.display()));
        }

        let mut files = WalkDir::new(&self.directory)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .collect::<Vec<_>>();
        files.sort_by(|a, b| a.path().cmp(b.path()));

        if files.is_empty() {
            return Err(miette!("directory is empty"));
        }

        let mut dbpf = DbpfFile::create();
        for file in files {
            let stem = file
                .path()
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or(miette!("unable to convert {} to a string", file.path().display()))?;

            let tgi = match stem.parse::<Tgi>() {
                Ok(tgi) => tgi,
                Err(e) => {
                    warn!("skipping {}: {e}", file.path().display());
                    continue;
                }
            };
            if tgi == DIRECTORY {
                continue;
            }
            info!("packing {tgi}");

            let data = std::fs::read(file.path())
                .into_diagnostic()
                .context(format!("opening {}", file.path().display()))?;

            let mut entry = Entry::from_bytes(tgi, data);
            if self.compress {
                entry
                    .set_compressed(true)
                    .context(format!("compressing {tgi}"))?;
            }
            dbpf.add_entry(entry);
        }

        dbpf.update_directory()?;
        dbpf.save_as(&self.file, SaveOptions::default())
            .context("finalizing dbpf file")?;

        Ok(())
    }
}
