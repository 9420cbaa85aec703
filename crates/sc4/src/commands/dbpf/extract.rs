use std::{fs::File, io::Write, path::PathBuf};

use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use tracing::info;

use super::open;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input DBPF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let dbpf = open(&self.file)?;

        std::fs::create_dir_all(&self.directory)
            .into_diagnostic()
            .context(format!("creating {}", &self.directory.display()))?;

        for entry in dbpf.iter() {
            let p = self
                .directory
                .join(format!("{}.{}", entry.tgi(), entry.kind().extension()));
            info!("writing {}", p.display());

            let data = entry
                .decompressed_data()
                .context(format!("decompressing {}", entry.tgi()))?;

            let mut out = if !self.overwrite {
                File::create_new(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            } else {
                File::create(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            };

            out.write_all(&data).into_diagnostic()?;
        }
        Ok(())
    }
}
