pub mod dbpf;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle DBPF files
    Dbpf {
        #[command(subcommand)]
        command: dbpf::DbpfCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Dbpf { command } => command.handle(),
        }
    }
}
