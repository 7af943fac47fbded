use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sightline", version, about = "Sightline analytics back office")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default if no subcommand given).
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Local dev data directory (SQLite db lives here when no Postgres
        /// URL is configured).
        #[arg(long, env = "SIGHTLINE_DEV_DATA_DIR", default_value = ".sightline_dev")]
        data_dir: PathBuf,
    },

    /// Apply store migrations to the configured Postgres database.
    Migrate {
        /// Postgres URL override (else SIGHTLINE_DATABASE_URL).
        #[arg(long)]
        database_url: Option<String>,
    },

    /// Migrate and load the sample e-commerce data if the store is empty.
    Seed {
        #[arg(long, env = "SIGHTLINE_DEV_DATA_DIR", default_value = ".sightline_dev")]
        data_dir: PathBuf,
    },
}
