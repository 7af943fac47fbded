use clap::Parser;
use sightline_server::cli::{Cli, Commands};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sightline_core::o11y::init_from_env()?;
    let cli = Cli::parse();

    let cmd = cli.command.unwrap_or(Commands::Serve {
        host: "0.0.0.0".to_string(),
        port: 8000,
        data_dir: ".sightline_dev".into(),
    });

    match cmd {
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let addr: SocketAddr = format!("{host}:{port}").parse()?;
            let state = sightline_server::dev_backends::build_state(&data_dir).await?;
            sightline_server::server::serve(addr, state).await?;
        }
        Commands::Migrate { database_url } => {
            let url = database_url.or_else(|| std::env::var("SIGHTLINE_DATABASE_URL").ok());
            if let Some(url) = url {
                let cfg = sightline_core::config::StoreConfig {
                    url,
                    max_connections: 5,
                    min_connections: 1,
                    acquire_timeout: std::time::Duration::from_secs(10),
                };
                let store =
                    sightline_core::store::postgres::PostgresStore::connect(&cfg).await?;
                use sightline_core::store::traits::CatalogStore;
                store.migrate().await?;
                tracing::info!("store migrations applied");
            } else {
                tracing::info!("no postgres url configured; skipping migrations");
            }
        }
        Commands::Seed { data_dir } => {
            let store = sightline_server::dev_backends::build_store(&data_dir).await?;
            store.migrate().await?;
            let seeded = sightline_core::seed::seed_if_empty(store.as_ref()).await?;
            if seeded {
                tracing::info!("sample data loaded");
            } else {
                tracing::info!("sample data already present; nothing to do");
            }
        }
    }

    Ok(())
}
