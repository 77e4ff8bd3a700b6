//! Command line for the inventory ledger and order workflow.
//!
//! Commands run against PostgreSQL when `DATABASE_URL` is set and against a
//! process-local in-memory store otherwise.

pub mod app;
pub mod args;
pub mod commands;
pub mod config;
pub mod error;
pub mod render;

use std::io::Write;

use common::{SharedClock, SystemClock};
use doc_store::{InMemoryDocumentStore, PostgresDocumentStore, StoreError};

pub use app::App;
pub use args::{Cli, Command, LogFormat};
pub use config::Config;
pub use error::CliError;

/// Opens the configured store and runs `command` against it.
pub async fn run(command: Command, config: &Config, out: &mut dyn Write) -> Result<(), CliError> {
    let clock: SharedClock = SystemClock::shared();
    match &config.database_url {
        Some(url) => {
            let store = PostgresDocumentStore::connect(url).await?;
            store.run_migrations().await.map_err(StoreError::from)?;
            tracing::debug!("connected to PostgreSQL");
            App::new(store, clock, config).execute(command, out).await
        }
        None => {
            tracing::warn!(
                "DATABASE_URL is not set; using an in-memory store that is discarded on exit"
            );
            App::new(InMemoryDocumentStore::new(), clock, config)
                .execute(command, out)
                .await
        }
    }
}
