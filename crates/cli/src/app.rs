//! Services shared by every command.

use std::io::Write;

use checkout::OrderOrchestrator;
use common::SharedClock;
use doc_store::DocumentStore;
use domain::{OrderStateMachine, ProductCatalog, StockLedger, UserDirectory};

use crate::args::Command;
use crate::commands;
use crate::config::Config;
use crate::error::CliError;

/// The wired application for one store backend.
pub struct App<S> {
    pub(crate) catalog: ProductCatalog<S>,
    pub(crate) ledger: StockLedger<S>,
    pub(crate) users: UserDirectory<S>,
    pub(crate) orders: OrderStateMachine<S>,
    pub(crate) checkout: OrderOrchestrator<S>,
    pub(crate) operator: String,
}

impl<S> App<S>
where
    S: DocumentStore + Clone,
{
    /// Builds every service on top of `store` with settings from `config`.
    pub fn new(store: S, clock: SharedClock, config: &Config) -> Self {
        let ledger = StockLedger::new(store.clone(), clock.clone(), config.ledger_settings());
        let order_settings = config.order_settings();
        Self {
            catalog: ProductCatalog::new(store.clone(), clock.clone()),
            users: UserDirectory::new(store.clone(), clock.clone())
                .with_max_write_attempts(config.max_write_attempts),
            orders: OrderStateMachine::new(
                store.clone(),
                ledger.clone(),
                clock.clone(),
                order_settings.clone(),
            ),
            checkout: OrderOrchestrator::new(store, ledger.clone(), clock, order_settings),
            ledger,
            operator: config.operator.clone(),
        }
    }

    /// Runs one command, writing its output to `out`.
    pub async fn execute(&self, command: Command, out: &mut dyn Write) -> Result<(), CliError> {
        match command {
            Command::Product(command) => commands::product::run(self, command, out).await,
            Command::User(command) => commands::user::run(self, command, out).await,
            Command::Order(command) => commands::order::run(self, command, out).await,
        }
    }

    pub(crate) fn operator(&self) -> Option<String> {
        Some(self.operator.clone())
    }
}
