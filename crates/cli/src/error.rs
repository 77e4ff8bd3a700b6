//! CLI error type with exit code mapping.

use doc_store::StoreError;
use domain::{DomainError, ErrorKind, OrderStatus};

/// CLI-level error type that maps to a message and a process exit code.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Domain operation failed.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Opening or migrating the store failed.
    #[error("store: {0}")]
    Store(#[from] StoreError),
    /// Bad configuration value.
    #[error("configuration: {0}")]
    Config(String),
    /// Bad argument that clap could not catch.
    #[error("{0}")]
    Usage(String),
    /// Writing output failed.
    #[error("output: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Short label printed as `error[<label>]`.
    pub fn label(&self) -> &'static str {
        match self {
            CliError::Domain(err) => err.kind().as_str(),
            CliError::Store(_) => ErrorKind::Transient.as_str(),
            CliError::Config(_) => "config",
            CliError::Usage(_) => ErrorKind::ValidationFailed.as_str(),
            CliError::Io(_) => "io",
        }
    }

    /// Process exit code. 2 is left to clap for argument errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Domain(err) => kind_exit_code(err.kind()),
            CliError::Store(_) => kind_exit_code(ErrorKind::Transient),
            CliError::Usage(_) => kind_exit_code(ErrorKind::ValidationFailed),
            CliError::Config(_) | CliError::Io(_) => 1,
        }
    }

    /// Renders the text printed to stderr.
    ///
    /// A cancellation whose releases failed gets a second line on how to
    /// free the units it left reserved.
    pub fn render(&self) -> String {
        let mut rendered = format!("error[{}]: {}", self.label(), self);
        if let CliError::Domain(DomainError::SideEffectFailed {
            order_number,
            status: OrderStatus::Cancelled,
            ..
        }) = self
        {
            rendered.push_str(&format!(
                "\nhint: units of each failed release are still reserved, return them with \
                 `invctl product release <product-id> <qty> --order {order_number}`"
            ));
        }
        rendered
    }
}

fn kind_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::NotFound => 3,
        ErrorKind::InsufficientStock => 4,
        ErrorKind::InvalidTransition => 5,
        ErrorKind::ValidationFailed => 6,
        ErrorKind::DuplicateKey => 7,
        ErrorKind::Transient => 8,
    }
}
