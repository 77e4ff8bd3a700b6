//! `invctl` entry point.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Config, LogFormat};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(config: &Config, format: LogFormat) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries command output; logs go to stderr.
    let text = (format == LogFormat::Text)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    let json = (format == LogFormat::Json)
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => args.global.apply(config),
        Err(err) => {
            eprintln!("{}", err.render());
            return ExitCode::from(err.exit_code());
        }
    };
    init_tracing(&config, args.global.log_format);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = cli::run(args.command, &config, &mut out).await;
    let _ = out.flush();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("{}", err.render());
            ExitCode::from(err.exit_code())
        }
    }
}
