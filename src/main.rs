//! tfflow - Ordered plan, apply, and destroy runs for Terraform-compatible tools.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tfflow::cli::output;
use tfflow::cli::{execute, hint, Cli};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env("TFFLOW_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("tfflow=debug")
        } else {
            EnvFilter::new("tfflow=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();

    match execute(cli) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::error(&e.to_string());
            if let Some(suggestion) = hint(&e) {
                output::hint(suggestion);
            }
            std::process::exit(e.exit_code());
        }
    }
}
