//! # coursetrack
//!
//! Server and CLI for the course status dashboard.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │           apps/coursetrack (THE BINARY)       │
//! │                                               │
//! │   ┌─────────────┐          ┌─────────────┐    │
//! │   │     CLI     │          │  HTTP API   │    │
//! │   │   (clap)    │          │   (axum)    │    │
//! │   └──────┬──────┘          └──────┬──────┘    │
//! │          └───────────┬────────────┘           │
//! │                      ▼                        │
//! │            ┌──────────────────┐               │
//! │            │ coursetrack-core │               │
//! │            │   (THE LOGIC)    │               │
//! │            └──────────────────┘               │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! coursetrack import -f catalog.json
//! coursetrack dashboard -u 42
//! coursetrack in-progress -u 42 --json-mode
//! coursetrack server --config coursetrack.toml
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // COURSETRACK_LOG_FORMAT=json switches to machine-parseable output.
    let log_format =
        std::env::var("COURSETRACK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "coursetrack=info,coursetrack_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r#"
  coursetrack v{}
  enrolled / completed / in progress / criteria undefined
"#,
        env!("CARGO_PKG_VERSION")
    );
}
