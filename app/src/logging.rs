use color_eyre::Result;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{PROJECT_NAME, get_data_dir};

lazy_static::lazy_static! {
    pub static ref LOG_FILE: String = format!("{}.log", PROJECT_NAME.to_lowercase());
}

/// Logs to a file in the data directory and to stderr. `RUST_LOG` overrides
/// the default filter. `.env` is loaded first, so both the filter and the
/// data directory can come from it.
pub fn init() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter = env_filter(std::env::var("RUST_LOG").ok());

    let directory = get_data_dir();
    std::fs::create_dir_all(&directory)?;
    let log_path = directory.join(LOG_FILE.as_str());
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let file_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false);
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .with(ErrorLayer::default())
        .try_init()?;

    tracing::debug!("Logging to {}", log_path.display());
    Ok(())
}

fn env_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| {
            format!(
                "{}=info,domain=info,market_data_adapter=info,database_adapter=info,tower_http=info",
                env!("CARGO_CRATE_NAME")
            )
            .into()
        })
}
