use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use domain::market_data::CoinGeckoConfig;
use domain::trend::DEFAULT_TREND_THRESHOLD;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

lazy_static::lazy_static! {
    pub static ref PROJECT_NAME: String = String::from("CoinTracker").to_uppercase();
}

/// Get the data directory for the application
pub fn get_data_dir() -> PathBuf {
    let project_name = PROJECT_NAME.clone().to_lowercase();

    if let Ok(data_dir) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(data_dir).join(&project_name)
    } else if let Ok(home_dir) = std::env::var("HOME") {
        PathBuf::from(home_dir)
            .join(".local")
            .join("share")
            .join(&project_name)
    } else {
        // Fallback to current directory if no home directory is found
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(&project_name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    CoinGecko,
    Static,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres when set, process memory otherwise
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub provider: ProviderKind,
    pub coingecko: CoinGeckoConfig,
    /// Serve the static price table when the primary provider fails
    pub static_fallback: bool,
    pub trend_threshold: Decimal,
    /// Seed demo data for this user at startup
    pub demo_user: Option<Uuid>,
}

fn parse<T>(key: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value: v,
            })
        })
        .transpose()
}

impl AppConfig {
    /// Reads the configuration through `lookup`, so tests never touch the
    /// process environment.
    /// # Errors
    /// `ConfigError` for a missing secret or a value that does not parse
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("COINTRACKER_JWT_SECRET")
            .ok_or(ConfigError::Missing("COINTRACKER_JWT_SECRET"))?;

        let provider = get("COINTRACKER_MARKET_PROVIDER");
        let provider = match provider.as_deref().map(str::trim) {
            None | Some("coingecko") => ProviderKind::CoinGecko,
            Some("static") => ProviderKind::Static,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "COINTRACKER_MARKET_PROVIDER",
                    value: other.to_string(),
                    reason: "expected coingecko or static".to_string(),
                });
            }
        };

        let fallback = get("COINTRACKER_FALLBACK_PROVIDER");
        let static_fallback = match fallback.as_deref().map(str::trim) {
            None => false,
            Some("static") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "COINTRACKER_FALLBACK_PROVIDER",
                    value: other.to_string(),
                    reason: "expected static".to_string(),
                });
            }
        };

        let mut coingecko = CoinGeckoConfig {
            base_url: get("COINGECKO_BASE_URL"),
            api_key: get("COINGECKO_API_KEY"),
            ..CoinGeckoConfig::default()
        };
        if let Some(currency) = get("COINTRACKER_VS_CURRENCY") {
            coingecko.vs_currency = currency.trim().to_lowercase();
        }
        let timeout_key = "COINTRACKER_MARKET_TIMEOUT_SECS";
        if let Some(secs) = parse::<u64>(timeout_key, get(timeout_key))? {
            coingecko.timeout = Duration::from_secs(secs);
        }

        Ok(Self {
            bind_addr: parse("COINTRACKER_BIND", get("COINTRACKER_BIND"))?
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000))),
            database_url: get("DATABASE_URL"),
            jwt_secret,
            provider,
            coingecko,
            static_fallback,
            trend_threshold: parse(
                "COINTRACKER_TREND_THRESHOLD",
                get("COINTRACKER_TREND_THRESHOLD"),
            )?
            .unwrap_or(DEFAULT_TREND_THRESHOLD),
            demo_user: parse("COINTRACKER_DEMO_USER", get("COINTRACKER_DEMO_USER"))?,
        })
    }

    /// Reads the process environment after loading `.env`, if there is one.
    /// # Errors
    /// See [`AppConfig::from_lookup`]
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
