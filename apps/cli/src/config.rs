use anyhow::Context;
use querystream_core::FragmentLimits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

pub struct Config {
    pub db_path: String,
    pub limits: FragmentLimits,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let db_path =
            std::env::var("QS_DB_PATH").unwrap_or_else(|_| "./db/querystream.db".into());

        let defaults = FragmentLimits::default();
        let max_fragment_bytes = env_usize("QS_MAX_FRAGMENT_BYTES", defaults.max_fragment_bytes)?;
        let max_rows_per_fragment =
            env_usize("QS_MAX_ROWS_PER_FRAGMENT", defaults.max_rows_per_fragment)?;
        let limits = FragmentLimits::new(max_fragment_bytes, max_rows_per_fragment)?;

        let log_format = match std::env::var("QS_LOG_FORMAT") {
            Ok(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            db_path,
            limits,
            log_format,
        })
    }
}

fn env_usize(key: &str, default: usize) -> anyhow::Result<usize> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", key, raw)),
        Err(_) => Ok(default),
    }
}
