use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Unset → in-memory transcript store.
    pub database_url: Option<String>,
    /// Résumé archive settings. Unset → uploads are not archived.
    pub s3: Option<S3Config>,
    pub anthropic_api_key: String,
    /// Voice platform key. Unset → `/voice/call` answers 503.
    pub vapi_api_key: Option<String>,
    pub port: u16,
    pub llm_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            s3: S3Config::from_env()?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            vapi_api_key: optional_env("VAPI_API_KEY"),
            port: parse_env("PORT", 5001)?,
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 60)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

impl S3Config {
    /// The archive is all-or-nothing: a bucket without credentials is a configuration error.
    fn from_env() -> Result<Option<Self>> {
        let Some(bucket) = optional_env("S3_BUCKET") else {
            return Ok(None);
        };
        Ok(Some(S3Config {
            bucket,
            endpoint: require_env("S3_ENDPOINT")?,
            access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
        }))
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
