use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;

use crate::domain::entities::dataset::DEFAULT_PAGE_SIZE;
use crate::infra::gemini::client::{DEFAULT_BASE_URL, DEFAULT_INSIGHTS_MODEL, DEFAULT_MODEL};
use crate::usecase::services::rate_gate::DEFAULT_MIN_INTERVAL;
use crate::usecase::services::session_service::DEFAULT_SESSION_TTL_HOURS;

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_insights_model: String,
    pub gemini_base_url: String,
    pub ai_min_interval: Duration,
    pub page_size: usize,
    pub session_ttl_hours: i64,
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl AppConfig {
    /// Reads the process environment after loading `.env` if one exists.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let ai_min_interval = match var("BIZDESK_AI_RATE_LIMIT_MS") {
            Some(raw) => Duration::from_millis(parse_number("BIZDESK_AI_RATE_LIMIT_MS", &raw)?),
            None => DEFAULT_MIN_INTERVAL,
        };
        let page_size = match var("BIZDESK_PAGE_SIZE") {
            Some(raw) => parse_number::<usize>("BIZDESK_PAGE_SIZE", &raw)?,
            None => DEFAULT_PAGE_SIZE,
        };
        if page_size == 0 {
            return Err(anyhow!("BIZDESK_PAGE_SIZE must be greater than zero"));
        }
        let session_ttl_hours = match var("BIZDESK_SESSION_TTL_HOURS") {
            Some(raw) => parse_number("BIZDESK_SESSION_TTL_HOURS", &raw)?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };
        let data_dir = match var("BIZDESK_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        Ok(Self {
            gemini_api_key: var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_insights_model: var("GEMINI_INSIGHTS_MODEL")
                .unwrap_or_else(|| DEFAULT_INSIGHTS_MODEL.to_string()),
            gemini_base_url: var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ai_min_interval,
            page_size,
            session_ttl_hours,
            data_dir,
            log_level: var("BIZDESK_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    pub fn session_db_path(&self) -> PathBuf {
        self.data_dir.join("session.sqlite")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("records.json")
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("invalid value for {key}: {raw}"))
}

fn default_data_dir() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("com", "bizdesk", "bizdesk")
        .ok_or_else(|| anyhow!("unable to resolve data directory"))?;
    Ok(project_dirs.data_local_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn falls_back_to_defaults() {
        let config = config(&[("BIZDESK_DATA_DIR", "/tmp/bizdesk")]).expect("config should load");

        assert_eq!(config.gemini_api_key, "");
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.gemini_insights_model, "gemini-1.5-pro");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.ai_min_interval, Duration::from_millis(1000));
        assert_eq!(config.session_ttl(), chrono::Duration::hours(24));
        assert_eq!(config.session_db_path(), PathBuf::from("/tmp/bizdesk/session.sqlite"));
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("GEMINI_API_KEY", " AIza-key "),
            ("BIZDESK_PAGE_SIZE", "50"),
            ("BIZDESK_AI_RATE_LIMIT_MS", "250"),
            ("BIZDESK_DATA_DIR", "/srv/bizdesk"),
            ("BIZDESK_LOG", "debug"),
        ])
        .expect("config should load");

        assert_eq!(config.gemini_api_key, "AIza-key");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.ai_min_interval, Duration::from_millis(250));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = config(&[("BIZDESK_PAGE_SIZE", "ten"), ("BIZDESK_DATA_DIR", "/tmp")])
            .expect_err("page size should be rejected");

        assert!(err.to_string().contains("BIZDESK_PAGE_SIZE"));
        assert!(config(&[("BIZDESK_PAGE_SIZE", "0"), ("BIZDESK_DATA_DIR", "/tmp")]).is_err());
    }
}
