use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::export::OutputFormat;
use crate::scraper::{form, ScrapeSettings};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub target_url: String,
    pub webdriver_url: String,
    pub chromedriver_port: u16,
    /// Start (and if needed download) a local ChromeDriver for the run.
    pub manage_chromedriver: bool,
    pub headless: bool,
    pub market_timeout_secs: u64,
    pub results_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub output_format: OutputFormat,
    pub last_export_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_url: form::TARGET_URL.to_string(),
            webdriver_url: "http://localhost:9516".to_string(),
            chromedriver_port: 9516,
            manage_chromedriver: true,
            headless: true,
            market_timeout_secs: 10,
            results_timeout_secs: 10,
            poll_interval_ms: 500,
            settle_delay_ms: 1000,
            output_format: OutputFormat::Json,
            last_export_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the platform config dir, or defaults if none was saved.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "agmarknet", "agmark-scraper")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(proj_dirs.config_dir().join("config.json"))
    }

    pub fn scrape_settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            target_url: self.target_url.clone(),
            market_timeout: Duration::from_secs(self.market_timeout_secs),
            results_timeout: Duration::from_secs(self.results_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.target_url.is_empty() {
            errors.push("Target URL is required".to_string());
        }

        if self.webdriver_url.is_empty() {
            errors.push("WebDriver URL is required".to_string());
        }

        if self.manage_chromedriver && self.chromedriver_port == 0 {
            errors.push("ChromeDriver port must be set when managing ChromeDriver".to_string());
        }

        if self.results_timeout_secs == 0 {
            errors.push("Results timeout must be at least one second".to_string());
        }

        if self.poll_interval_ms == 0 {
            errors.push("Poll interval must be positive".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default().validate().is_empty());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn save_then_load_keeps_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.headless = false;
        config.results_timeout_secs = 25;
        config.output_format = OutputFormat::Csv;
        config.save_to(&path).unwrap();

        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "headless": false }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert!(!config.headless);
        assert_eq!(config.target_url, form::TARGET_URL);
    }

    #[test]
    fn settings_convert_units() {
        let config = AppConfig {
            market_timeout_secs: 4,
            poll_interval_ms: 250,
            ..AppConfig::default()
        };
        let settings = config.scrape_settings();

        assert_eq!(settings.market_timeout, Duration::from_secs(4));
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.settle_delay, Duration::from_secs(1));
    }

    #[test]
    fn validate_reports_each_problem() {
        let config = AppConfig {
            webdriver_url: String::new(),
            poll_interval_ms: 0,
            ..AppConfig::default()
        };
        let errors = config.validate();

        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("WebDriver URL"));
        assert!(errors[1].contains("Poll interval"));
    }
}
