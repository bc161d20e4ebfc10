//! Configuration management for the CLI.
//!
//! One TOML file carries the database location, output settings, engine and
//! scheduler policy, and an optional `[[tiers]]` catalog override.

use crate::error::{CliError, Result};
use ascend_domain::TierCatalog;
use ascend_engine::{build_catalog, EngineConfig, TierSpec};
use ascend_scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Challenge policy
    #[serde(default)]
    pub engine: EngineConfig,

    /// Background evaluation
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Catalog override; the built-in ladder when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<TierSpec>,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Directory holding the default config and database.
    pub fn home() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".ascend"))
    }

    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(Self::home()?.join("config.toml"))
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing file yields the defaults. The result is validated, including
    /// any catalog override.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::path()?,
        };

        let config = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            Self::from_toml_str(&contents)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Fail fast on bad policy values or an invalid catalog.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.scheduler.validate()?;
        self.catalog()?;
        Ok(())
    }

    /// Catalog in effect: the override, or the built-in ladder.
    pub fn catalog(&self) -> Result<TierCatalog> {
        Ok(build_catalog(&self.tiers)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            settings: Settings::default(),
            engine: EngineConfig::default(),
            scheduler: SchedulerConfig::default(),
            tiers: Vec::new(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_database() -> PathBuf {
    Config::home()
        .map(|dir| dir.join("ascend.db"))
        .unwrap_or_else(|_| PathBuf::from("ascend.db"))
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascend_domain::TierName;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Table);
        assert!(config.tiers.is_empty());
        assert!(config.database.ends_with("ascend.db"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_sections_parse() {
        let config = Config::from_toml_str(
            r#"
            database = "/var/lib/ascend/ascend.db"

            [settings]
            format = "json"

            [engine]
            demotion_cooldown_days = 14

            [scheduler]
            sweep_interval_minutes = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.database, PathBuf::from("/var/lib/ascend/ascend.db"));
        assert_eq!(config.settings.format, OutputFormat::Json);
        assert_eq!(config.engine.demotion_cooldown_days, 14);
        assert_eq!(config.engine.max_attempts_allowed, 2);
        assert_eq!(config.scheduler.sweep_interval_minutes, 5);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.engine.max_attempts_allowed = 3;
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.engine.max_attempts_allowed, 3);
    }

    #[test]
    fn test_tier_override() {
        let mut toml = String::new();
        for (i, tier) in TierCatalog::standard().tiers().iter().enumerate() {
            let required = if tier.name == TierName::Bronze { 30 } else { tier.required_referrals };
            toml.push_str(&format!(
                "[[tiers]]\nname = \"{}\"\norder = {}\nrequired_referrals = {}\ncommission_rate = {}\nwithdrawal_multiplier = {}\nchallenge_window_days = {}\n\n",
                tier.name.as_str(),
                i + 1,
                required,
                tier.commission_rate,
                tier.withdrawal_multiplier,
                tier.challenge_window_days,
            ));
        }

        let config = Config::from_toml_str(&toml).unwrap();
        let catalog = config.catalog().unwrap();
        let bronze = catalog.tier_by_name(TierName::Bronze).unwrap();
        assert_eq!(bronze.required_referrals, 30);
    }

    #[test]
    fn test_invalid_override_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[[tiers]]\nname = \"gold\"\norder = 1\nrequired_referrals = 10\ncommission_rate = 5\nwithdrawal_multiplier = 1\nchallenge_window_days = 7\n",
        )
        .unwrap();

        assert!(Config::load(Some(&path)).is_err());
    }
}
