//! Builder and server configuration.
//!
//! Values come from `HAPPYDASH_*` environment variables (a `.env` file is
//! loaded by the binary through `dotenvy`); CLI flags override them.
//!
//! | Variable                      | Default                              |
//! |-------------------------------|--------------------------------------|
//! | `HAPPYDASH_RAW_DIR`           | `data/raw`                           |
//! | `HAPPYDASH_OUTPUT`            | `data/processed/summary_df.csv`      |
//! | `HAPPYDASH_YEARS`             | `2015,2016,2017,2018,2019`           |
//! | `HAPPYDASH_SOURCE_PATTERN`    | `{year}.csv`                         |
//! | `HAPPYDASH_AUX_PATTERN`       | `{year}_dystopia.csv`                |
//! | `HAPPYDASH_COUNTRY_CODES`     | `<raw_dir>/country_codes.csv` if present |
//! | `HAPPYDASH_ALIASES`           | none                                 |
//! | `HAPPYDASH_AUX_POLICY`        | `fail-fast`                          |
//! | `HAPPYDASH_SCHEMA_DIR`        | `.happydash/schemas`                 |
//! | `HAPPYDASH_PORT`              | `8050`                               |
//! | `HAPPYDASH_DATA`              | same as `HAPPYDASH_OUTPUT`           |

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::registry::DEFAULT_REGISTRY_DIR;
use crate::transform::reconcile::AuxJoinPolicy;
use crate::transform::shapes::SUPPORTED_YEARS;

pub const DEFAULT_RAW_DIR: &str = "data/raw";
pub const DEFAULT_OUTPUT: &str = "data/processed/summary_df.csv";
pub const DEFAULT_SOURCE_PATTERN: &str = "{year}.csv";
pub const DEFAULT_AUX_PATTERN: &str = "{year}_dystopia.csv";
pub const DEFAULT_COUNTRY_CODES_FILE: &str = "country_codes.csv";
pub const DEFAULT_PORT: u16 = 8050;

/// Dataset builder settings.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub raw_dir: PathBuf,
    pub output: PathBuf,
    pub years: Vec<i32>,
    /// File name of a yearly source; `{year}` is substituted
    pub source_pattern: String,
    /// File name of an auxiliary dystopia lookup; `{year}` is substituted
    pub auxiliary_pattern: String,
    pub country_codes: Option<PathBuf>,
    pub aliases: Option<PathBuf>,
    pub aux_policy: AuxJoinPolicy,
    pub schema_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
            output: PathBuf::from(DEFAULT_OUTPUT),
            years: SUPPORTED_YEARS.to_vec(),
            source_pattern: DEFAULT_SOURCE_PATTERN.to_string(),
            auxiliary_pattern: DEFAULT_AUX_PATTERN.to_string(),
            country_codes: None,
            aliases: None,
            aux_policy: AuxJoinPolicy::default(),
            schema_dir: PathBuf::from(DEFAULT_REGISTRY_DIR),
        }
    }
}

impl BuildConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = get("HAPPYDASH_RAW_DIR") {
            config.raw_dir = PathBuf::from(v);
        }
        if let Some(v) = get("HAPPYDASH_OUTPUT") {
            config.output = PathBuf::from(v);
        }
        if let Some(v) = get("HAPPYDASH_YEARS") {
            config.set_years("HAPPYDASH_YEARS", &v)?;
        }
        if let Some(v) = get("HAPPYDASH_SOURCE_PATTERN") {
            config.set_source_pattern("HAPPYDASH_SOURCE_PATTERN", v)?;
        }
        if let Some(v) = get("HAPPYDASH_AUX_PATTERN") {
            config.set_auxiliary_pattern("HAPPYDASH_AUX_PATTERN", v)?;
        }
        config.country_codes = get("HAPPYDASH_COUNTRY_CODES").map(PathBuf::from);
        config.aliases = get("HAPPYDASH_ALIASES").map(PathBuf::from);
        if let Some(v) = get("HAPPYDASH_AUX_POLICY") {
            config.aux_policy = v.parse::<AuxJoinPolicy>().map_err(|message| invalid("HAPPYDASH_AUX_POLICY", &v, message))?;
        }
        if let Some(v) = get("HAPPYDASH_SCHEMA_DIR") {
            config.schema_dir = PathBuf::from(v);
        }
        Ok(config)
    }

    /// Set the year list from a comma-separated value. `key` names the
    /// setting in errors (an env variable or a CLI flag).
    pub fn set_years(&mut self, key: &str, raw: &str) -> Result<(), ConfigError> {
        self.years = parse_years(raw).map_err(|message| invalid(key, raw, message))?;
        Ok(())
    }

    pub fn set_source_pattern(&mut self, key: &str, pattern: String) -> Result<(), ConfigError> {
        self.source_pattern = check_pattern(key, pattern)?;
        Ok(())
    }

    pub fn set_auxiliary_pattern(&mut self, key: &str, pattern: String) -> Result<(), ConfigError> {
        self.auxiliary_pattern = check_pattern(key, pattern)?;
        Ok(())
    }

    pub fn source_path(&self, year: i32) -> PathBuf {
        self.raw_dir.join(self.source_pattern.replace("{year}", &year.to_string()))
    }

    pub fn auxiliary_path(&self, year: i32) -> PathBuf {
        self.raw_dir.join(self.auxiliary_pattern.replace("{year}", &year.to_string()))
    }

    /// Explicit country-code lookup, else `<raw_dir>/country_codes.csv` when it exists.
    pub fn country_codes_path(&self) -> Option<PathBuf> {
        self.country_codes.clone().or_else(|| {
            let fallback = self.raw_dir.join(DEFAULT_COUNTRY_CODES_FILE);
            fallback.is_file().then_some(fallback)
        })
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Canonical CSV loaded at start-up
    pub data: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = get("HAPPYDASH_PORT") {
            config.port = v
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid("HAPPYDASH_PORT", &v, e.to_string()))?;
        }
        if let Some(v) = get("HAPPYDASH_DATA").or_else(|| get("HAPPYDASH_OUTPUT")) {
            config.data = PathBuf::from(v);
        }
        Ok(config)
    }
}

/// Comma-separated years, deduplicated and sorted.
pub fn parse_years(raw: &str) -> Result<Vec<i32>, String> {
    let mut years = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>().map_err(|_| format!("'{}' is not a year", s)))
        .collect::<Result<Vec<_>, _>>()?;
    if years.is_empty() {
        return Err("no years given".into());
    }
    years.sort_unstable();
    years.dedup();
    Ok(years)
}

fn check_pattern(key: &str, value: String) -> Result<String, ConfigError> {
    if value.contains("{year}") {
        Ok(value)
    } else {
        Err(invalid(key, &value, "pattern must contain {year}"))
    }
}

fn invalid(key: &str, value: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: message.into(),
    }
}
