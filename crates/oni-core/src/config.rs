//! Configuration loading and parsing for Oni
//!
//! Provides functionality to load and parse `oni.toml` configuration files.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fuzz::FuzzSettings;

pub const CONFIG_FILENAME: &str = "oni.toml";

const KNOWN_TOP_LEVEL_KEYS: &[&str] = &["include", "exclude", "extract", "fuzz", "rules", "report"];
const KNOWN_SECTION_KEYS: &[(&str, &[&str])] = &[
    ("extract", &["module", "functions"]),
    (
        "fuzz",
        &[
            "budget_ms",
            "base_len",
            "growth_factor",
            "steps",
            "inputs_per_length",
            "superlinear_threshold",
            "deadline_ms",
            "seed",
        ],
    ),
    ("rules", &["disabled"]),
    ("report", &["verbose"]),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in '{path}': {message}")]
    ParseError { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Default)]
pub struct ConfigResult {
    pub config: Config,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub extract: ExtractConfig,
    pub fuzz: FuzzConfig,
    pub rules: RulesConfig,
    pub report: ReportConfig,
}

/// Which call sites count as regex uses.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractConfig {
    /// Module whose functions take patterns, matched against imports.
    pub module: String,
    /// Function names whose first argument is a pattern.
    pub functions: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            module: "re".to_string(),
            functions: vec![
                "compile".to_string(),
                "match".to_string(),
                "search".to_string(),
                "fullmatch".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FuzzConfig {
    pub budget_ms: u64,
    pub base_len: usize,
    pub growth_factor: usize,
    pub steps: usize,
    pub inputs_per_length: usize,
    pub superlinear_threshold: f64,
    /// Scan-wide wall-clock cap in milliseconds. Zero disables it.
    pub deadline_ms: u64,
    pub seed: u64,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            budget_ms: 250,
            base_len: 64,
            growth_factor: 2,
            steps: 4,
            inputs_per_length: 3,
            superlinear_threshold: 1.5,
            deadline_ms: 0,
            seed: 0,
        }
    }
}

impl FuzzConfig {
    pub fn settings(&self) -> FuzzSettings {
        FuzzSettings {
            budget: Duration::from_millis(self.budget_ms),
            base_len: self.base_len,
            growth_factor: self.growth_factor,
            steps: self.steps,
            inputs_per_length: self.inputs_per_length,
            superlinear_threshold: self.superlinear_threshold,
            noise_floor: FuzzSettings::default().noise_floor,
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_ms > 0).then(|| Duration::from_millis(self.deadline_ms))
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Include benign sites in the report.
    pub verbose: bool,
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}

pub fn load_config_with_warnings(path: &Path) -> Result<ConfigResult, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })?;

    let warnings = detect_unknown_keys(&content);

    Ok(ConfigResult { config, warnings })
}

fn detect_unknown_keys(content: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    let table: toml::Table = match content.parse() {
        Ok(t) => t,
        Err(_) => return warnings,
    };

    let known_top: HashSet<&str> = KNOWN_TOP_LEVEL_KEYS.iter().copied().collect();
    for key in table.keys() {
        if !known_top.contains(key.as_str()) {
            warnings.push(format!("Unknown config option: '{}'", key));
        }
    }

    for (section, known_keys) in KNOWN_SECTION_KEYS {
        if let Some(toml::Value::Table(entries)) = table.get(*section) {
            let known: HashSet<&str> = known_keys.iter().copied().collect();
            for key in entries.keys() {
                if !known.contains(key.as_str()) {
                    warnings.push(format!("Unknown config option in [{}]: '{}'", section, key));
                }
            }
        }
    }

    warnings
}

/// Loads the nearest config, falling back to defaults when none exists.
/// A config file that exists but does not parse is an error, never silently
/// replaced by defaults.
pub fn load_config_or_default(start_dir: &Path) -> Result<ConfigResult, ConfigError> {
    match find_config_file(start_dir) {
        Some(path) => load_config_with_warnings(&path),
        None => Ok(ConfigResult::default()),
    }
}
