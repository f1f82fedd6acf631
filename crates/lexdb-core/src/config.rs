//! Lightweight configuration loader and typed settings.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys split on `__`, e.g. `APP_SEARCH__DEFAULT_TOP_K`). Sections that
//! are missing fall back to their `Default`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self::from_figment(figment);
        config.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Like [`Config::get`], but an absent key yields `T::default()`.
    pub fn get_or_default<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.contains(key) { self.get(key) } else { Ok(T::default()) }
    }

    pub fn search(&self) -> anyhow::Result<SearchSettings> {
        let settings: SearchSettings = self.get_or_default("search")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn ingest(&self) -> anyhow::Result<IngestSettings> {
        let settings: IngestSettings = self.get_or_default("ingest")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.search()?;
        self.ingest()?;
        Ok(())
    }
}

/// Weights of the term-frequency score.
///
/// `score = matched * coverage + sat(freq) * frequency + (all ? full_match_bonus : 0)`
/// where `sat(f) = f / (f + frequency_saturation)` stays below 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub coverage: f32,
    pub frequency: f32,
    pub full_match_bonus: f32,
    pub frequency_saturation: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self { coverage: 10.0, frequency: 5.0, full_match_bonus: 10.0, frequency_saturation: 4.0 }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("coverage", self.coverage),
            ("frequency", self.frequency),
            ("full_match_bonus", self.full_match_bonus),
            ("frequency_saturation", self.frequency_saturation),
        ];
        for (name, value) in all {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidConfig(format!("search.weights.{name} must be positive, got {value}")));
            }
        }
        // The frequency component is bounded by `frequency`; one more matched
        // term must always outweigh it.
        if self.frequency >= self.coverage {
            return Err(Error::InvalidConfig(format!(
                "search.weights.frequency ({}) must be below search.weights.coverage ({})",
                self.frequency, self.coverage
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzySettings {
    pub min_prefix_len: usize,
    pub discount: f32,
}

impl Default for FuzzySettings {
    fn default() -> Self {
        Self { min_prefix_len: 2, discount: 0.5 }
    }
}

impl FuzzySettings {
    pub fn validate(&self) -> Result<()> {
        if self.min_prefix_len == 0 {
            return Err(Error::InvalidConfig("search.fuzzy.min_prefix_len must be at least 1".into()));
        }
        if !(self.discount > 0.0 && self.discount <= 1.0) {
            return Err(Error::InvalidConfig(format!("search.fuzzy.discount must be in (0, 1], got {}", self.discount)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExactIndexSettings {
    pub enabled: bool,
    /// On-disk location; `None` keeps the index in memory.
    pub index_dir: Option<String>,
    pub writer_memory_bytes: usize,
}

impl Default for ExactIndexSettings {
    fn default() -> Self {
        Self { enabled: true, index_dir: None, writer_memory_bytes: 50_000_000 }
    }
}

impl ExactIndexSettings {
    pub fn resolved_index_dir(&self) -> Option<PathBuf> {
        self.index_dir.as_deref().map(expand_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_top_k: usize,
    pub weights: ScoringWeights,
    pub fuzzy: FuzzySettings,
    pub exact_index: ExactIndexSettings,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            weights: ScoringWeights::default(),
            fuzzy: FuzzySettings::default(),
            exact_index: ExactIndexSettings::default(),
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<()> {
        if self.default_top_k == 0 {
            return Err(Error::InvalidConfig("search.default_top_k must be at least 1".into()));
        }
        self.weights.validate()?;
        self.fuzzy.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub resources_dir: String,
    pub pattern: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            resources_dir: "./resources".to_string(),
            pattern: "**/*.llm".to_string(),
            chunk_size: 2000,
            chunk_overlap: 200,
        }
    }
}

impl IngestSettings {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("ingest.chunk_size must be at least 1".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "ingest.chunk_overlap ({}) must be below ingest.chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if let Err(e) = glob::Pattern::new(&self.pattern) {
            return Err(Error::InvalidConfig(format!("ingest.pattern '{}': {}", self.pattern, e)));
        }
        Ok(())
    }

    pub fn resolved_resources_dir(&self) -> PathBuf {
        expand_path(&self.resources_dir)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
