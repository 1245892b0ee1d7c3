use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Optional TOML configuration. Every value present here overrides the
/// matching command line argument.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub db_dir: Option<String>,
    pub read_pool_size: Option<usize>,

    pub search: Option<SearchConfig>,
    pub popularity: Option<PopularityConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// Search engine to use: "fts5" or "noop"
    pub engine: Option<String>,
    pub max_edit_distance: Option<usize>,
    pub title_weight: Option<f64>,
    pub body_weight: Option<f64>,
    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PopularityConfig {
    pub default_limit: Option<usize>,
    pub max_limit: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
