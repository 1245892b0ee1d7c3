mod file_config;

pub use file_config::{FileConfig, PopularityConfig, SearchConfig};

use crate::catalog_store::DEFAULT_READ_POOL_SIZE;
use crate::search::SearchTuning;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SearchEngine {
    /// SQLite FTS5 with vocabulary-based typo correction.
    #[default]
    Fts5,
    /// Indexes nothing, every search is empty.
    Noop,
}

fn parse_search_engine(s: &str) -> Option<SearchEngine> {
    SearchEngine::from_str(s, true).ok()
}

/// CLI arguments that take part in config resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub search_engine: Option<SearchEngine>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub read_pool_size: usize,
    pub search: SearchSettings,
    pub popularity: PopularitySettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub engine: SearchEngine,
    pub max_edit_distance: usize,
    pub title_weight: f64,
    pub body_weight: f64,
    /// Cap on hits returned by one search.
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        let tuning = SearchTuning::default();
        SearchSettings {
            engine: SearchEngine::default(),
            max_edit_distance: tuning.max_edit_distance,
            title_weight: tuning.title_weight,
            body_weight: tuning.body_weight,
            max_results: 50,
        }
    }
}

impl SearchSettings {
    pub fn tuning(&self) -> SearchTuning {
        SearchTuning {
            max_edit_distance: self.max_edit_distance,
            title_weight: self.title_weight,
            body_weight: self.body_weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopularitySettings {
    /// Page size used when the caller does not pass one.
    pub default_limit: usize,
    /// Larger page sizes are clamped to this.
    pub max_limit: usize,
}

impl Default for PopularitySettings {
    fn default() -> Self {
        PopularitySettings {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let read_pool_size = file.read_pool_size.unwrap_or(DEFAULT_READ_POOL_SIZE);
        if read_pool_size == 0 {
            bail!("read_pool_size must be at least 1");
        }

        let search_file = file.search.unwrap_or_default();
        let engine = match search_file.engine {
            Some(name) => parse_search_engine(&name)
                .ok_or_else(|| anyhow::anyhow!("Unknown search engine '{}'", name))?,
            None => cli.search_engine.unwrap_or_default(),
        };
        let defaults = SearchSettings::default();
        let search = SearchSettings {
            engine,
            max_edit_distance: search_file
                .max_edit_distance
                .unwrap_or(defaults.max_edit_distance),
            title_weight: search_file.title_weight.unwrap_or(defaults.title_weight),
            body_weight: search_file.body_weight.unwrap_or(defaults.body_weight),
            max_results: search_file.max_results.unwrap_or(defaults.max_results),
        };
        if search.title_weight <= 0.0 || search.body_weight <= 0.0 {
            bail!("Search weights must be positive");
        }
        if search.max_results == 0 {
            bail!("search.max_results must be at least 1");
        }

        let popularity_file = file.popularity.unwrap_or_default();
        let defaults = PopularitySettings::default();
        let popularity = PopularitySettings {
            default_limit: popularity_file
                .default_limit
                .unwrap_or(defaults.default_limit),
            max_limit: popularity_file.max_limit.unwrap_or(defaults.max_limit),
        };
        if popularity.max_limit == 0 {
            bail!("popularity.max_limit must be at least 1");
        }
        if popularity.default_limit > popularity.max_limit {
            bail!(
                "popularity.default_limit ({}) exceeds popularity.max_limit ({})",
                popularity.default_limit,
                popularity.max_limit
            );
        }

        Ok(AppConfig {
            db_dir,
            read_pool_size,
            search,
            popularity,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }

    pub fn search_db_path(&self) -> PathBuf {
        self.db_dir.join("search.db")
    }
}
