use anyhow::{bail, Result};
use docmentor_text_splitter::{SplitterConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use docmentor_vector_store::{StubEmbedder, DEFAULT_STORE_DIR};
use serde::Serialize;
use std::path::PathBuf;

pub const STORE_DIR_ENV: &str = "DOCMENTOR_STORE_DIR";
pub const CHUNK_SIZE_ENV: &str = "DOCMENTOR_CHUNK_SIZE";
pub const CHUNK_OVERLAP_ENV: &str = "DOCMENTOR_CHUNK_OVERLAP";
pub const EMBEDDING_DIM_ENV: &str = "DOCMENTOR_EMBEDDING_DIM";
pub const TOP_K_ENV: &str = "DOCMENTOR_TOP_K";

pub const DEFAULT_TOP_K: usize = 3;

/// Characters of each source passage shown next to an answer.
pub const SOURCE_PREVIEW_CHARS: usize = 200;

/// Effective settings: built-in defaults, then environment, then flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    pub store_dir: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_dim: usize,
    pub top_k: usize,
}

/// Values given on the command line; `None` keeps the lower layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub store_dir: Option<PathBuf>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub embedding_dim: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            embedding_dim: StubEmbedder::DEFAULT_DIMENSION,
            top_k: DEFAULT_TOP_K,
        }
    }
}

fn parse_usize(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads every setting through `lookup`; unset or unparsable values fall
    /// back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let store_dir = lookup(STORE_DIR_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map_or(defaults.store_dir, PathBuf::from);

        Self {
            store_dir,
            chunk_size: parse_usize(lookup(CHUNK_SIZE_ENV).as_deref(), defaults.chunk_size),
            chunk_overlap: parse_usize(
                lookup(CHUNK_OVERLAP_ENV).as_deref(),
                defaults.chunk_overlap,
            ),
            embedding_dim: parse_usize(
                lookup(EMBEDDING_DIM_ENV).as_deref(),
                defaults.embedding_dim,
            ),
            top_k: parse_usize(lookup(TOP_K_ENV).as_deref(), defaults.top_k),
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(dir) = &overrides.store_dir {
            self.store_dir = dir.clone();
        }
        if let Some(size) = overrides.chunk_size {
            self.chunk_size = size;
        }
        if let Some(overlap) = overrides.chunk_overlap {
            self.chunk_overlap = overlap;
        }
        if let Some(dim) = overrides.embedding_dim {
            self.embedding_dim = dim;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            bail!("embedding dimension must be > 0");
        }
        if let Err(message) = self.splitter_config().validate() {
            bail!("invalid chunking settings: {message}");
        }
        Ok(())
    }

    #[must_use]
    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig::new(self.chunk_size, self.chunk_overlap)
    }
}
