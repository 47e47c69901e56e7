// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Repository configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CimError, CimResult};
use crate::streamer::Encoding;

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One directory per namespace under `root`
    #[default]
    File,
    /// `root/repository.db`
    Sqlite,
}

impl std::str::FromStr for Backend {
    type Err = CimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(Backend::File),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(CimError::Config(format!("unknown backend '{}'", other))),
        }
    }
}

/// File name of the SQLite database inside the repository root.
pub const SQLITE_FILE_NAME: &str = "repository.db";

/// Repository configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// On-disk location of the repository
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default)]
    pub backend: Backend,

    /// Encoding for newly written object bodies
    #[serde(default)]
    pub encoding: Encoding,

    /// Persist resolved classes instead of local definitions
    #[serde(default)]
    pub store_complete_classes: bool,

    /// Resolved class LRU capacity (0 disables the cache)
    #[serde(default = "default_class_cache_size")]
    pub class_cache_size: usize,

    /// Qualifier declaration LRU capacity (0 disables the cache)
    #[serde(default = "default_qualifier_cache_size")]
    pub qualifier_cache_size: usize,

    /// Host written into association result paths (empty: none)
    #[serde(default)]
    pub host_name: String,
}

fn default_root() -> PathBuf {
    PathBuf::from("./repository")
}

fn default_class_cache_size() -> usize {
    128
}

fn default_qualifier_cache_size() -> usize {
    80
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            backend: Backend::default(),
            encoding: Encoding::default(),
            store_complete_classes: false,
            class_cache_size: default_class_cache_size(),
            qualifier_cache_size: default_qualifier_cache_size(),
            host_name: String::new(),
        }
    }
}

impl RepositoryConfig {
    /// Create a new config builder
    pub fn builder() -> RepositoryConfigBuilder {
        RepositoryConfigBuilder::default()
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CimResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CimError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> CimResult<Self> {
        let config: RepositoryConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> CimResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(CimError::Config("root cannot be empty".into()));
        }
        if self.host_name.contains('/') {
            return Err(CimError::Config(format!(
                "host_name '{}' cannot contain '/'",
                self.host_name
            )));
        }
        Ok(())
    }

    /// Location of the SQLite database for the sqlite backend.
    pub fn sqlite_path(&self) -> PathBuf {
        self.root.join(SQLITE_FILE_NAME)
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct RepositoryConfigBuilder {
    root: Option<PathBuf>,
    backend: Option<Backend>,
    encoding: Option<Encoding>,
    store_complete_classes: Option<bool>,
    class_cache_size: Option<usize>,
    qualifier_cache_size: Option<usize>,
    host_name: Option<String>,
}

impl RepositoryConfigBuilder {
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Persist resolved classes (default: false)
    pub fn store_complete_classes(mut self, enabled: bool) -> Self {
        self.store_complete_classes = Some(enabled);
        self
    }

    pub fn class_cache_size(mut self, size: usize) -> Self {
        self.class_cache_size = Some(size);
        self
    }

    pub fn qualifier_cache_size(mut self, size: usize) -> Self {
        self.qualifier_cache_size = Some(size);
        self
    }

    pub fn host_name(mut self, host: impl Into<String>) -> Self {
        self.host_name = Some(host.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> RepositoryConfig {
        let defaults = RepositoryConfig::default();

        RepositoryConfig {
            root: self.root.unwrap_or(defaults.root),
            backend: self.backend.unwrap_or(defaults.backend),
            encoding: self.encoding.unwrap_or(defaults.encoding),
            store_complete_classes: self
                .store_complete_classes
                .unwrap_or(defaults.store_complete_classes),
            class_cache_size: self.class_cache_size.unwrap_or(defaults.class_cache_size),
            qualifier_cache_size: self
                .qualifier_cache_size
                .unwrap_or(defaults.qualifier_cache_size),
            host_name: self.host_name.unwrap_or(defaults.host_name),
        }
    }
}
