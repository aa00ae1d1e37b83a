//! Query-layer limits.
//!
//! Precedence: env > file > defaults. The struct is passed explicitly to the
//! executor and cursor registry; nothing here is global.

use std::path::Path;

use serde::Deserialize;

use crate::errors::DbError;

pub const DEFAULT_MAX_SORT_KEYS: usize = 32;
pub const DEFAULT_MAX_PATH_DEPTH: usize = 32;
pub const DEFAULT_BATCH_SIZE: usize = 101;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Upper bound on keys in a sort document.
    pub max_sort_keys: usize,
    /// Upper bound on segments in a dotted path.
    pub max_path_depth: usize,
    /// Batch size used when a request does not name one.
    pub default_batch_size: usize,
    pub max_batch_size: usize,
    /// Fixed starting point for cursor IDs; random when unset.
    pub cursor_id_seed: Option<u32>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_sort_keys: DEFAULT_MAX_SORT_KEYS,
            max_path_depth: DEFAULT_MAX_PATH_DEPTH,
            default_batch_size: DEFAULT_BATCH_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            cursor_id_seed: None,
        }
    }
}

impl QueryConfig {
    /// # Errors
    /// Returns `Config` when the TOML is malformed or a limit is invalid.
    pub fn from_toml_str(s: &str) -> Result<Self, DbError> {
        let cfg: Self = toml::from_str(s).map_err(|e| DbError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads `path` (defaults if it does not exist) and applies environment overrides.
    ///
    /// # Errors
    /// Returns `Io` if the file exists but cannot be read, `Config` if it is invalid.
    pub fn load(path: &Path) -> Result<Self, DbError> {
        Self::load_with(path, |k| std::env::var(k).ok())
    }

    /// [`QueryConfig::load`] with overrides taken from `lookup` instead of the environment.
    ///
    /// # Errors
    /// See [`QueryConfig::load`].
    pub fn load_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DbError> {
        let mut cfg = if path.exists() {
            Self::from_toml_str(&std::fs::read_to_string(path)?)?
        } else {
            Self::default()
        };
        cfg.apply_overrides(lookup)?;
        Ok(cfg)
    }

    /// Applies `NEXUSQUERY_MAX_SORT_KEYS`, `NEXUSQUERY_MAX_PATH_DEPTH` and
    /// `NEXUSQUERY_BATCH_SIZE` from the process environment.
    ///
    /// # Errors
    /// Returns `Config` when a variable is set but not a valid limit.
    pub fn apply_env(&mut self) -> Result<(), DbError> {
        self.apply_overrides(|k| std::env::var(k).ok())
    }

    /// Applies overrides from an arbitrary lookup.
    ///
    /// # Errors
    /// See [`QueryConfig::apply_env`].
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), DbError> {
        let parse = |key: &str| -> Result<Option<usize>, DbError> {
            lookup(key)
                .map(|s| s.trim().parse::<usize>().map_err(|e| DbError::Config(format!("{key}={s}: {e}"))))
                .transpose()
        };
        if let Some(n) = parse("NEXUSQUERY_MAX_SORT_KEYS")? {
            self.max_sort_keys = n;
        }
        if let Some(n) = parse("NEXUSQUERY_MAX_PATH_DEPTH")? {
            self.max_path_depth = n;
        }
        if let Some(n) = parse("NEXUSQUERY_BATCH_SIZE")? {
            self.default_batch_size = n;
        }
        self.validate()
    }

    /// # Errors
    /// Returns `Config` for zero limits or a default batch above the maximum.
    pub fn validate(&self) -> Result<(), DbError> {
        if self.max_sort_keys == 0 || self.max_path_depth == 0 {
            return Err(DbError::Config("max_sort_keys and max_path_depth must be positive".into()));
        }
        if self.default_batch_size == 0 || self.default_batch_size > self.max_batch_size {
            return Err(DbError::Config(format!(
                "default_batch_size {} must be in 1..={}",
                self.default_batch_size, self.max_batch_size
            )));
        }
        Ok(())
    }
}
