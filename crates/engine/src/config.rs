use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

const DEFAULT_TEMP_PREFIX: &str = "__reorder_tmp_";
const DEFAULT_UNDO_DEPTH: usize = 100;
const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];
const DEFAULT_NORMALIZE_EXTENSIONS: &[&str] = &["jpg", "jpeg"];
const DEFAULT_NORMALIZED_EXTENSION: &str = "jpg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Prefix of the names that hold a file while a rename cycle is broken.
    pub temp_prefix: String,
    pub undo_depth: usize,
    /// Extensions (case-insensitive) that belong to a collection. Empty
    /// accepts every file.
    pub allowed_extensions: Vec<String>,
    /// Extensions renumbering picks up. Any other allowed file blocks it.
    pub normalize_extensions: Vec<String>,
    /// Extension every renumbered file ends up with.
    pub normalized_extension: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            undo_depth: DEFAULT_UNDO_DEPTH,
            allowed_extensions: to_strings(DEFAULT_EXTENSIONS),
            normalize_extensions: to_strings(DEFAULT_NORMALIZE_EXTENSIONS),
            normalized_extension: DEFAULT_NORMALIZED_EXTENSION.to_string(),
        }
    }
}

impl EngineConfig {
    /// Read a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let prefix = &self.temp_prefix;
        if prefix.is_empty() {
            return Err(EngineError::Config("temp_prefix must not be empty".into()));
        }
        // A prefix starting with a digit could produce a positional name.
        if prefix.starts_with(|c: char| c.is_ascii_digit()) || prefix.contains(['/', '\\']) {
            return Err(EngineError::Config(format!("unusable temp_prefix: {prefix}")));
        }
        let ext = &self.normalized_extension;
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(EngineError::Config(format!("unusable normalized_extension: {ext:?}")));
        }
        if !has_extension(&self.normalize_extensions, &format!("x.{ext}")) {
            return Err(EngineError::Config(format!(
                "normalized_extension {ext} is missing from normalize_extensions"
            )));
        }
        Ok(())
    }

    pub fn accepts(&self, filename: &str) -> bool {
        self.allowed_extensions.is_empty() || has_extension(&self.allowed_extensions, filename)
    }

    /// True for files renumbering renames.
    pub fn normalizes(&self, filename: &str) -> bool {
        has_extension(&self.normalize_extensions, filename)
    }

    pub fn filter_listing(&self, listing: Vec<String>) -> Vec<String> {
        self.partition_listing(listing).0
    }

    /// Split a listing into accepted and excluded names.
    pub fn partition_listing(&self, listing: Vec<String>) -> (Vec<String>, Vec<String>) {
        listing.into_iter().partition(|name| self.accepts(name))
    }
}

fn has_extension(extensions: &[String], filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
