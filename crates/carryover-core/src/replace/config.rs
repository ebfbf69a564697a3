//! File-based configuration for a [`ReplaceEngine`].
//!
//! ```toml
//! tags = ["TODO", "NOTE"]
//! mode = "MAP_OR_DEFAULT"
//! default = "teamlead"
//!
//! [mapping]
//! alice = "external-alice"
//!
//! [paths]
//! include = ["**/*.cc", "**/*.h"]
//! exclude = ["third_party/**"]
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::engine::{ReplaceEngine, DEFAULT_TAG};
use super::error::{ReplaceError, ReplaceResult};
use super::mode::ReplaceMode;
use crate::paths::GlobMatcher;

fn default_tags() -> Vec<String> {
    vec![DEFAULT_TAG.to_string()]
}

/// Glob lists selecting the files an engine touches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Serializable replace engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaceConfig {
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mode: ReplaceMode,
    #[serde(default)]
    pub mapping: IndexMap<String, String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Default for ReplaceConfig {
    fn default() -> Self {
        Self {
            tags: default_tags(),
            mode: ReplaceMode::default(),
            mapping: IndexMap::new(),
            default: None,
            paths: PathsConfig::default(),
        }
    }
}

impl ReplaceConfig {
    pub fn from_toml_str(text: &str) -> ReplaceResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> ReplaceResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ReplaceError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Validate and build the engine.
    pub fn build(&self) -> ReplaceResult<ReplaceEngine> {
        let mut builder = ReplaceEngine::builder()
            .tags(self.tags.iter().cloned())
            .mode(self.mode)
            .mapping(self.mapping.clone());
        if let Some(default) = &self.default {
            builder = builder.default_value(default.clone());
        }
        if !self.paths.include.is_empty() || !self.paths.exclude.is_empty() {
            builder = builder.paths(GlobMatcher::new(&self.paths.include, &self.paths.exclude)?);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ReplaceConfig::from_toml_str("").unwrap();
        assert_eq!(config, ReplaceConfig::default());
        let engine = config.build().unwrap();
        assert_eq!(engine.tags(), ["TODO"]);
        assert_eq!(engine.mode(), ReplaceMode::Mapping);
    }

    #[test]
    fn full_document() {
        let config = ReplaceConfig::from_toml_str(
            r#"
            tags = ["TODO", "NOTE"]
            mode = "MAP_OR_DEFAULT"
            default = "TEST"

            [mapping]
            zed = "z"
            aaa = "foo"

            [paths]
            include = ["**/*.cc"]
            exclude = ["third_party/**"]
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, ReplaceMode::MapOrDefault);
        let keys: Vec<_> = config.mapping.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zed", "aaa"]);

        let engine = config.build().unwrap();
        assert!(engine.in_scope(Path::new("src/a.cc")));
        assert!(!engine.in_scope(Path::new("src/a.txt")));
        assert!(!engine.in_scope(Path::new("third_party/a.cc")));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ReplaceConfig::from_toml_str("tagz = [\"TODO\"]").unwrap_err();
        assert!(matches!(err, ReplaceError::ConfigParse(_)));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(ReplaceConfig::from_toml_str("mode = \"REPLACE\"").is_err());
    }

    #[test]
    fn validation_runs_on_build() {
        let config = ReplaceConfig::from_toml_str("mode = \"USE_DEFAULT\"").unwrap();
        let err = config.build().unwrap_err();
        assert_eq!(err.to_string(), "'default' needs to be set for mode 'USE_DEFAULT'");
    }

    #[test]
    fn bad_glob_is_reported() {
        let config = ReplaceConfig::from_toml_str("[paths]\ninclude = [\"a[\"]").unwrap();
        assert!(matches!(config.build().unwrap_err(), ReplaceError::Glob(_)));
    }
}
