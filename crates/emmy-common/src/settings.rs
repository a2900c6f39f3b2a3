//! Read-only settings consumed by the inference engine.
//!
//! Settings are loaded once by the host (from JSON, usually a project file)
//! and passed by reference into every inference request.

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use std::path::Path;

fn default_require_like() -> Vec<String> {
    vec!["require".to_string()]
}

fn default_constructor_names() -> Vec<String> {
    vec!["new".to_string(), "get".to_string()]
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSettings {
    #[serde(default = "default_require_like")]
    require_like_functions: Vec<String>,
    #[serde(default = "default_constructor_names")]
    constructor_names: Vec<String>,
    #[serde(default = "default_true")]
    recognize_global_name_as_type: bool,
}

/// Inference settings.
///
/// | Key | Default | Effect |
/// |-----|---------|--------|
/// | `requireLikeFunctions` | `["require"]` | calls resolving to another file's export type |
/// | `constructorNames` | `["new", "get"]` | `A.new()` also yields `A`'s own type |
/// | `recognizeGlobalNameAsType` | `true` | bare global `Foo` is also the class `Foo` |
#[derive(Debug, Clone)]
pub struct Settings {
    require_like: FxHashSet<String>,
    constructor_names: FxHashSet<String>,
    pub recognize_global_name_as_type: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_raw(RawSettings {
            require_like_functions: default_require_like(),
            constructor_names: default_constructor_names(),
            recognize_global_name_as_type: true,
        })
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Self {
        Self {
            require_like: raw.require_like_functions.into_iter().collect(),
            constructor_names: raw.constructor_names.into_iter().collect(),
            recognize_global_name_as_type: raw.recognize_global_name_as_type,
        }
    }

    /// Parse settings from a JSON document. Missing keys take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawSettings =
            serde_json::from_str(text).context("failed to parse inference settings")?;
        Ok(Self::from_raw(raw))
    }

    /// Load settings from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn with_require_like(mut self, name: &str) -> Self {
        self.require_like.insert(name.to_string());
        self
    }

    pub fn with_constructor_name(mut self, name: &str) -> Self {
        self.constructor_names.insert(name.to_string());
        self
    }

    pub fn with_global_name_as_type(mut self, enabled: bool) -> Self {
        self.recognize_global_name_as_type = enabled;
        self
    }

    #[inline]
    pub fn is_require_like(&self, name: &str) -> bool {
        self.require_like.contains(name)
    }

    #[inline]
    pub fn is_constructor_name(&self, name: &str) -> bool {
        self.constructor_names.contains(name)
    }
}

#[cfg(test)]
#[path = "../tests/settings_tests.rs"]
mod tests;
