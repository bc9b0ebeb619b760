// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Overtext and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Engine tunables.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is a valid
//! configuration. Unknown fields are rejected to catch typos.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_DEBOUNCE_MS: u64 = 150;
pub const DEFAULT_MAX_DEPTH: usize = 5;
pub const DEFAULT_MAX_SELECTOR_LEN: usize = 512;
pub const DEFAULT_MAX_ATTR_VALUE_LEN: usize = 100;
pub const DEFAULT_MAX_CLASS_TOKENS: usize = 2;
pub const DEFAULT_MASK_STYLE_ID: &str = "overtext-mask-style";
pub const DEFAULT_REVEAL_CLASS: &str = "ot-unhide";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Quiet period after the first mutation of a burst before a reconciliation pass runs.
    pub debounce_ms: u64,
    pub max_depth: usize,
    pub max_selector_len: usize,
    pub max_attr_value_len: usize,
    pub max_class_tokens: usize,
    pub stable_attr_prefixes: Vec<String>,
    pub mask_style_id: String,
    pub reveal_class: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_selector_len: DEFAULT_MAX_SELECTOR_LEN,
            max_attr_value_len: DEFAULT_MAX_ATTR_VALUE_LEN,
            max_class_tokens: DEFAULT_MAX_CLASS_TOKENS,
            stable_attr_prefixes: vec!["data-".to_owned(), "aria-".to_owned()],
            mask_style_id: DEFAULT_MASK_STYLE_ID.to_owned(),
            reveal_class: DEFAULT_REVEAL_CLASS.to_owned(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".to_owned()));
        }
        if self.mask_style_id.trim().is_empty() {
            return Err(ConfigError::Invalid("mask_style_id must not be empty".to_owned()));
        }
        if self.reveal_class.split_ascii_whitespace().count() != 1 {
            return Err(ConfigError::Invalid(
                "reveal_class must be a single class token".to_owned(),
            ));
        }
        if self.stable_attr_prefixes.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::Invalid(
                "stable_attr_prefixes must not contain empty prefixes".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn synthesis(&self) -> SynthesisConfig {
        SynthesisConfig {
            max_depth: self.max_depth,
            max_selector_len: self.max_selector_len,
            max_attr_value_len: self.max_attr_value_len,
            max_class_tokens: self.max_class_tokens,
            stable_attr_prefixes: self.stable_attr_prefixes.clone(),
        }
    }
}

/// The subset of [`EngineConfig`] the selector synthesizer reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisConfig {
    pub max_depth: usize,
    pub max_selector_len: usize,
    pub max_attr_value_len: usize,
    pub max_class_tokens: usize,
    pub stable_attr_prefixes: Vec<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        EngineConfig::default().synthesis()
    }
}
