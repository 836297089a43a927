// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project-level configuration: the `mrmd.md` manifest's frontmatter,
//! merged with built-in defaults (spec §4.C `getForDocument`).

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::frontmatter::{parse_frontmatter, FrontmatterError};

pub const MANIFEST_FILE_NAME: &str = "mrmd.md";

#[derive(Debug, Error)]
pub enum ProjectConfigError {
    #[error("failed to read manifest {path}: {source}")]
    Io { path: std::path::PathBuf, #[source] source: std::io::Error },
    #[error(transparent)]
    Frontmatter(#[from] FrontmatterError),
}

/// Per-language overrides a project manifest can declare, e.g.:
///
/// ```toml
/// [python]
/// session = "shared"
/// autoStart = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageConfig {
    pub session: Option<String>,
    pub auto_start: Option<bool>,
}

impl LanguageConfig {
    fn from_table(table: &toml::value::Table) -> Self {
        Self {
            session: table.get("session").and_then(toml::Value::as_str).map(str::to_string),
            auto_start: table.get("autoStart").and_then(toml::Value::as_bool),
        }
    }
}

/// A project's resolved configuration, merging `mrmd.md` frontmatter over
/// built-in defaults. Language keys are whatever the manifest declares
/// sections for; languages the manifest is silent on fall back entirely
/// to defaults at the resolve layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    pub languages: BTreeMap<String, LanguageConfig>,
}

impl ProjectConfig {
    /// Load and parse a project's `mrmd.md` manifest. A missing manifest
    /// (project root itself serves as the manifest) yields defaults, not
    /// an error — discovery already verified the manifest file exists
    /// before calling in, but tests may call this directly.
    pub fn load(project_root: &Path) -> Result<Self, ProjectConfigError> {
        let manifest_path = project_root.join(MANIFEST_FILE_NAME);
        let content = match std::fs::read_to_string(&manifest_path) {
            Ok(content) => content,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ProjectConfigError::Io { path: manifest_path, source }),
        };
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ProjectConfigError> {
        let frontmatter = parse_frontmatter(content)?;
        let mut languages = BTreeMap::new();
        for (key, value) in &frontmatter.0 {
            if let Some(table) = value.as_table() {
                languages.insert(key.clone(), LanguageConfig::from_table(table));
            }
        }
        Ok(Self { languages })
    }

    pub fn language(&self, key: &str) -> LanguageConfig {
        self.languages.get(key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
