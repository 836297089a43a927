// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document frontmatter: a TOML block delimited by `+++` fences at the
//! top of a markdown/quarto document, used to override per-document
//! language-session settings (spec §4.C `getForDocument`).
//!
//! The spec leaves the frontmatter's concrete format unspecified (an
//! Open Question territory); since `toml` is already in the dependency
//! graph for `mrmd.md` manifests, frontmatter uses the same format
//! rather than pulling in a YAML parser for one additional concern.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("malformed frontmatter: unterminated fence")]
    UnterminatedFence,
    #[error("invalid TOML in frontmatter: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Parsed document frontmatter. Stores the raw TOML table so callers can
/// extract whatever language-specific keys they need without this crate
/// needing to know every language's override shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter(pub BTreeMap<String, toml::Value>);

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(toml::Value::as_str)
    }

    /// Look up a per-language override table, e.g. `[python]` /
    /// `[python.session]`.
    pub fn language_table(&self, language: &str) -> Option<&toml::value::Table> {
        self.get(language).and_then(toml::Value::as_table)
    }
}

const FENCE: &str = "+++";

/// Extract and parse the leading frontmatter block from a document's
/// content. Returns an empty `Frontmatter` (not an error) when the
/// document has no fence — most documents won't.
pub fn parse_frontmatter(content: &str) -> Result<Frontmatter, FrontmatterError> {
    let Some(rest) = content.strip_prefix(FENCE) else {
        return Ok(Frontmatter::default());
    };
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let Some(end) = rest.find(FENCE) else {
        return Err(FrontmatterError::UnterminatedFence);
    };
    let body = &rest[..end];
    let table: BTreeMap<String, toml::Value> = toml::from_str(body)?;
    Ok(Frontmatter(table))
}

#[cfg(test)]
#[path = "frontmatter_tests.rs"]
mod tests;
