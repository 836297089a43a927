// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-document session name resolution (spec §4.C `getForDocument` /
//! `getForDocumentLanguage`).
//!
//! Precedence, most specific first: document frontmatter `[language]
//! session = "..."` overrides the project manifest's `[language] session
//! = "..."`, which overrides the default session name `"default"`.
//! `autoStart` resolves the same way, defaulting to `true` — hub mode
//! exists precisely so documents come online without a human clicking
//! anything.

use magent_core::{LanguageKey, SessionName};

use crate::frontmatter::Frontmatter;
use crate::project::ProjectConfig;

/// The outcome of resolving one `(language, document)` pair: the fully
/// qualified session name to request from the Runtime Registry, and
/// whether the registry should auto-start it if not already running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLanguageResolution {
    pub session_name: SessionName,
    pub auto_start: bool,
}

/// Resolve the session name and auto-start policy for `language` on
/// `doc_path` within `project_name`, given the project's manifest config
/// and the document's own frontmatter.
pub fn resolve_session_name(
    project_name: &str,
    language: &LanguageKey,
    project_config: &ProjectConfig,
    frontmatter: &Frontmatter,
) -> DocumentLanguageResolution {
    let project_lang = project_config.language(language.as_str());
    let doc_lang = frontmatter.language_table(language.as_str());

    let session = doc_lang
        .and_then(|t| t.get("session"))
        .and_then(toml::Value::as_str)
        .map(str::to_string)
        .or(project_lang.session)
        .unwrap_or_else(|| "default".to_string());

    let auto_start = doc_lang
        .and_then(|t| t.get("autoStart"))
        .and_then(toml::Value::as_bool)
        .or(project_lang.auto_start)
        .unwrap_or(true);

    DocumentLanguageResolution {
        session_name: SessionName::new(project_name, language.as_str(), &session),
        auto_start,
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
