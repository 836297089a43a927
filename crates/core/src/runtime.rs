// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime descriptor and session value types (spec §3, §4.C).
//!
//! A [`RuntimeDescriptor`] is static per-language configuration known at
//! compile/config time. A [`RuntimeSession`] is the record created once the
//! Runtime Registry actually spawns (or adopts) a language-server child.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A language key such as `python`, `node`, `julia`, `pty`. Case-sensitive,
/// always the descriptor's canonical form (never an alias).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageKey(pub String);

impl LanguageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LanguageKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The unique name of a runtime session: `{project}:{language}:{sessionName}`.
///
/// `:` and `/` in any component are substituted with `-` before the name is
/// used as a filename, per spec §3. The sanitized form is what gets
/// persisted and what serves as the primary key — two logically distinct
/// inputs that sanitize to the same string collide by design (callers are
/// expected to keep session names filesystem-safe).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionName(String);

impl SessionName {
    pub fn new(project: &str, language: &str, session_name: &str) -> Self {
        let raw = format!("{project}:{language}:{session_name}");
        Self(sanitize(&raw))
    }

    /// Build from an already-composed raw name, sanitizing it the same way.
    pub fn from_raw(raw: &str) -> Self {
        Self(sanitize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The filename this session's registry mirror is stored under.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == ':' || c == '/' { '-' } else { c })
        .collect()
}

/// Default startup timeout for a language runtime, per spec §4.C.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
/// Julia's JIT makes its cold start much slower than other runtimes.
pub const JULIA_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// How to locate and invoke the language's interpreter process.
#[derive(Debug, Clone)]
pub enum ExecutableResolution {
    /// A direct executable path plus argv, resolved at spawn time.
    Direct { executable: PathBuf, args: Vec<String> },
    /// A wrapped invocation through a package-runner tool (e.g. `npx`,
    /// `uvx`) that differs between development and packaged builds.
    Wrapped { runner: PathBuf, args: Vec<String> },
}

/// Result of a descriptor's availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResult {
    pub available: bool,
    pub reason: Option<String>,
}

impl ValidateResult {
    pub fn ok() -> Self {
        Self { available: true, reason: None }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self { available: false, reason: Some(reason.into()) }
    }
}

/// Static per-language configuration (spec §3).
///
/// The resolver, pre-start action, and validator are supplied by the
/// adapter layer as trait objects — `magent-core` only carries the value
/// types, not the behavior, so this crate stays free of process/filesystem
/// dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeDescriptor {
    pub language: LanguageKey,
    pub aliases: Vec<String>,
    #[serde(with = "duration_millis")]
    pub startup_timeout: Duration,
    pub env_overlay: HashMap<String, String>,
    pub cwd_override: Option<PathBuf>,
}

impl RuntimeDescriptor {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: LanguageKey::new(language),
            aliases: Vec::new(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            env_overlay: HashMap::new(),
            cwd_override: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// True if `key` names this descriptor directly or via an alias.
    pub fn matches(&self, key: &str) -> bool {
        self.language.as_str() == key || self.aliases.iter().any(|a| a == key)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// A live (or adopted) runtime session record (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSession {
    pub name: String,
    pub language: LanguageKey,
    pub pid: u32,
    pub port: u16,
    pub cwd: PathBuf,
    pub venv_path: Option<PathBuf>,
    pub started_at_ms: u64,
    #[serde(default)]
    pub alive: bool,
    /// Optional extra fields contributed by the descriptor (e.g. `wsUrl` for PTY).
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl RuntimeSession {
    /// Base URL per spec §3: `http://127.0.0.1:{port}/mrp/v1`.
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/mrp/v1", self.port)
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
