// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project discovery and per-document language resolution for the
//! Machine Agent's hub mode (spec §4.G).
//!
//! This crate never spawns anything — it only walks the filesystem, reads
//! `mrmd.md` manifests and document frontmatter, and decides *which*
//! language a document should run under. `magent-engine`'s Runtime
//! Registry takes the resolution this crate produces and turns it into a
//! live session.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod discovery;
pub mod frontmatter;
pub mod project;
pub mod resolve;

pub use discovery::{discover_projects, enumerate_documents, ProjectDir};
pub use frontmatter::{parse_frontmatter, Frontmatter, FrontmatterError};
pub use project::{LanguageConfig, ProjectConfig, ProjectConfigError, MANIFEST_FILE_NAME};
pub use resolve::{resolve_session_name, DocumentLanguageResolution};
