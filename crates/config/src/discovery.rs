// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem discovery of projects and documents under a hub root
//! (spec §4.G steps 1 and 5).

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::project::MANIFEST_FILE_NAME;

/// A project directory discovered under a hub root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDir {
    /// Stable name used as the catalog/bridge key, derived from the
    /// directory's file name.
    pub name: String,
    pub path: PathBuf,
}

const SKIPPED_DIR_NAMES: [&str; 3] = ["node_modules", ".venv", "__pycache__"];

fn is_project_root(dir: &Path) -> bool {
    dir.join(MANIFEST_FILE_NAME).is_file()
}

/// Enumerate projects under a list of hub roots (spec §4.G.1).
///
/// A root is itself a project if it carries a manifest; otherwise each
/// immediate child directory carrying a manifest is a project. Roots that
/// don't exist are skipped with a logged warning rather than aborting the
/// whole scan — one misconfigured root should not stop the rest.
pub fn discover_projects(roots: &[PathBuf]) -> Vec<ProjectDir> {
    let mut projects = Vec::new();
    for root in roots {
        if !root.exists() {
            tracing::warn!(root = %root.display(), "hub root does not exist, skipping");
            continue;
        }
        if is_project_root(root) {
            if let Some(name) = root.file_name().and_then(|n| n.to_str()) {
                projects.push(ProjectDir { name: name.to_string(), path: root.clone() });
            }
            continue;
        }
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(source) => {
                tracing::warn!(root = %root.display(), error = %source, "failed to read hub root");
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if !is_project_root(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                projects.push(ProjectDir { name: name.to_string(), path });
            }
        }
    }
    projects
}

/// Enumerate `.md`/`.qmd` documents under a project directory, returning
/// each as a `docPath` with the extension stripped (spec §4.G.5).
///
/// Skips dotfiles/dot-directories and the usual language-tooling junk
/// drawers (`node_modules`, `.venv`, `__pycache__`).
pub fn enumerate_documents(project_dir: &Path) -> Vec<String> {
    let mut docs = Vec::new();
    let walker = WalkDir::new(project_dir).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        if entry.depth() == 0 {
            return true;
        }
        if name.starts_with('.') {
            return false;
        }
        if entry.file_type().is_dir() && SKIPPED_DIR_NAMES.contains(&name.as_ref()) {
            return false;
        }
        true
    });
    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_doc = matches!(path.extension().and_then(|e| e.to_str()), Some("md") | Some("qmd"));
        if !is_doc {
            continue;
        }
        let Ok(relative) = path.strip_prefix(project_dir) else { continue };
        let stripped = relative.with_extension("");
        docs.push(stripped.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"));
    }
    docs.sort();
    docs
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
