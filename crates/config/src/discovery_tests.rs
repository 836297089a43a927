// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn touch(path: &Path) {
    std::fs::write(path, "").unwrap();
}

#[test]
fn discovers_child_directories_with_manifest() {
    let root = tempfile::tempdir().unwrap();
    let proj_a = root.path().join("proj-a");
    std::fs::create_dir(&proj_a).unwrap();
    touch(&proj_a.join(MANIFEST_FILE_NAME));
    let no_manifest = root.path().join("proj-b");
    std::fs::create_dir(&no_manifest).unwrap();

    let projects = discover_projects(&[root.path().to_path_buf()]);
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "proj-a");
}

#[test]
fn root_itself_can_be_a_project() {
    let root = tempfile::tempdir().unwrap();
    touch(&root.path().join(MANIFEST_FILE_NAME));

    let projects = discover_projects(&[root.path().to_path_buf()]);
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].path, root.path());
}

#[test]
fn missing_root_is_skipped_not_fatal() {
    let projects = discover_projects(&[PathBuf::from("/no/such/hub/root")]);
    assert!(projects.is_empty());
}

#[test]
fn enumerate_documents_skips_junk_directories() {
    let dir = tempfile::tempdir().unwrap();
    touch(&dir.path().join("notes.md"));
    touch(&dir.path().join("report.qmd"));
    touch(&dir.path().join("ignored.txt"));
    std::fs::create_dir(dir.path().join("node_modules")).unwrap();
    touch(&dir.path().join("node_modules").join("leaf.md"));
    std::fs::create_dir(dir.path().join(".venv")).unwrap();
    touch(&dir.path().join(".venv").join("leaf.md"));
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    touch(&dir.path().join("sub").join("nested.md"));

    let docs = enumerate_documents(dir.path());
    assert_eq!(docs, vec!["notes", "report", "sub/nested"]);
}
