// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in language descriptors (spec §3, §4.C): python, node, julia, pty.
//!
//! Each descriptor only carries the static configuration
//! (`magent_core::RuntimeDescriptor`); resolving an executable and
//! validating availability are exposed as free functions here so the
//! engine can call them without this crate depending on the registry.

use magent_core::runtime::{ExecutableResolution, ValidateResult, JULIA_STARTUP_TIMEOUT};
use magent_core::RuntimeDescriptor;
use std::collections::HashMap;
use std::path::PathBuf;

pub fn python_descriptor() -> RuntimeDescriptor {
    RuntimeDescriptor::new("python").with_alias("py").with_alias("python3")
}

pub fn node_descriptor() -> RuntimeDescriptor {
    RuntimeDescriptor::new("node").with_alias("js").with_alias("javascript")
}

pub fn julia_descriptor() -> RuntimeDescriptor {
    RuntimeDescriptor::new("julia").with_startup_timeout(JULIA_STARTUP_TIMEOUT)
}

pub fn pty_descriptor() -> RuntimeDescriptor {
    RuntimeDescriptor::new("pty").with_alias("terminal").with_alias("shell")
}

pub fn builtin_descriptors() -> Vec<RuntimeDescriptor> {
    vec![python_descriptor(), node_descriptor(), julia_descriptor(), pty_descriptor()]
}

/// Resolve how to invoke a language's interpreter. Dev builds shell out
/// through a package-runner (`uvx`, `npx`); packaged builds use a bundled
/// direct executable if one is found alongside the current binary.
pub fn resolve_executable(language: &str, packaged: bool, bundle_dir: &PathBuf) -> ExecutableResolution {
    if packaged {
        let direct = bundle_dir.join(language);
        if direct.exists() {
            return ExecutableResolution::Direct { executable: direct, args: Vec::new() };
        }
    }
    match language {
        "python" => ExecutableResolution::Wrapped {
            runner: PathBuf::from("uvx"),
            args: vec!["--from".into(), "mrmd-runtime-python".into(), "mrmd-runtime-python".into()],
        },
        "node" => ExecutableResolution::Wrapped {
            runner: PathBuf::from("npx"),
            args: vec!["--yes".into(), "@mrmd/runtime-node".into()],
        },
        "julia" => ExecutableResolution::Wrapped {
            runner: PathBuf::from("julia"),
            args: vec!["--project=@mrmd".into()],
        },
        _ => ExecutableResolution::Wrapped { runner: PathBuf::from(language), args: Vec::new() },
    }
}

/// Extra `RuntimeSession.extra` fields a descriptor contributes beyond the
/// common name/pid/port/cwd shape (spec §3). Only `pty` contributes
/// anything today: its session is only useful to a client once it knows
/// the WebSocket URL to attach to (spec §6).
pub fn extra_info(language: &str, port: u16) -> HashMap<String, String> {
    let mut extra = HashMap::new();
    if language == "pty" {
        extra.insert("wsUrl".to_string(), format!("ws://127.0.0.1:{port}/api/pty"));
    }
    extra
}

/// Best-effort availability check: does the resolved runner exist on PATH
/// or as a direct executable.
pub fn validate(resolution: &ExecutableResolution) -> ValidateResult {
    let executable = match resolution {
        ExecutableResolution::Direct { executable, .. } => executable.clone(),
        ExecutableResolution::Wrapped { runner, .. } => runner.clone(),
    };
    if executable.is_absolute() {
        return if executable.exists() {
            ValidateResult::ok()
        } else {
            ValidateResult::unavailable(format!("{} not found", executable.display()))
        };
    }
    let found = std::env::var_os("PATH").is_some_and(|paths| {
        std::env::split_paths(&paths).any(|dir| dir.join(&executable).exists())
    });
    if found {
        ValidateResult::ok()
    } else {
        ValidateResult::unavailable(format!("{} not found on PATH", executable.display()))
    }
}

#[cfg(test)]
#[path = "runtimes_tests.rs"]
mod tests;
