//! Workspace-level integration specs: exercise `magentd` and `magent` as
//! real, separately-compiled binaries talking over the admin Unix socket,
//! the way an operator actually runs them.
//!
//! Scenario-level coverage of the document bridge, sync pool and tunnel
//! (S1-S6 in spec §8) lives as unit tests inside `magent-engine`, closer to
//! the code they exercise; these specs cover what only exists once the
//! daemon and CLI binaries are wired together: process lifecycle, the
//! admin IPC protocol end to end, and CLI output rendering.

mod support;

mod daemon {
    mod lifecycle;
}

mod cli {
    mod status;
}
