// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lightweight string-newtype identifiers.
//!
//! Unlike the generated IDs in [`crate::id`], these wrap identifiers that
//! come from elsewhere (the relay assigns tunnel session ids, the OS
//! assigns a hostname, the user assigns a project name) so they carry no
//! fixed prefix or length invariant — just a typed wrapper to keep them
//! from being mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifies an in-flight HTTP proxy request multiplexed over the tunnel.
    HttpSessionId
);
string_id!(
    /// Identifies an in-flight WebSocket proxy session multiplexed over the tunnel.
    WsSessionId
);
string_id!(
    /// This machine's identity as advertised to the relay (`MRMD_MACHINE_ID`).
    MachineId
);
string_id!(
    /// A project's display/catalog name, distinct from its filesystem path.
    ProjectName
);

#[cfg(test)]
#[path = "ids_tests.rs"]
mod tests;
