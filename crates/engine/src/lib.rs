// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Machine Agent's stateful, I/O-driving components: the Runtime
//! Registry (§4.C), the Sync Server Pool (§4.D), the Document Bridge
//! (§4.E), the Tunnel Provider (§4.F), and the Project Host Loop (§4.G).
//!
//! Everything here is generic over `magent_core::Clock` so tests can swap
//! in `FakeClock` without touching production wiring, which lives in
//! `magent-daemon`.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod document_bridge;
pub mod host_loop;
pub mod registry;
pub mod sync_pool;
pub mod tunnel;

pub use document_bridge::{Bridge, BridgeConfig, BridgeManager};
pub use host_loop::{HostLoop, HostLoopConfig, HostLoopError};
pub use registry::{PackagingConfig, Registry, RegistryError, StartConfig};
pub use sync_pool::{SyncPool, SyncPoolError, SyncPoolEvent, SyncServerSpawnConfig};
pub use tunnel::{TunnelConfig, TunnelProvider};
