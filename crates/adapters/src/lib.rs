// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process- and OS-facing adapters: port allocation, child supervision,
//! desktop notifications, and the built-in language runtime descriptors.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod notify;
pub mod port_broker;
pub mod runtimes;
pub mod supervisor;

pub use notify::{DesktopNotifyAdapter, NotifyAdapter, NotifyError};
pub use port_broker::{allocate, is_listening, localhost, wait_for_listening, PortBrokerError};
pub use supervisor::{ExitReport, ProcessDescriptor, ProcessHandle, Supervisor, SupervisorError};

#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
