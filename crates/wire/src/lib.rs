// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocols for the Machine Agent: the length-prefixed local admin
//! socket between `magent` and `magentd`, and the JSON tunnel protocol
//! multiplexed over the relay's provider WebSocket.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod framing;
mod ipc;
mod tunnel;

pub use framing::{decode, encode, read_message, read_request, write_message, write_response, ProtocolError, MAX_FRAME_LEN};
pub use ipc::{AdminRequest, AdminResponse, ProjectAdminSummary, RuntimeAdminSummary};
pub use tunnel::TunnelMessage;
