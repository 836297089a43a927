// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Length-prefixed JSON framing shared by the local admin socket and the
//! on-disk session-registry mirrors.
//!
//! Wire format: 4-byte big-endian length prefix + JSON payload.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message exceeds max frame size of {max} bytes: {got}")]
    TooLarge { max: u32, got: u32 },
}

/// Frames larger than this are refused outright rather than allocating an
/// attacker- or bug-controlled buffer.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Serialize `value` to JSON with no length prefix.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize `bytes` as JSON.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write `payload` prefixed with its big-endian u32 length.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), ProtocolError> {
    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed payload.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::TooLarge { max: MAX_FRAME_LEN, got: len });
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Read one length-prefixed JSON request and decode it.
pub async fn read_request<T: DeserializeOwned, R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<T, ProtocolError> {
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

/// Encode and write one JSON response, length-prefixed.
pub async fn write_response<T: Serialize, W: AsyncWrite + Unpin>(
    writer: &mut W,
    value: &T,
) -> Result<(), ProtocolError> {
    let bytes = encode(value)?;
    write_message(writer, &bytes).await
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
