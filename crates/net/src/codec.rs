//! Message encoding and decoding with framing.
//!
//! Frame format: `[length: u32 LE][message_type: u8][payload: postcard bytes]`,
//! where `length` covers the type tag and the payload.

use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_MAGIC, PROTOCOL_VERSION};
use anyhow::{Context, Result};
use serde::Serialize;

/// Upper bound on a single frame body.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Compute schema hash from protocol definitions.
///
/// Client and server compare it during the handshake.
pub fn compute_schema_hash() -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&PROTOCOL_VERSION.to_le_bytes());
    hasher.update(PROTOCOL_MAGIC);

    // Message type names (deterministic)
    hasher.update(b"ClientMessage");
    hasher.update(b"ServerMessage");
    hasher.update(b"InventoryRequest");
    hasher.update(b"InventorySnapshot");

    let hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}

/// Encode a client message with length prefix.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>> {
    encode_frame(client_message_tag(msg), msg).context("Failed to serialize client message")
}

/// Encode a server message with length prefix.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>> {
    encode_frame(server_message_tag(msg), msg).context("Failed to serialize server message")
}

/// Decode a client message from frame data.
///
/// Expects data to start with length prefix.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage> {
    let payload = frame_payload(data)?;
    postcard::from_bytes(payload).context("Failed to deserialize client message")
}

/// Decode a server message from frame data.
///
/// Expects data to start with length prefix.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage> {
    let payload = frame_payload(data)?;
    postcard::from_bytes(payload).context("Failed to deserialize server message")
}

/// Total byte length of the first frame in `data`, if it is complete.
pub fn frame_len(data: &[u8]) -> Option<usize> {
    if data.len() < 4 {
        return None;
    }
    let length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    (data.len() >= 4 + length).then_some(4 + length)
}

fn encode_frame<T: Serialize>(tag: u8, msg: &T) -> Result<Vec<u8>> {
    let payload = postcard::to_allocvec(msg)?;
    if 1 + payload.len() > MAX_FRAME_LEN {
        return Err(anyhow::anyhow!(
            "Frame too large: {} bytes (maximum {})",
            1 + payload.len(),
            MAX_FRAME_LEN
        ));
    }

    let mut frame = Vec::with_capacity(4 + 1 + payload.len());
    let length = (1 + payload.len()) as u32;
    frame.extend_from_slice(&length.to_le_bytes());
    frame.push(tag);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn frame_payload(data: &[u8]) -> Result<&[u8]> {
    if data.len() < 5 {
        return Err(anyhow::anyhow!(
            "Frame too short: {} bytes (minimum 5)",
            data.len()
        ));
    }

    let length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if length == 0 || length > MAX_FRAME_LEN {
        return Err(anyhow::anyhow!("Invalid frame length: {}", length));
    }
    if data.len() < 4 + length {
        return Err(anyhow::anyhow!(
            "Incomplete frame: expected {} bytes, got {}",
            4 + length,
            data.len()
        ));
    }

    // Skip message type tag (data[4])
    Ok(&data[5..4 + length])
}

fn client_message_tag(msg: &ClientMessage) -> u8 {
    match msg {
        ClientMessage::Handshake { .. } => 0,
        ClientMessage::Request { .. } => 1,
        ClientMessage::Disconnect { .. } => 2,
    }
}

fn server_message_tag(msg: &ServerMessage) -> u8 {
    match msg {
        ServerMessage::HandshakeResponse { .. } => 0,
        ServerMessage::Snapshot(_) => 1,
        ServerMessage::Ack { .. } => 2,
        ServerMessage::CraftConfirmed { .. } => 3,
        ServerMessage::Disconnect { .. } => 4,
    }
}
