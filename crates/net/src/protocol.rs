//! Protocol message definitions for client-server inventory replication.
//!
//! All messages use postcard serialization for compact binary encoding.

use invsync_core::RecipeOutput;
use invsync_inventory::{InventoryRequest, InventorySnapshot};
use serde::{Deserialize, Serialize};

/// Protocol version for compatibility checking.
pub const PROTOCOL_VERSION: u16 = 1;

/// Protocol magic bytes to identify the invsync protocol.
pub const PROTOCOL_MAGIC: &[u8; 10] = b"INVS\x00\x01\x00\x00\x00\x00";

/// Maximum length of item, slot and recipe identifiers on the wire.
pub const MAX_ID_LEN: usize = 64;

/// Maximum length of handshake rejection and disconnect reasons.
pub const MAX_REASON_LEN: usize = 256;

/// Maximum number of item totals in one snapshot.
pub const MAX_SNAPSHOT_ITEMS: usize = 1024;

/// Maximum number of tagged slot entries in one snapshot.
pub const MAX_TAGGED_SLOTS: usize = 64;

/// Maximum number of unlocked recipes in one snapshot.
pub const MAX_UNLOCKED_RECIPES: usize = 1024;

/// Request sequence number, assigned by the client.
pub type Sequence = u32;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ClientMessage {
    /// Handshake request with protocol version and schema hash.
    Handshake {
        /// Protocol version.
        version: u16,
        /// Schema hash for compatibility.
        schema_hash: u64,
    },

    /// Inventory mutation forwarded from the client replica.
    Request {
        /// Client-assigned sequence number, echoed in the ack.
        sequence: Sequence,
        /// The mutation.
        request: InventoryRequest,
    },

    /// Client disconnect notification.
    Disconnect {
        /// Reason for disconnect.
        reason: String,
    },
}

impl ClientMessage {
    /// Verify message limits and validity.
    ///
    /// This should be called on all received messages before they reach the inventory.
    pub fn verify(&self) -> Result<(), &'static str> {
        match self {
            ClientMessage::Request { request, .. } => verify_request(request)?,
            ClientMessage::Disconnect { reason } => {
                if reason.len() > MAX_REASON_LEN {
                    return Err("Disconnect reason too long");
                }
            }
            ClientMessage::Handshake { .. } => {}
        }
        Ok(())
    }
}

fn verify_request(request: &InventoryRequest) -> Result<(), &'static str> {
    match request {
        InventoryRequest::MoveItems(request) => {
            check_id(request.item_id.as_str())?;
            for slot in [&request.source, &request.target].into_iter().flatten() {
                check_id(slot.as_str())?;
            }
            if let Some(swap) = &request.swap_item_id {
                check_id(swap.as_str())?;
            }
        }
        InventoryRequest::DropItems {
            item_id,
            angle_degrees,
            ..
        } => {
            check_id(item_id.as_str())?;
            check_angle(*angle_degrees)?;
        }
        InventoryRequest::DropFromTaggedSlot {
            slot,
            angle_degrees,
            ..
        } => {
            check_id(slot.as_str())?;
            check_angle(*angle_degrees)?;
        }
        InventoryRequest::UseItem { item_id } => check_id(item_id.as_str())?,
        InventoryRequest::UseItemFromTaggedSlot { slot } => check_id(slot.as_str())?,
        InventoryRequest::CraftRecipe { recipe }
        | InventoryRequest::SetRecipeLock { recipe, .. } => check_id(recipe.as_str())?,
        InventoryRequest::DropAllItems => {}
    }
    Ok(())
}

fn check_id(id: &str) -> Result<(), &'static str> {
    if id.len() > MAX_ID_LEN {
        return Err("Identifier too long");
    }
    Ok(())
}

fn check_angle(angle: f32) -> Result<(), &'static str> {
    if !angle.is_finite() {
        return Err("Invalid drop angle");
    }
    Ok(())
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ServerMessage {
    /// Handshake response accepting or rejecting connection.
    HandshakeResponse {
        /// Whether handshake was accepted.
        accepted: bool,
        /// Reason for rejection (if not accepted).
        reason: Option<String>,
    },

    /// Full inventory state at an authority version.
    Snapshot(InventorySnapshot),

    /// Outcome of one forwarded request.
    Ack {
        /// Sequence number of the request.
        sequence: Sequence,
        /// Quantity the client asked for.
        requested: i32,
        /// Quantity the authority applied.
        applied: i32,
    },

    /// A craft completed on the authority.
    CraftConfirmed {
        /// What was produced.
        output: RecipeOutput,
        /// How many.
        quantity: i32,
    },

    /// Server disconnect notification.
    Disconnect {
        /// Reason for disconnect.
        reason: String,
    },
}

impl ServerMessage {
    /// Verify message limits and validity.
    pub fn verify(&self) -> Result<(), &'static str> {
        match self {
            ServerMessage::Snapshot(snapshot) => {
                if snapshot.items.len() > MAX_SNAPSHOT_ITEMS {
                    return Err("Too many items in snapshot");
                }
                if snapshot.tagged.len() > MAX_TAGGED_SLOTS {
                    return Err("Too many tagged slots in snapshot");
                }
                if snapshot.unlocked_recipes.len() > MAX_UNLOCKED_RECIPES {
                    return Err("Too many unlocked recipes in snapshot");
                }
            }
            ServerMessage::HandshakeResponse {
                reason: Some(r), ..
            } => {
                if r.len() > MAX_REASON_LEN {
                    return Err("Handshake rejection reason too long");
                }
            }
            ServerMessage::Disconnect { reason } => {
                if reason.len() > MAX_REASON_LEN {
                    return Err("Disconnect reason too long");
                }
            }
            _ => {}
        }
        Ok(())
    }
}
