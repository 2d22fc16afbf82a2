#![warn(missing_docs)]
//! Authoritative inventory host.
//!
//! One [`InventoryServer`] owns the authoritative [`Inventory`] for one
//! connected client. It validates and applies forwarded requests, answers
//! each with an ack, and publishes a snapshot whenever the version moves.

use anyhow::{Context, Result};
use invsync_inventory::{Inventory, InventoryEvent, SubscriberId};
use invsync_net::{
    compute_schema_hash, decode_client_message, encode_server_message, ClientMessage, ServerMessage,
    PROTOCOL_VERSION,
};
use tracing::{debug, info, instrument, warn};

/// Server side of one inventory replication session.
pub struct InventoryServer {
    inventory: Inventory,
    subscription: SubscriberId,
    last_published: Option<u64>,
    connected: bool,
}

impl InventoryServer {
    /// Host an authoritative inventory.
    pub fn new(mut inventory: Inventory) -> Self {
        let subscription = inventory.subscribe();
        Self {
            inventory,
            subscription,
            last_published: None,
            connected: false,
        }
    }

    /// Authoritative state.
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Mutable access for server-side changes such as loot grants.
    ///
    /// Call [`InventoryServer::publish`] afterwards to replicate them.
    pub fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    /// Whether a client completed the handshake and has not disconnected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Handle one decoded client message and return the replies in send order.
    #[instrument(skip(self, msg), fields(version = self.inventory.version()))]
    pub fn handle_message(&mut self, msg: ClientMessage) -> Vec<ServerMessage> {
        if let Err(reason) = msg.verify() {
            warn!(reason, "rejecting invalid client message");
            return match msg {
                ClientMessage::Request { sequence, request } => vec![ServerMessage::Ack {
                    sequence,
                    requested: request.requested_quantity(),
                    applied: 0,
                }],
                _ => Vec::new(),
            };
        }

        match msg {
            ClientMessage::Handshake {
                version,
                schema_hash,
            } => self.handle_handshake(version, schema_hash),
            ClientMessage::Request { sequence, request } => {
                if !self.connected {
                    warn!(sequence, "request before handshake, ignoring");
                    return Vec::new();
                }
                let requested = request.requested_quantity();
                let applied = self.inventory.apply_request(request);
                debug!(sequence, requested, applied, "request applied");

                let mut replies = self.publish();
                replies.push(ServerMessage::Ack {
                    sequence,
                    requested,
                    applied,
                });
                replies
            }
            ClientMessage::Disconnect { reason } => {
                info!(%reason, "client disconnected");
                self.connected = false;
                Vec::new()
            }
        }
    }

    /// Decode a frame, handle it, and encode the replies.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<Vec<Vec<u8>>> {
        let msg = decode_client_message(frame).context("Failed to decode client frame")?;
        self.handle_message(msg)
            .iter()
            .map(encode_server_message)
            .collect()
    }

    /// Replicate pending changes: a snapshot if the version moved, then any
    /// craft confirmations.
    pub fn publish(&mut self) -> Vec<ServerMessage> {
        let mut replies = Vec::new();
        let version = self.inventory.version();
        if self.connected && self.last_published != Some(version) {
            replies.push(ServerMessage::Snapshot(self.inventory.snapshot()));
            self.last_published = Some(version);
        }
        for event in self.inventory.drain_events(self.subscription) {
            if let InventoryEvent::CraftConfirmed { output, quantity } = event {
                if self.connected {
                    replies.push(ServerMessage::CraftConfirmed { output, quantity });
                }
            }
        }
        replies
    }

    fn handle_handshake(&mut self, version: u16, schema_hash: u64) -> Vec<ServerMessage> {
        let rejection = if version != PROTOCOL_VERSION {
            Some(format!(
                "Protocol version mismatch: server {}, client {}",
                PROTOCOL_VERSION, version
            ))
        } else if schema_hash != compute_schema_hash() {
            Some("Schema hash mismatch".to_string())
        } else {
            None
        };

        if let Some(reason) = rejection {
            warn!(version, schema_hash, %reason, "handshake rejected");
            return vec![ServerMessage::HandshakeResponse {
                accepted: false,
                reason: Some(reason),
            }];
        }

        info!(version, "client handshake accepted");
        self.connected = true;
        self.last_published = None;
        let mut replies = vec![ServerMessage::HandshakeResponse {
            accepted: true,
            reason: None,
        }];
        replies.extend(self.publish());
        replies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invsync_core::{ItemCatalog, ItemDefinition, ItemStack, RecipeRegistry};
    use invsync_inventory::{
        InventoryConfig, InventoryRequest, MoveRequest, SlotLayout, UniversalSlot,
    };
    use std::sync::Arc;

    fn server() -> InventoryServer {
        let catalog = Arc::new(
            ItemCatalog::from_definitions([
                ItemDefinition::new("apple", 5),
                ItemDefinition::new("sword", 1).with_category("Weapon.OneHanded"),
            ])
            .unwrap(),
        );
        let config = InventoryConfig {
            layout: SlotLayout::new().with_universal(UniversalSlot::new("MainHand")),
            ..InventoryConfig::default()
        };
        let mut inventory = Inventory::new(catalog, Arc::new(RecipeRegistry::new()), config);
        inventory.add_items(ItemStack::new("sword", 1), true);
        InventoryServer::new(inventory)
    }

    fn handshake() -> ClientMessage {
        ClientMessage::Handshake {
            version: PROTOCOL_VERSION,
            schema_hash: compute_schema_hash(),
        }
    }

    #[test]
    fn test_handshake_sends_initial_snapshot() {
        let mut server = server();
        let replies = server.handle_message(handshake());
        assert_eq!(replies.len(), 2);
        assert!(matches!(replies[0], ServerMessage::HandshakeResponse { accepted: true, .. }));
        assert!(matches!(replies[1], ServerMessage::Snapshot(_)));
        assert!(server.is_connected());
    }

    #[test]
    fn test_handshake_version_mismatch() {
        let mut server = server();
        let replies = server.handle_message(ClientMessage::Handshake {
            version: PROTOCOL_VERSION + 1,
            schema_hash: compute_schema_hash(),
        });
        assert!(matches!(replies[0], ServerMessage::HandshakeResponse { accepted: false, .. }));
        assert!(!server.is_connected());
    }

    #[test]
    fn test_request_before_handshake_ignored() {
        let mut server = server();
        let replies = server.handle_message(ClientMessage::Request {
            sequence: 1,
            request: InventoryRequest::DropAllItems,
        });
        assert!(replies.is_empty());
    }

    #[test]
    fn test_request_answers_snapshot_then_ack() {
        let mut server = server();
        server.handle_message(handshake());

        let replies = server.handle_message(ClientMessage::Request {
            sequence: 4,
            request: InventoryRequest::MoveItems(MoveRequest::new("sword", 1).to_slot("MainHand")),
        });
        assert!(matches!(replies[0], ServerMessage::Snapshot(_)));
        assert_eq!(
            replies[1],
            ServerMessage::Ack {
                sequence: 4,
                requested: 1,
                applied: 1
            }
        );
    }

    #[test]
    fn test_rejected_request_acks_zero_without_snapshot() {
        let mut server = server();
        server.handle_message(handshake());

        let replies = server.handle_message(ClientMessage::Request {
            sequence: 5,
            request: InventoryRequest::MoveItems(MoveRequest::new("apple", 2).to_slot("MainHand")),
        });
        assert_eq!(
            replies,
            vec![ServerMessage::Ack {
                sequence: 5,
                requested: 2,
                applied: 0
            }]
        );
    }

    #[test]
    fn test_frames_roundtrip() {
        let mut server = server();
        let frame = invsync_net::encode_client_message(&handshake()).unwrap();
        let replies = server.handle_frame(&frame).unwrap();
        assert_eq!(replies.len(), 2);
        assert!(server.handle_frame(&[1, 2, 3]).is_err());
    }
}
