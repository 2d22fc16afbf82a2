#![warn(missing_docs)]
//! Client replica of a remote inventory.
//!
//! [`InventoryClient`] holds a client-role [`Inventory`] fed by server
//! snapshots and a [`SlotViewModel`] that shows the user's actions before
//! the server confirms them. Requests leave through [`InventoryClient::outgoing`]
//! tagged with a sequence number; acks for those sequences decide when the
//! view must be rebuilt.

pub mod view_model;

pub use view_model::{ExpectedOperation, SlotOperation, SlotViewModel, ViewModelMetrics};

use anyhow::{Context, Result};
use invsync_core::{ItemCatalog, RecipeId, RecipeRegistry};
use invsync_inventory::{Inventory, InventoryConfig, NetRole, SlotRef};
use invsync_net::{
    compute_schema_hash, decode_server_message, encode_client_message, ClientMessage, Sequence,
    ServerMessage, PROTOCOL_VERSION,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Client side of one inventory replication session.
pub struct InventoryClient {
    inventory: Inventory,
    view: SlotViewModel,
    next_sequence: Sequence,
    in_flight: VecDeque<Sequence>,
    connected: bool,
}

impl InventoryClient {
    /// Empty replica with a `slot_count`-slot grid.
    pub fn new(
        catalog: Arc<ItemCatalog>,
        recipes: Arc<RecipeRegistry>,
        config: InventoryConfig,
        slot_count: usize,
        prefer_empty_universal: bool,
    ) -> Self {
        let mut inventory = Inventory::new(catalog, recipes, config).with_role(NetRole::Client);
        let view = SlotViewModel::new(&mut inventory, slot_count, prefer_empty_universal);
        Self {
            inventory,
            view,
            next_sequence: 0,
            in_flight: VecDeque::new(),
            connected: false,
        }
    }

    /// Opening message of a session.
    pub fn handshake(&self) -> ClientMessage {
        ClientMessage::Handshake {
            version: PROTOCOL_VERSION,
            schema_hash: compute_schema_hash(),
        }
    }

    /// Replicated inventory state.
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Visual state.
    pub fn view(&self) -> &SlotViewModel {
        &self.view
    }

    /// Visual state, for draining slot updates.
    pub fn view_mut(&mut self) -> &mut SlotViewModel {
        &mut self.view
    }

    /// Whether the server accepted the handshake and has not disconnected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Requests sent but not yet acknowledged.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether the view has caught up with the replica and nothing is in flight.
    pub fn is_settled(&self) -> bool {
        self.in_flight.is_empty() && self.view.is_settled(&self.inventory)
    }

    /// See [`SlotViewModel::predict_move`].
    pub fn predict_move(&mut self, source: &SlotRef, target: &SlotRef) -> bool {
        self.view.predict_move(&mut self.inventory, source, target)
    }

    /// See [`SlotViewModel::predict_split`].
    pub fn predict_split(&mut self, source: &SlotRef, target: &SlotRef, quantity: i32) -> bool {
        self.view.predict_split(&mut self.inventory, source, target, quantity)
    }

    /// See [`SlotViewModel::predict_move_to_any_tagged_slot`].
    pub fn predict_move_to_any_tagged_slot(&mut self, source: &SlotRef) -> bool {
        self.view.predict_move_to_any_tagged_slot(&mut self.inventory, source)
    }

    /// See [`SlotViewModel::predict_drop`].
    pub fn predict_drop(&mut self, slot: &SlotRef, quantity: i32, angle_degrees: f32) -> bool {
        self.view.predict_drop(&mut self.inventory, slot, quantity, angle_degrees)
    }

    /// See [`SlotViewModel::predict_use`].
    pub fn predict_use(&mut self, slot: &SlotRef) -> bool {
        self.view.predict_use(&mut self.inventory, slot)
    }

    /// Ask the server to craft one batch. The view follows the snapshot.
    pub fn craft(&mut self, recipe: &RecipeId) -> bool {
        self.inventory.craft_recipe(recipe)
    }

    /// Ask the server to lock or unlock a recipe.
    pub fn set_recipe_lock(&mut self, recipe: &RecipeId, locked: bool) -> bool {
        self.inventory.set_recipe_lock(recipe, locked)
    }

    /// Ask the server to drop everything.
    pub fn drop_all(&mut self) -> i32 {
        self.inventory.drop_all_items()
    }

    /// Queued requests wrapped for sending, oldest first.
    pub fn outgoing(&mut self) -> Vec<ClientMessage> {
        if !self.connected {
            return Vec::new();
        }
        self.inventory
            .take_requests()
            .into_iter()
            .map(|request| {
                let sequence = self.next_sequence;
                self.next_sequence = self.next_sequence.wrapping_add(1);
                self.in_flight.push_back(sequence);
                ClientMessage::Request { sequence, request }
            })
            .collect()
    }

    /// [`InventoryClient::outgoing`], encoded.
    pub fn outgoing_frames(&mut self) -> Result<Vec<Vec<u8>>> {
        self.outgoing().iter().map(encode_client_message).collect()
    }

    /// Message that closes the session.
    pub fn disconnect(&mut self, reason: impl Into<String>) -> ClientMessage {
        self.connected = false;
        ClientMessage::Disconnect { reason: reason.into() }
    }

    /// Apply one server message.
    pub fn handle_message(&mut self, msg: ServerMessage) {
        if let Err(reason) = msg.verify() {
            warn!(reason, "ignoring invalid server message");
            return;
        }
        match msg {
            ServerMessage::HandshakeResponse { accepted, reason } => {
                self.connected = accepted;
                if accepted {
                    info!("handshake accepted");
                } else {
                    warn!(reason = reason.as_deref().unwrap_or(""), "handshake rejected");
                }
            }
            ServerMessage::Snapshot(snapshot) => {
                let version = snapshot.version;
                if self.inventory.apply_snapshot(snapshot) {
                    debug!(version, "snapshot applied");
                    self.view.process_events(&mut self.inventory);
                }
            }
            ServerMessage::Ack {
                sequence,
                requested,
                applied,
            } => self.handle_ack(sequence, requested, applied),
            ServerMessage::CraftConfirmed { output, quantity } => {
                self.inventory.notify_craft_confirmed(output, quantity);
                self.view.process_events(&mut self.inventory);
            }
            ServerMessage::Disconnect { reason } => {
                info!(%reason, "server disconnected");
                self.connected = false;
                self.in_flight.clear();
            }
        }
    }

    /// Decode and apply one server frame.
    pub fn receive_frame(&mut self, frame: &[u8]) -> Result<()> {
        let msg = decode_server_message(frame).context("Failed to decode server frame")?;
        self.handle_message(msg);
        Ok(())
    }

    fn handle_ack(&mut self, sequence: Sequence, requested: i32, applied: i32) {
        match self.in_flight.iter().position(|pending| *pending == sequence) {
            Some(index) => {
                self.in_flight.remove(index);
            }
            None => {
                warn!(sequence, "ack for unknown request");
                return;
            }
        }

        let answered = self.in_flight.is_empty() && self.inventory.queued_requests() == 0;
        if answered {
            self.view.abandon_overflow();
        }
        if applied < requested {
            warn!(sequence, requested, applied, "server applied less than predicted");
            self.view.force_full_update(&mut self.inventory);
        } else if answered && !self.view.assert_settled(&self.inventory) {
            self.view.force_full_update(&mut self.inventory);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invsync_core::{ItemDefinition, ItemStack, SlotTag};
    use invsync_inventory::{InventoryRequest, UniversalSlot};
    use invsync_server::InventoryServer;

    fn catalog() -> Arc<ItemCatalog> {
        Arc::new(
            ItemCatalog::from_definitions([
                ItemDefinition::new("apple", 5),
                ItemDefinition::new("sword", 1).with_category("Weapon.OneHanded"),
            ])
            .unwrap(),
        )
    }

    fn config() -> InventoryConfig {
        InventoryConfig {
            layout: invsync_inventory::SlotLayout::new()
                .with_universal(UniversalSlot::new("MainHand")),
            ..InventoryConfig::default()
        }
    }

    fn session() -> (InventoryServer, InventoryClient) {
        let mut inventory = Inventory::new(catalog(), Arc::new(RecipeRegistry::new()), config());
        inventory.add_items(ItemStack::new("sword", 1), false);
        inventory.add_items(ItemStack::new("apple", 3), false);
        let mut server = InventoryServer::new(inventory);
        let mut client =
            InventoryClient::new(catalog(), Arc::new(RecipeRegistry::new()), config(), 4, false);
        for reply in server.handle_message(client.handshake()) {
            client.handle_message(reply);
        }
        (server, client)
    }

    fn pump(server: &mut InventoryServer, client: &mut InventoryClient) {
        for msg in client.outgoing() {
            for reply in server.handle_message(msg) {
                client.handle_message(reply);
            }
        }
    }

    #[test]
    fn test_handshake_replicates_initial_state() {
        let (_, client) = session();
        assert!(client.is_connected());
        assert_eq!(client.view().grid()[0], ItemStack::new("sword", 1));
        assert_eq!(client.view().grid()[1], ItemStack::new("apple", 3));
        assert!(client.is_settled());
    }

    #[test]
    fn test_predicted_move_is_confirmed() {
        let (mut server, mut client) = session();
        assert!(client.predict_move(&SlotRef::Generic(0), &SlotRef::tagged("MainHand")));
        assert_eq!(client.in_flight(), 0);

        let outgoing = client.outgoing();
        assert_eq!(outgoing.len(), 1);
        assert!(matches!(
            &outgoing[0],
            ClientMessage::Request { sequence: 0, request: InventoryRequest::MoveItems(_) }
        ));
        assert_eq!(client.in_flight(), 1);

        for reply in server.handle_message(outgoing[0].clone()) {
            client.handle_message(reply);
        }
        assert!(client.is_settled());
        assert_eq!(client.view().metrics().confirmed, 2);
        assert_eq!(client.view().metrics().resyncs, 0);
    }

    #[test]
    fn test_short_ack_forces_rebuild() {
        let (mut server, mut client) = session();
        assert!(client.predict_move(&SlotRef::Generic(0), &SlotRef::tagged("MainHand")));

        // the server loses the sword before the request arrives
        server
            .inventory_mut()
            .remove_items(ItemStack::new("sword", 1), false);
        for reply in server.publish() {
            client.handle_message(reply);
        }
        pump(&mut server, &mut client);

        assert!(client.view().metrics().resyncs >= 1);
        assert!(client.is_settled());
        assert!(client.view().tagged_slot(&SlotTag::new("MainHand")).is_some_and(|s| s.is_empty()));
    }

    #[test]
    fn test_server_side_change_reaches_view() {
        let (mut server, mut client) = session();
        server.inventory_mut().add_items(ItemStack::new("apple", 4), false);
        for reply in server.publish() {
            client.handle_message(reply);
        }
        assert_eq!(client.view().grid()[1], ItemStack::new("apple", 5));
        assert_eq!(client.view().grid()[2], ItemStack::new("apple", 2));
        assert!(client.is_settled());
    }

    #[test]
    fn test_frames_roundtrip_through_server() {
        let (mut server, mut client) = session();
        assert!(client.predict_move(&SlotRef::Generic(0), &SlotRef::tagged("MainHand")));
        for frame in client.outgoing_frames().unwrap() {
            for reply in server.handle_frame(&frame).unwrap() {
                client.receive_frame(&reply).unwrap();
            }
        }
        assert_eq!(
            server.inventory().item_in_tagged_slot(&SlotTag::new("MainHand")),
            ItemStack::new("sword", 1)
        );
        assert!(client.is_settled());
    }

    #[test]
    fn test_requests_wait_for_handshake() {
        let mut client =
            InventoryClient::new(catalog(), Arc::new(RecipeRegistry::new()), config(), 4, false);
        assert!(!client.is_connected());
        client.drop_all();
        assert!(client.outgoing().is_empty());
        let msg = client.disconnect("bye");
        assert!(matches!(msg, ClientMessage::Disconnect { .. }));
    }
}
