//! Scripted replication session between an in-process server and client.

use crate::config::{SessionAction, SessionConfig};
use anyhow::{Context, Result};
use invsync_assets::{catalog_from_file, recipes_from_file};
use invsync_client::InventoryClient;
use invsync_core::{ItemCatalog, ItemStack, RecipeRegistry};
use invsync_inventory::{DroppedStack, Inventory, WorldSpawner};
use invsync_net::{encode_client_message, encode_server_message};
use invsync_server::InventoryServer;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// World stand-in that logs and keeps every dropped stack.
#[derive(Debug, Clone, Default)]
struct WorldLog {
    drops: Arc<Mutex<Vec<DroppedStack>>>,
}

impl WorldLog {
    fn drops(&self) -> Vec<DroppedStack> {
        self.drops.lock().map(|drops| drops.clone()).unwrap_or_default()
    }
}

impl WorldSpawner for WorldLog {
    fn spawn_dropped_stack(&mut self, drop: &DroppedStack) -> bool {
        info!(
            item = %drop.stack.item_id,
            quantity = drop.stack.quantity,
            angle = drop.angle_degrees,
            "stack dropped into world"
        );
        if let Ok(mut drops) = self.drops.lock() {
            drops.push(drop.clone());
        }
        true
    }
}

/// Summary of a finished session.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub actions: usize,
    /// Actions the client could predict or forward.
    pub accepted: usize,
    pub rejected: usize,
    pub frames_sent: usize,
    pub frames_received: usize,
    pub confirmed: u64,
    pub unmatched: u64,
    pub resyncs: u64,
    pub server_version: u64,
    /// Server-side generic and tagged totals at the end.
    pub items: Vec<ItemStack>,
    pub dropped: Vec<DroppedStack>,
    pub settled: bool,
}

struct Session {
    server: InventoryServer,
    client: InventoryClient,
    frames_sent: usize,
    frames_received: usize,
}

impl Session {
    fn connect(&mut self) -> Result<()> {
        let hello = encode_client_message(&self.client.handshake())?;
        self.exchange(&hello)?;
        if !self.client.is_connected() {
            anyhow::bail!("server rejected the handshake");
        }
        Ok(())
    }

    fn exchange(&mut self, frame: &[u8]) -> Result<()> {
        self.frames_sent += 1;
        for reply in self.server.handle_frame(frame)? {
            self.frames_received += 1;
            self.client.receive_frame(&reply)?;
        }
        Ok(())
    }

    /// Deliver every queued request and its replies.
    fn pump(&mut self) -> Result<()> {
        for frame in self.client.outgoing_frames()? {
            self.exchange(&frame)?;
        }
        Ok(())
    }

    /// Replicate server-side changes.
    fn publish(&mut self) -> Result<()> {
        for msg in self.server.publish() {
            let frame = encode_server_message(&msg)?;
            self.frames_received += 1;
            self.client.receive_frame(&frame)?;
        }
        Ok(())
    }

    fn apply(&mut self, action: &SessionAction) -> Result<bool> {
        let accepted = match action {
            SessionAction::Move { from, to, quantity } => {
                let (from, to) = (from.to_slot_ref(), to.to_slot_ref());
                match quantity {
                    Some(quantity) => self.client.predict_split(&from, &to, *quantity),
                    None => self.client.predict_move(&from, &to),
                }
            }
            SessionAction::MoveToTagged { from } => {
                self.client.predict_move_to_any_tagged_slot(&from.to_slot_ref())
            }
            SessionAction::Drop { slot, quantity, angle } => {
                self.client.predict_drop(&slot.to_slot_ref(), *quantity, *angle)
            }
            SessionAction::Use { slot } => self.client.predict_use(&slot.to_slot_ref()),
            SessionAction::Craft { recipe } => self.client.craft(recipe),
            SessionAction::SetRecipeLock { recipe, locked } => {
                self.client.set_recipe_lock(recipe, *locked)
            }
            SessionAction::DropAll => self.client.drop_all() > 0,
            SessionAction::Grant { item, quantity } => {
                let added = self
                    .server
                    .inventory_mut()
                    .add_items(ItemStack::new(item.clone(), *quantity), true);
                self.publish()?;
                added > 0
            }
        };
        Ok(accepted)
    }
}

/// Load the configured packs and run the session.
pub fn run(config: &SessionConfig) -> Result<SessionReport> {
    let catalog = catalog_from_file(&config.items)
        .with_context(|| format!("failed to load item pack from {}", config.items.display()))?;
    let recipes = recipes_from_file(&config.recipes, &catalog)
        .with_context(|| format!("failed to load recipe pack from {}", config.recipes.display()))?;
    run_with(config, Arc::new(catalog), Arc::new(recipes))
}

/// Run the scripted session against already loaded packs.
pub fn run_with(
    config: &SessionConfig,
    catalog: Arc<ItemCatalog>,
    recipes: Arc<RecipeRegistry>,
) -> Result<SessionReport> {
    let world = WorldLog::default();
    let mut inventory = Inventory::new(
        Arc::clone(&catalog),
        Arc::clone(&recipes),
        config.inventory.clone(),
    )
    .with_spawner(Box::new(world.clone()));
    for grant in &config.grants {
        let added = inventory.add_items(grant.clone(), true);
        if added < grant.quantity {
            warn!(
                item = %grant.item_id,
                requested = grant.quantity,
                added,
                "initial grant did not fit"
            );
        }
    }

    let client = InventoryClient::new(
        catalog,
        recipes,
        config.inventory.clone(),
        config.slot_count,
        config.prefer_empty_universal_slots,
    );
    let mut session = Session {
        server: InventoryServer::new(inventory),
        client,
        frames_sent: 0,
        frames_received: 0,
    };
    session.connect()?;

    let pump_every = config.pump_every.max(1);
    let mut accepted = 0;
    for (index, action) in config.actions.iter().enumerate() {
        if session.apply(action)? {
            accepted += 1;
        } else {
            debug!(index, ?action, "action had no effect");
        }
        if (index + 1) % pump_every == 0 {
            session.pump()?;
        }
    }
    session.pump()?;

    let metrics = session.client.view().metrics();
    let settled = session.client.view().assert_settled(session.client.inventory())
        && session.client.is_settled();
    Ok(SessionReport {
        actions: config.actions.len(),
        accepted,
        rejected: config.actions.len() - accepted,
        frames_sent: session.frames_sent,
        frames_received: session.frames_received,
        confirmed: metrics.confirmed,
        unmatched: metrics.unmatched,
        resyncs: metrics.resyncs,
        server_version: session.server.inventory().version(),
        items: session.server.inventory().container().items().to_vec(),
        dropped: world.drops(),
        settled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SlotAddress;
    use invsync_core::{ItemDefinition, SlotTag};
    use invsync_inventory::{InventoryConfig, SlotLayout, UniversalSlot};

    fn catalog() -> Arc<ItemCatalog> {
        Arc::new(
            ItemCatalog::from_definitions([
                ItemDefinition::new("apple", 5),
                ItemDefinition::new("sword", 1).with_category("Weapon.OneHanded"),
            ])
            .unwrap(),
        )
    }

    fn config(actions: Vec<SessionAction>) -> SessionConfig {
        SessionConfig {
            inventory: InventoryConfig {
                layout: SlotLayout::new().with_universal(UniversalSlot::new("MainHand")),
                ..InventoryConfig::default()
            },
            grants: vec![ItemStack::new("sword", 1), ItemStack::new("apple", 4)],
            actions,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn scripted_moves_settle() {
        let config = config(vec![
            SessionAction::Move {
                from: SlotAddress::Grid(0),
                to: SlotAddress::Tagged(SlotTag::new("MainHand")),
                quantity: None,
            },
            SessionAction::Drop {
                slot: SlotAddress::Grid(1),
                quantity: 2,
                angle: 45.0,
            },
            SessionAction::Grant {
                item: "apple".into(),
                quantity: 3,
            },
        ]);
        let report = run_with(&config, catalog(), Arc::new(RecipeRegistry::new())).unwrap();

        assert_eq!(report.accepted, 3);
        assert!(report.settled);
        assert_eq!(report.resyncs, 0);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].stack, ItemStack::new("apple", 2));
        assert!(report.items.contains(&ItemStack::new("apple", 5)));
    }

    #[test]
    fn batched_delivery_validates_against_replica() {
        let mut config = config(vec![
            SessionAction::Move {
                from: SlotAddress::Grid(0),
                to: SlotAddress::Tagged(SlotTag::new("MainHand")),
                quantity: None,
            },
            SessionAction::Move {
                from: SlotAddress::Tagged(SlotTag::new("MainHand")),
                to: SlotAddress::Grid(5),
                quantity: None,
            },
        ]);
        config.pump_every = 10;
        let report = run_with(&config, catalog(), Arc::new(RecipeRegistry::new())).unwrap();
        // the replica has not seen the first move when the second is validated
        assert_eq!(report.rejected, 1);
        assert!(report.settled);
    }
}
