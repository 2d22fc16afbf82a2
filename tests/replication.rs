//! End-to-end replication scenarios over the loopback harness.

use invsync_client::{InventoryClient, SlotViewModel};
use invsync_core::{ItemId, ItemStack, SlotTag};
use invsync_inventory::{Inventory, InventoryEvent, SlotRef};
use invsync_server::InventoryServer;
use invsync_testkit::{
    sample_catalog, sample_config, sample_recipes, JsonlSink, Loopback, RecordingSpawner,
};
use std::fs;

const SLOTS: i32 = 8;

fn session(grants: &[(&str, i32)]) -> (Loopback, RecordingSpawner) {
    let spawner = RecordingSpawner::new();
    let mut inventory = Inventory::new(sample_catalog(), sample_recipes(), sample_config(SLOTS))
        .with_spawner(Box::new(spawner.clone()));
    for (item, quantity) in grants {
        assert_eq!(inventory.add_items(ItemStack::new(*item, *quantity), false), *quantity);
    }
    let client = InventoryClient::new(
        sample_catalog(),
        sample_recipes(),
        sample_config(SLOTS),
        SLOTS as usize,
        false,
    );
    let loopback = Loopback::connect(InventoryServer::new(inventory), client).expect("handshake");
    (loopback, spawner)
}

fn visual_count(view: &SlotViewModel, item: &str) -> i32 {
    let id = ItemId::new(item);
    let grid: i32 = view
        .grid()
        .iter()
        .filter(|stack| stack.item_id == id)
        .map(|stack| stack.quantity)
        .sum();
    let tagged: i32 = view
        .tagged_slots()
        .filter(|(_, stack)| stack.item_id == id)
        .map(|(_, stack)| stack.quantity)
        .sum();
    grid + tagged
}

#[test]
fn unrelated_removal_during_prediction_settles() {
    let (mut link, _) = session(&[("apple", 5)]);
    let off_hand = SlotRef::tagged("OffHand");

    assert!(link.client.predict_split(&SlotRef::Generic(0), &off_hand, 3));
    assert_eq!(link.client.view().pending_len(), 2);
    assert_eq!(link.send().unwrap(), 1);

    // something on the server eats an apple before the move lands
    assert_eq!(link.server.inventory_mut().remove_items(ItemStack::new("apple", 1), false), 1);
    link.publish().unwrap();
    link.deliver_to_client(usize::MAX).unwrap();

    let metrics = link.client.view().metrics();
    assert_eq!(metrics.unmatched, 1);
    assert_eq!(metrics.resyncs, 0);
    assert_eq!(link.client.view().pending_len(), 2);
    assert_eq!(visual_count(link.client.view(), "apple"), 4);

    link.settle().unwrap();

    let view = link.client.view();
    assert!(link.client.is_settled());
    assert_eq!(view.metrics().confirmed, 2);
    assert_eq!(view.metrics().resyncs, 0);
    assert_eq!(view.tagged_slot(&SlotTag::new("OffHand")), Some(&ItemStack::new("apple", 3)));
    assert_eq!(view.grid()[0], ItemStack::new("apple", 1));
    assert_eq!(link.server.inventory().item_in_tagged_slot(&SlotTag::new("OffHand")).quantity, 3);
}

#[test]
fn drop_all_spreads_three_stacks() {
    let (mut link, spawner) = session(&[("apple", 2), ("log", 3), ("arrow", 7)]);

    assert!(link.client.drop_all() > 0);
    link.settle().unwrap();

    let drops = spawner.drops();
    assert_eq!(drops.len(), 3);
    let mut angles: Vec<f32> = drops.iter().map(|drop| drop.angle_degrees).collect();
    angles.sort_by(f32::total_cmp);
    for (angle, expected) in angles.iter().zip([0.0, 120.0, 240.0]) {
        assert!((angle - expected).abs() < 1e-3, "angle {angle} != {expected}");
    }
    assert!(link.server.inventory().container().is_empty());
    assert!(link.client.view().grid().iter().all(ItemStack::is_empty));
    assert!(link.client.is_settled());
}

#[test]
fn rejected_swap_rebuilds_view() {
    let (mut link, _) = session(&[("sword", 1), ("greatsword", 1)]);
    let main_hand = SlotRef::tagged("MainHand");

    assert!(link.client.predict_move(&SlotRef::Generic(0), &main_hand));
    link.settle().unwrap();
    assert_eq!(link.client.view().metrics().resyncs, 0);

    // the client swaps against a sword the server is about to lose
    assert!(link.client.predict_move(&SlotRef::Generic(1), &main_hand));
    link.send().unwrap();
    link.server.inventory_mut().clear_tagged_slot(&SlotTag::new("MainHand"));
    link.server
        .inventory_mut()
        .remove_items(ItemStack::new("sword", 1), false);
    link.settle().unwrap();

    assert!(link.client.is_settled());
    assert!(link.client.view().metrics().resyncs >= 1);
    assert_eq!(visual_count(link.client.view(), "sword"), 0);
    assert_eq!(visual_count(link.client.view(), "greatsword"), 1);
}

#[test]
fn rebuild_keeps_unsent_overflow_drop() {
    let spawner = RecordingSpawner::new();
    let mut inventory = Inventory::new(sample_catalog(), sample_recipes(), sample_config(SLOTS))
        .with_spawner(Box::new(spawner.clone()));
    inventory.add_items(ItemStack::new("apple", 7), false);
    let client =
        InventoryClient::new(sample_catalog(), sample_recipes(), sample_config(SLOTS), 1, false);
    let mut link = Loopback::connect(InventoryServer::new(inventory), client).unwrap();
    assert_eq!(link.client.view().overflow_in_flight(), &[ItemStack::new("apple", 2)]);

    // a server change forces a rebuild while the first drop is still queued
    link.server.inventory_mut().add_items(ItemStack::new("arrow", 1), false);
    link.publish().unwrap();
    link.deliver_to_client(usize::MAX).unwrap();
    assert_eq!(link.client.view().grid(), &[ItemStack::new("apple", 5)]);

    link.settle().unwrap();

    assert_eq!(spawner.dropped_quantity("apple"), 2);
    assert_eq!(spawner.dropped_quantity("arrow"), 1);
    assert_eq!(link.server.inventory().count(&ItemId::new("apple")), 5);
    assert_eq!(link.client.view().grid(), &[ItemStack::new("apple", 5)]);
    assert!(link.client.view().overflow_in_flight().is_empty());
    assert!(link.client.is_settled());
}

#[test]
fn replayed_frames_are_ignored() {
    let (mut link, _) = session(&[("apple", 4), ("shield", 1)]);
    assert!(link.client.predict_move(&SlotRef::Generic(1), &SlotRef::tagged("OffHand")));
    assert!(link.client.predict_drop(&SlotRef::Generic(0), 2, 90.0));
    link.settle().unwrap();

    let grid = link.client.view().grid().to_vec();
    let version = link.client.inventory().version();
    let metrics = link.client.view().metrics();

    assert!(link.replay_to_client().unwrap() > 0);

    assert_eq!(link.client.view().grid(), grid.as_slice());
    assert_eq!(link.client.inventory().version(), version);
    assert_eq!(link.client.view().metrics(), metrics);
    assert!(link.client.is_settled());
}

#[test]
fn unmatched_add_then_rebuild_matches_rebuild_alone() {
    let mut touched = Inventory::new(sample_catalog(), sample_recipes(), sample_config(SLOTS));
    touched.add_items(ItemStack::new("arrow", 30), false);
    let mut view = SlotViewModel::new(&mut touched, SLOTS as usize, false);
    touched.add_items(ItemStack::new("arrow", 5), false);
    view.process_events(&mut touched);
    assert_eq!(view.metrics().unmatched, 1);
    view.force_full_update(&mut touched);

    let mut fresh = Inventory::new(sample_catalog(), sample_recipes(), sample_config(SLOTS));
    fresh.add_items(ItemStack::new("arrow", 35), false);
    let mut baseline = SlotViewModel::new(&mut fresh, SLOTS as usize, false);
    baseline.force_full_update(&mut fresh);

    assert_eq!(view.grid(), baseline.grid());
    assert!(view.assert_settled(&touched));
}

#[test]
fn event_log_captures_craft() {
    let (mut link, _) = session(&[("log", 2)]);
    let server_events = link.server.inventory_mut().subscribe();
    let client_version = link.client.inventory().version();
    assert!(link.client.craft(&"planks".into()));
    link.settle().unwrap();

    let path = std::env::temp_dir().join(format!("invsync-events-{}.jsonl", std::process::id()));
    let mut sink = JsonlSink::create(&path).unwrap();
    let events: Vec<InventoryEvent> = link.server.inventory_mut().drain_events(server_events);
    sink.write_all("server", &events).unwrap();
    assert_eq!(sink.len(), events.len() as u64);
    drop(sink);

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), events.len());
    assert!(lines.iter().all(|line| line["source"] == "server"));
    assert!(contents.contains("CraftConfirmed"));
    assert!(link.client.inventory().version() > client_version);
    assert_eq!(link.client.inventory().count(&ItemId::new("plank")), 4);
    let _ = fs::remove_file(&path);
}
