//! In-process client/server pair with controllable delivery.
//!
//! Frames travel through two queues, one per direction, and only move when
//! the test says so. Everything is encoded with the wire codec on the way.

use anyhow::{Context, Result};
use invsync_client::InventoryClient;
use invsync_net::encode_server_message;
use invsync_server::InventoryServer;
use std::collections::VecDeque;
use tracing::debug;

/// Upper bound on pump rounds in [`Loopback::settle`].
const MAX_SETTLE_ROUNDS: usize = 64;

/// A connected server and client with queued, manually delivered frames.
pub struct Loopback {
    /// Authoritative end.
    pub server: InventoryServer,
    /// Predicting end.
    pub client: InventoryClient,
    to_server: VecDeque<Vec<u8>>,
    to_client: VecDeque<Vec<u8>>,
    delivered_to_client: Vec<Vec<u8>>,
}

impl Loopback {
    /// Wire the two ends together and complete the handshake.
    pub fn connect(server: InventoryServer, client: InventoryClient) -> Result<Self> {
        let mut loopback = Self {
            server,
            client,
            to_server: VecDeque::new(),
            to_client: VecDeque::new(),
            delivered_to_client: Vec::new(),
        };
        let hello = invsync_net::encode_client_message(&loopback.client.handshake())?;
        loopback.to_server.push_back(hello);
        loopback.deliver_to_server(usize::MAX)?;
        loopback.deliver_to_client(usize::MAX)?;
        Ok(loopback)
    }

    /// Queue the client's pending requests. Returns how many were queued.
    pub fn send(&mut self) -> Result<usize> {
        let frames = self.client.outgoing_frames()?;
        let count = frames.len();
        self.to_server.extend(frames);
        Ok(count)
    }

    /// Hand up to `max` queued frames to the server. Returns how many.
    pub fn deliver_to_server(&mut self, max: usize) -> Result<usize> {
        let mut delivered = 0;
        while delivered < max {
            let Some(frame) = self.to_server.pop_front() else {
                break;
            };
            let replies = self
                .server
                .handle_frame(&frame)
                .context("server rejected frame")?;
            self.to_client.extend(replies);
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Hand up to `max` queued frames to the client. Returns how many.
    pub fn deliver_to_client(&mut self, max: usize) -> Result<usize> {
        let mut delivered = 0;
        while delivered < max {
            let Some(frame) = self.to_client.pop_front() else {
                break;
            };
            self.client
                .receive_frame(&frame)
                .context("client rejected frame")?;
            self.delivered_to_client.push(frame);
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Queue whatever the server has to replicate after a server-side change.
    pub fn publish(&mut self) -> Result<usize> {
        let messages = self.server.publish();
        let count = messages.len();
        for msg in &messages {
            self.to_client.push_back(encode_server_message(msg)?);
        }
        Ok(count)
    }

    /// Deliver every frame the client already saw once more, oldest first.
    pub fn replay_to_client(&mut self) -> Result<usize> {
        let frames = self.delivered_to_client.clone();
        for frame in &frames {
            self.client.receive_frame(frame)?;
        }
        Ok(frames.len())
    }

    /// Frames waiting for the server.
    pub fn pending_to_server(&self) -> usize {
        self.to_server.len()
    }

    /// Frames waiting for the client.
    pub fn pending_to_client(&self) -> usize {
        self.to_client.len()
    }

    /// Send and deliver in both directions until nothing moves.
    pub fn settle(&mut self) -> Result<()> {
        for round in 0..MAX_SETTLE_ROUNDS {
            let moved = self.send()?
                + self.deliver_to_server(usize::MAX)?
                + self.deliver_to_client(usize::MAX)?;
            if moved == 0 {
                debug!(round, "loopback settled");
                return Ok(());
            }
        }
        anyhow::bail!("loopback still busy after {MAX_SETTLE_ROUNDS} rounds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_catalog, sample_config, sample_recipes};
    use invsync_core::ItemStack;
    use invsync_inventory::{Inventory, SlotRef};

    fn loopback() -> Loopback {
        let mut inventory = Inventory::new(sample_catalog(), sample_recipes(), sample_config(8));
        inventory.add_items(ItemStack::new("shield", 1), false);
        let client =
            InventoryClient::new(sample_catalog(), sample_recipes(), sample_config(8), 8, false);
        Loopback::connect(InventoryServer::new(inventory), client).unwrap()
    }

    #[test]
    fn test_connect_replicates() {
        let loopback = loopback();
        assert!(loopback.client.is_connected());
        assert!(loopback.client.is_settled());
        assert_eq!(loopback.client.view().grid()[0], ItemStack::new("shield", 1));
    }

    #[test]
    fn test_held_frames_wait() {
        let mut loopback = loopback();
        assert!(loopback.client.predict_move(&SlotRef::Generic(0), &SlotRef::tagged("OffHand")));
        assert_eq!(loopback.send().unwrap(), 1);
        assert_eq!(loopback.pending_to_server(), 1);
        assert!(!loopback.client.is_settled());

        loopback.settle().unwrap();
        assert_eq!(loopback.pending_to_server(), 0);
        assert!(loopback.client.is_settled());
    }
}
