use std::sync::Arc;

use dashmap::DashMap;
use log::debug;
use tokio::sync::Mutex;

use crate::{
    transaction::Address,
    transport::{ChainTransport, TransportError},
};

/// Serializes nonce assignment per signing address
///
/// Concurrent calls from the same address would otherwise read the same pending
/// count from the node and collide. Each address owns a lock and the last nonce
/// handed out, the next one is `max(node count, last + 1)` so transactions sent by
/// other tools are still taken into account.
#[derive(Default)]
pub struct NonceSequencer {
    slots: DashMap<Address, Arc<Mutex<Option<u64>>>>,
}

impl NonceSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn next(
        &self,
        transport: &dyn ChainTransport,
        address: &Address,
    ) -> Result<u64, TransportError> {
        // Clone the slot out so no map guard is held across the await points
        let slot = self.slots.entry(address.clone()).or_default().clone();
        let mut last = slot.lock().await;

        let node_count = transport.get_transaction_count(address).await?;
        let nonce = match *last {
            Some(previous) => node_count.max(previous + 1),
            None => node_count,
        };
        *last = Some(nonce);

        if log::log_enabled!(log::Level::Debug) {
            debug!("Nonce {} assigned to {} (node count {})", nonce, address, node_count);
        }
        Ok(nonce)
    }

    /// Forget the local state of `address` after a failed broadcast
    pub fn invalidate(&self, address: &Address) {
        if self.slots.remove(address).is_some() && log::log_enabled!(log::Level::Debug) {
            debug!("Nonce state of {} reset", address);
        }
    }
}
