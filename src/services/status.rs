//! Active-network status indicator
//!
//! The registry publishes the index-0 network after each mutation; the
//! indicator keeps the current label and fans it out to subscribers.

use crate::services::network::CardanoNetwork;
use log::debug;
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

pub const NO_NETWORK: &str = "No Network";

const CHANNEL_CAPACITY: usize = 16;

/// Receives the active network whenever the registry's first entry may have changed
pub trait ActiveNetworkObserver: Send + Sync {
    fn active_network_changed(&self, network: Option<CardanoNetwork>);
}

impl<T: ActiveNetworkObserver + ?Sized> ActiveNetworkObserver for Arc<T> {
    fn active_network_changed(&self, network: Option<CardanoNetwork>) {
        (**self).active_network_changed(network)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    pub label: String,
    pub network: Option<CardanoNetwork>,
}

impl StatusInfo {
    pub fn new(network: Option<CardanoNetwork>) -> Self {
        let name = network.map_or_else(|| NO_NETWORK.to_string(), |n| n.to_string());
        Self {
            label: format!("Cardano: {name}"),
            network,
        }
    }
}

#[derive(Debug)]
pub struct StatusIndicator {
    current: RwLock<Option<CardanoNetwork>>,
    tx: broadcast::Sender<StatusInfo>,
}

impl StatusIndicator {
    pub fn new(initial: Option<CardanoNetwork>) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            current: RwLock::new(initial),
            tx,
        }
    }

    pub fn status(&self) -> StatusInfo {
        let current = *self.current.read().unwrap_or_else(PoisonError::into_inner);
        StatusInfo::new(current)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusInfo> {
        self.tx.subscribe()
    }
}

impl ActiveNetworkObserver for StatusIndicator {
    fn active_network_changed(&self, network: Option<CardanoNetwork>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = network;

        let info = StatusInfo::new(network);
        debug!("status: {}", info.label);

        // no subscribers is fine
        let _ = self.tx.send(info);
    }
}
