use anyhow::Result;
use cardanovsc::{
    blockfrost_client::{BlockchainProvider, Utxo},
    error::NetworkError,
    services::{
        network::{CardanoNetwork, MAX_NETWORKS, NETWORKS_KEY, NetworkConfig, NetworkRegistry},
        state_store::{JsonFileStore, MemoryStore, StateStore},
        status::{ActiveNetworkObserver, StatusIndicator},
    },
};
use serde_json::json;
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};
use tempfile::TempDir;

/// Accepts every key except those listed as rejected
#[derive(Default)]
struct FakeProvider {
    rejected: HashSet<String>,
    calls: Mutex<Vec<(CardanoNetwork, String)>>,
}

impl FakeProvider {
    fn rejecting(keys: &[&str]) -> Self {
        Self {
            rejected: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<(CardanoNetwork, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl BlockchainProvider for FakeProvider {
    async fn validate_api_key(&self, network: CardanoNetwork, api_key: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .push((network, api_key.to_string()));
        !self.rejected.contains(api_key)
    }

    async fn utxos(&self, _: CardanoNetwork, _: &str, _: &str) -> Result<Vec<Utxo>> {
        Ok(Vec::new())
    }
}

/// Records every published active network
#[derive(Default)]
struct RecordingObserver(Mutex<Vec<Option<CardanoNetwork>>>);

impl ActiveNetworkObserver for RecordingObserver {
    fn active_network_changed(&self, network: Option<CardanoNetwork>) {
        self.0.lock().unwrap().push(network);
    }
}

fn config(network: CardanoNetwork, key: &str) -> NetworkConfig {
    NetworkConfig::new(network, key)
}

fn assert_invariants(list: &[NetworkConfig]) {
    assert!(list.len() <= MAX_NETWORKS);
    let unique: HashSet<_> = list.iter().map(|c| c.network).collect();
    assert_eq!(unique.len(), list.len(), "duplicate network in {list:?}");
}

#[test]
fn add_sequences_keep_capacity_and_uniqueness() {
    use CardanoNetwork::*;

    let registry = NetworkRegistry::new(MemoryStore::new(), RecordingObserver::default());
    let sequence = [
        (Mainnet, "a"),
        (Preview, "b"),
        (Mainnet, "c"),
        (Preprod, "d"),
        (Preview, "e"),
        (Preprod, "f"),
        (Mainnet, "g"),
    ];

    for (network, key) in sequence {
        registry.add(config(network, key)).unwrap();
        let list = registry.list().unwrap();

        assert_invariants(&list);
        assert_eq!(list[0], config(network, key));
    }
}

#[test]
fn add_is_idempotent_for_identical_config() {
    let registry = NetworkRegistry::new(MemoryStore::new(), RecordingObserver::default());
    registry.add(config(CardanoNetwork::Mainnet, "k1")).unwrap();
    registry.add(config(CardanoNetwork::Preview, "k2")).unwrap();

    registry.add(config(CardanoNetwork::Preview, "k2")).unwrap();
    let once = registry.list().unwrap();
    registry.add(config(CardanoNetwork::Preview, "k2")).unwrap();

    assert_eq!(registry.list().unwrap(), once);
}

#[test]
fn observer_sees_every_mutation() {
    let observer = Arc::new(RecordingObserver::default());
    let registry = NetworkRegistry::new(MemoryStore::new(), observer.clone());

    registry.add(config(CardanoNetwork::Mainnet, "k1")).unwrap();
    registry.add(config(CardanoNetwork::Preview, "k2")).unwrap();
    registry.remove(CardanoNetwork::Preview).unwrap();
    registry.remove(CardanoNetwork::Mainnet).unwrap();

    assert_eq!(
        *observer.0.lock().unwrap(),
        vec![
            Some(CardanoNetwork::Mainnet),
            Some(CardanoNetwork::Preview),
            Some(CardanoNetwork::Mainnet),
            None,
        ]
    );
}

#[tokio::test]
async fn activate_is_a_permutation() {
    let store = Arc::new(MemoryStore::new());
    let registry = NetworkRegistry::new(store.clone(), RecordingObserver::default());
    for (network, key) in [
        (CardanoNetwork::Preview, "k3"),
        (CardanoNetwork::Mainnet, "k2"),
        (CardanoNetwork::Preprod, "k1"),
    ] {
        registry.add(config(network, key)).unwrap();
    }
    let before: HashSet<_> = registry
        .list()
        .unwrap()
        .into_iter()
        .map(|c| (c.network, c.api_key))
        .collect();

    let provider = FakeProvider::default();
    registry
        .activate(&provider, CardanoNetwork::Mainnet)
        .await
        .unwrap();

    let after = registry.list().unwrap();
    assert_eq!(after[0], config(CardanoNetwork::Mainnet, "k2"));
    assert_eq!(
        after
            .iter()
            .map(|c| (c.network, c.api_key.clone()))
            .collect::<HashSet<_>>(),
        before
    );
    assert_eq!(provider.calls(), vec![(CardanoNetwork::Mainnet, "k2".into())]);
}

#[tokio::test]
async fn failed_activation_leaves_state_untouched() {
    let store = Arc::new(MemoryStore::new());
    let registry = NetworkRegistry::new(store.clone(), RecordingObserver::default());
    registry.add(config(CardanoNetwork::Mainnet, "stale")).unwrap();
    registry.add(config(CardanoNetwork::Preview, "k2")).unwrap();
    let before = store.get(NETWORKS_KEY).unwrap();

    let provider = FakeProvider::rejecting(&["stale"]);
    let result = registry.activate(&provider, CardanoNetwork::Mainnet).await;

    assert!(matches!(
        result,
        Err(NetworkError::ConnectionFailed(CardanoNetwork::Mainnet))
    ));
    assert_eq!(store.get(NETWORKS_KEY).unwrap(), before);
}

#[tokio::test]
async fn register_rejected_key_is_not_stored() {
    let registry = NetworkRegistry::new(MemoryStore::new(), RecordingObserver::default());
    let provider = FakeProvider::rejecting(&["bad"]);

    let result = registry
        .register(&provider, CardanoNetwork::Preprod, "bad")
        .await;

    assert!(matches!(result, Err(NetworkError::ConnectionFailed(_))));
    assert!(registry.list().unwrap().is_empty());
}

#[tokio::test]
async fn switch_requires_two_networks() {
    let registry = NetworkRegistry::new(MemoryStore::new(), RecordingObserver::default());
    let provider = FakeProvider::default();

    assert!(matches!(
        registry.switch_to(&provider, CardanoNetwork::Mainnet).await,
        Err(NetworkError::ConfigurationMissing)
    ));

    registry.add(config(CardanoNetwork::Mainnet, "k1")).unwrap();
    assert!(matches!(
        registry.switch_to(&provider, CardanoNetwork::Mainnet).await,
        Err(NetworkError::AmbiguousSwitch)
    ));

    registry.add(config(CardanoNetwork::Preprod, "k2")).unwrap();
    registry
        .switch_to(&provider, CardanoNetwork::Mainnet)
        .await
        .unwrap();
    assert_eq!(
        registry.first().unwrap(),
        Some(config(CardanoNetwork::Mainnet, "k1"))
    );
    assert_eq!(provider.calls().len(), 1);
}

#[test]
fn remove_keeps_relative_order() {
    let registry = NetworkRegistry::new(MemoryStore::new(), RecordingObserver::default());
    for (network, key) in [
        (CardanoNetwork::Preview, "k3"),
        (CardanoNetwork::Mainnet, "k2"),
        (CardanoNetwork::Preprod, "k1"),
    ] {
        registry.add(config(network, key)).unwrap();
    }

    registry.remove(CardanoNetwork::Mainnet).unwrap();

    assert_eq!(
        registry.list().unwrap(),
        vec![
            config(CardanoNetwork::Preprod, "k1"),
            config(CardanoNetwork::Preview, "k3")
        ]
    );
}

#[test]
fn legacy_file_state_is_upgraded_on_first_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(
        &path,
        json!({"cardano.node": {"network": "Preprod", "apiKey": "legacy"}}).to_string(),
    )
    .unwrap();

    let status = Arc::new(StatusIndicator::new(None));
    let registry = NetworkRegistry::new(JsonFileStore::new(&path), status.clone());

    assert_eq!(
        registry.first().unwrap(),
        Some(config(CardanoNetwork::Preprod, "legacy"))
    );

    registry.add(config(CardanoNetwork::Mainnet, "k2")).unwrap();

    let reopened = JsonFileStore::new(&path);
    assert_eq!(
        reopened.get(NETWORKS_KEY).unwrap(),
        Some(json!([
            {"network": "Mainnet", "apiKey": "k2"},
            {"network": "Preprod", "apiKey": "legacy"}
        ]))
    );
    assert_eq!(status.status().label, "Cardano: Mainnet");
}
