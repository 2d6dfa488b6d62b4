//! Network configuration registry
//!
//! Holds the ordered list of registered Cardano networks (at most
//! [`MAX_NETWORKS`]). Index 0 is the active network used by every
//! downstream request. Every operation reads the persisted value fully,
//! computes the new list and writes it back as a whole.

use crate::{
    blockfrost_client::BlockchainProvider,
    error::NetworkError,
    services::{state_store::StateStore, status::ActiveNetworkObserver},
};
use anyhow::Context;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

/// State key of the registry list
pub const NETWORKS_KEY: &str = "cardano.node";

pub const MAX_NETWORKS: usize = 3;

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CardanoNetwork {
    #[serde(alias = "mainnet")]
    Mainnet,
    #[serde(alias = "preprod")]
    Preprod,
    #[serde(alias = "preview")]
    Preview,
}

impl CardanoNetwork {
    pub const ALL: [CardanoNetwork; 3] = [Self::Mainnet, Self::Preprod, Self::Preview];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "Mainnet",
            Self::Preprod => "Preprod",
            Self::Preview => "Preview",
        }
    }

    /// Lowercase form used in provider hostnames
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Preprod => "preprod",
            Self::Preview => "preview",
        }
    }
}

impl fmt::Display for CardanoNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardanoNetwork {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|network| network.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| NetworkError::UnknownNetwork(s.to_string()))
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub network: CardanoNetwork,
    pub api_key: String,
}

impl NetworkConfig {
    pub fn new(network: CardanoNetwork, api_key: impl Into<String>) -> Self {
        Self {
            network,
            api_key: api_key.into(),
        }
    }

    /// First and last four characters of the key, e.g. `prev...x9Zq`
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 8 {
            return "****".to_string();
        }

        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

/// Shapes the registry value can take in storage
#[derive(Debug, PartialEq)]
pub enum StoredNetworks {
    Empty,
    Single(NetworkConfig),
    Many(Vec<NetworkConfig>),
}

impl StoredNetworks {
    /// Classify a raw stored value. Anything unreadable becomes `Empty`.
    pub fn from_value(value: Option<Value>) -> Self {
        let value = match value {
            None | Some(Value::Null) => return Self::Empty,
            Some(value) => value,
        };

        if value.is_array() {
            match serde_json::from_value::<Vec<NetworkConfig>>(value) {
                Ok(configs) => Self::Many(configs),
                Err(e) => {
                    warn!("ignoring malformed network list in storage: {e}");
                    Self::Empty
                }
            }
        } else {
            match serde_json::from_value::<NetworkConfig>(value) {
                Ok(config) => Self::Single(config),
                Err(e) => {
                    warn!("ignoring malformed network entry in storage: {e}");
                    Self::Empty
                }
            }
        }
    }

    /// Registry list in canonical form: first entry per network wins,
    /// at most [`MAX_NETWORKS`] entries
    pub fn into_configs(self) -> Vec<NetworkConfig> {
        let configs = match self {
            Self::Empty => return Vec::new(),
            Self::Single(config) => return vec![config],
            Self::Many(configs) => configs,
        };

        let mut canonical: Vec<NetworkConfig> = Vec::with_capacity(MAX_NETWORKS);
        for config in configs {
            if canonical.iter().any(|kept| kept.network == config.network) {
                warn!("dropping duplicate {} entry from storage", config.network);
            } else if canonical.len() == MAX_NETWORKS {
                warn!("dropping {} entry beyond capacity", config.network);
            } else {
                canonical.push(config);
            }
        }
        canonical
    }
}

// ============================================================================
// Registry
// ============================================================================

pub struct NetworkRegistry<S, O>
where
    S: StateStore,
    O: ActiveNetworkObserver,
{
    store: S,
    observer: O,
}

impl<S, O> NetworkRegistry<S, O>
where
    S: StateStore,
    O: ActiveNetworkObserver,
{
    pub fn new(store: S, observer: O) -> Self {
        Self { store, observer }
    }

    /// Snapshot of the registered networks, most recently activated first
    pub fn list(&self) -> Result<Vec<NetworkConfig>, NetworkError> {
        let value = self.store.get(NETWORKS_KEY)?;
        Ok(StoredNetworks::from_value(value).into_configs())
    }

    /// The active network, if any
    pub fn first(&self) -> Result<Option<NetworkConfig>, NetworkError> {
        Ok(self.list()?.into_iter().next())
    }

    /// The active network, required by wallet and query flows
    pub fn active(&self) -> Result<NetworkConfig, NetworkError> {
        self.first()?.ok_or(NetworkError::ConfigurationMissing)
    }

    /// Insert or replace `config` at index 0, evicting beyond [`MAX_NETWORKS`]
    pub fn add(&self, config: NetworkConfig) -> Result<(), NetworkError> {
        info!("add network config: {}", config.network);

        let mut configs = self.list()?;
        configs.retain(|existing| existing.network != config.network);
        configs.insert(0, config);

        if configs.len() > MAX_NETWORKS {
            for evicted in &configs[MAX_NETWORKS..] {
                info!("evict network config: {}", evicted.network);
            }
            configs.truncate(MAX_NETWORKS);
        }

        self.persist(&configs)
    }

    /// Check the credential against the network, then [`Self::add`] it
    pub async fn register<P>(
        &self,
        provider: &P,
        network: CardanoNetwork,
        api_key: &str,
    ) -> Result<NetworkConfig, NetworkError>
    where
        P: BlockchainProvider,
    {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(NetworkError::InvalidApiKey);
        }

        if !provider.validate_api_key(network, api_key).await {
            return Err(NetworkError::ConnectionFailed(network));
        }

        let config = NetworkConfig::new(network, api_key);
        self.add(config.clone())?;
        Ok(config)
    }

    /// Move `network` to index 0 if its credential still passes the liveness check
    ///
    /// On any failure the stored list is left untouched.
    pub async fn activate<P>(
        &self,
        provider: &P,
        network: CardanoNetwork,
    ) -> Result<NetworkConfig, NetworkError>
    where
        P: BlockchainProvider,
    {
        let configs = self.list()?;

        let Some(selected) = configs
            .iter()
            .find(|config| config.network == network)
            .cloned()
        else {
            return Err(NetworkError::NotFound(network));
        };

        if !provider
            .validate_api_key(selected.network, &selected.api_key)
            .await
        {
            warn!("activation of {network} failed liveness check");
            return Err(NetworkError::ConnectionFailed(network));
        }

        let mut reordered: Vec<NetworkConfig> = configs
            .into_iter()
            .filter(|config| config.network != network)
            .collect();
        reordered.insert(0, selected.clone());

        info!("activate network config: {network}");
        self.persist(&reordered)?;
        Ok(selected)
    }

    /// Drop `network` if present; returns whether an entry was removed
    pub fn remove(&self, network: CardanoNetwork) -> Result<bool, NetworkError> {
        let mut configs = self.list()?;
        let count = configs.len();
        configs.retain(|config| config.network != network);

        let removed = configs.len() != count;
        if removed {
            info!("remove network config: {network}");
        } else {
            debug!("remove network config: {network} not registered");
        }

        self.persist(&configs)?;
        Ok(removed)
    }

    /// Networks offered when the user asks to switch
    ///
    /// Switching needs at least two entries; zero and one are reported
    /// as distinct errors so the caller can prompt accordingly.
    pub fn switch_candidates(&self) -> Result<Vec<NetworkConfig>, NetworkError> {
        let configs = self.list()?;
        match configs.len() {
            0 => Err(NetworkError::ConfigurationMissing),
            1 => Err(NetworkError::AmbiguousSwitch),
            _ => Ok(configs),
        }
    }

    pub async fn switch_to<P>(
        &self,
        provider: &P,
        network: CardanoNetwork,
    ) -> Result<NetworkConfig, NetworkError>
    where
        P: BlockchainProvider,
    {
        self.switch_candidates()?;
        self.activate(provider, network).await
    }

    fn persist(&self, configs: &[NetworkConfig]) -> Result<(), NetworkError> {
        let value = serde_json::to_value(configs).context("failed to serialize network configs")?;
        self.store.set(NETWORKS_KEY, value)?;

        self.observer
            .active_network_changed(configs.first().map(|config| config.network));
        Ok(())
    }
}
