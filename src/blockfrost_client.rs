use crate::{http_client::handle_http_response, services::network::CardanoNetwork};
use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use trait_variant::make;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Amount {
    pub unit: String,
    pub quantity: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Utxo {
    pub tx_hash: String,
    pub output_index: u32,
    pub amount: Vec<Amount>,
}

impl Utxo {
    /// Lovelace held by this output; native assets are ignored
    pub fn lovelace(&self) -> Result<u64> {
        self.amount
            .iter()
            .filter(|amount| amount.unit == "lovelace")
            .try_fold(0u64, |sum, amount| {
                let quantity = amount
                    .quantity
                    .parse::<u64>()
                    .context(format!("invalid lovelace quantity: {}", amount.quantity))?;
                sum.checked_add(quantity)
                    .context("lovelace sum overflowed")
            })
    }
}

/// Blockchain data provider keyed per network
#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait BlockchainProvider {
    /// Liveness check: true iff the provider accepts `api_key` for `network`
    async fn validate_api_key(&self, network: CardanoNetwork, api_key: &str) -> bool;
    async fn utxos(
        &self,
        network: CardanoNetwork,
        api_key: &str,
        address: &str,
    ) -> Result<Vec<Utxo>>;
}

#[derive(Clone)]
pub struct BlockfrostClient {
    client: Client,
    url_template: String,
}

impl BlockfrostClient {
    pub const DEFAULT_URL_TEMPLATE: &str = "https://cardano-{network}.blockfrost.io/api/v0";

    const LATEST_BLOCK_ENDPOINT: &str = "/blocks/latest";
    const PAGE_SIZE: usize = 100;
    const PROJECT_ID_HEADER: &str = "project_id";

    /// `url_template` must contain `{network}`, replaced by the lowercase network name
    pub fn new(client: Client, url_template: impl Into<String>) -> Self {
        Self {
            client,
            url_template: url_template.into(),
        }
    }

    pub fn base_url(&self, network: CardanoNetwork) -> String {
        self.url_template.replace("{network}", network.slug())
    }

    fn build_url(&self, network: CardanoNetwork, path: &str) -> String {
        format!("{}{path}", self.base_url(network))
    }

    /// `address` becomes a single percent-encoded path segment
    fn utxos_url(&self, network: CardanoNetwork, address: &str) -> Result<Url> {
        let base = self.base_url(network);
        let mut url = Url::parse(&base).context(format!("invalid blockfrost url: {base}"))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("blockfrost url cannot have a path: {base}"))?
            .pop_if_empty()
            .extend(["addresses", address, "utxos"]);
        Ok(url)
    }

    async fn utxo_page(
        &self,
        network: CardanoNetwork,
        api_key: &str,
        address: &str,
        page: u32,
    ) -> Result<Option<Vec<Utxo>>> {
        let url = self.utxos_url(network, address)?;
        debug!("GET {url} page {page}");

        let res = self
            .client
            .get(url.clone())
            .header(Self::PROJECT_ID_HEADER, api_key)
            .query(&[("count", Self::PAGE_SIZE.to_string()), ("page", page.to_string())])
            .send()
            .await
            .context(format!("failed to send utxo request to {url}"))?;

        // unused addresses have no utxos and are reported as not found
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = handle_http_response(res, &format!("utxo request for {address}")).await?;
        let utxos = serde_json::from_str(&body).context("failed to parse utxo response")?;
        Ok(Some(utxos))
    }
}

impl BlockchainProvider for BlockfrostClient {
    async fn validate_api_key(&self, network: CardanoNetwork, api_key: &str) -> bool {
        let url = self.build_url(network, Self::LATEST_BLOCK_ENDPOINT);
        debug!("liveness check: GET {url}");

        match self
            .client
            .get(&url)
            .header(Self::PROJECT_ID_HEADER, api_key)
            .send()
            .await
        {
            Ok(res) if res.status() == StatusCode::OK => true,
            Ok(res) => {
                warn!("liveness check for {network} returned {}", res.status());
                false
            }
            Err(e) => {
                warn!("liveness check for {network} failed: {e:#}");
                false
            }
        }
    }

    async fn utxos(
        &self,
        network: CardanoNetwork,
        api_key: &str,
        address: &str,
    ) -> Result<Vec<Utxo>> {
        let mut utxos = Vec::new();
        let mut page = 1;

        while let Some(batch) = self.utxo_page(network, api_key, address, page).await? {
            let last_page = batch.len() < Self::PAGE_SIZE;
            utxos.extend(batch);
            if last_page {
                break;
            }
            page += 1;
        }

        debug!("{} utxos for {address} on {network}", utxos.len());
        Ok(utxos)
    }
}
