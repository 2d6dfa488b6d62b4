use crate::http_client::handle_http_response;
use anyhow::{Context, Result};
use log::debug;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use reqwest::{Client, header::ACCEPT};
use serde_json::Value;
use trait_variant::make;

/// One explorer GET: endpoint path plus query parameters
#[derive(Clone, Debug, PartialEq)]
pub struct ExplorerRequest {
    pub path: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl ExplorerRequest {
    pub fn new(path: &'static str) -> Self {
        Self {
            path,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }
}

#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait ExplorerClient {
    async fn get(&self, request: ExplorerRequest, api_key: String) -> Result<Value>;
}

#[derive(Clone)]
pub struct CardanoScanClient {
    client: Client,
    base_url: String,
}

impl CardanoScanClient {
    pub const DEFAULT_BASE_URL: &str = "https://api.cardanoscan.io/api/v1";

    const API_KEY_HEADER: &str = "apiKey";

    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl ExplorerClient for CardanoScanClient {
    async fn get(&self, request: ExplorerRequest, api_key: String) -> Result<Value> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("GET {url} {:?}", request.params);

        let res = self
            .client
            .get(&url)
            .header(Self::API_KEY_HEADER, api_key)
            .header(ACCEPT, "application/json")
            .query(&request.params)
            .send()
            .await
            .context(format!("failed to send request to {url}"))?;

        let body = handle_http_response(res, &format!("explorer request {}", request.path)).await?;
        serde_json::from_str(&body).context(format!("failed to parse response of {}", request.path))
    }
}
