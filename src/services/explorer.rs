//! Read-only CardanoScan queries
//!
//! The explorer key lives in its own state slot, separate from the network
//! registry. Every query is validated locally before it is sent.

use crate::{
    cardanoscan_client::{ExplorerClient, ExplorerRequest},
    error::ExplorerError,
    services::state_store::StateStore,
};
use anyhow::Context;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State key of the CardanoScan api key
pub const EXPLORER_KEY: &str = "cardano.apiKey";

const LATEST_BLOCK: &str = "/block/latest";
const MAX_PAGE: u32 = 10_000;
const HASH_28_LEN: usize = 56;
const GOVERNANCE_ID_LEN: usize = 58;
const TX_HASH_LEN: usize = 64;
const ACTION_ID_LEN: usize = 66;
const MAX_TEXT_LEN: usize = 200;
const MAX_REWARD_ADDRESS_LEN: usize = 58;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockSelector {
    Hash(String),
    Height(u64),
    AbsoluteSlot(u64),
    EpochSlot { epoch: u64, slot: u64 },
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "query", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ExplorerQuery {
    Block { by: BlockSelector },
    LatestBlock,
    PoolDetails { pool_id: String },
    PoolStats { pool_id: String },
    PoolList { page_no: u32 },
    PoolsExpiring { page_no: u32 },
    PoolsExpired { page_no: u32 },
    AddressBalance { address: String },
    Asset {
        asset_id: Option<String>,
        fingerprint: Option<String>,
    },
    AssetsByPolicy { policy_id: String, page_no: u32 },
    AssetsByAddress { address: String, page_no: u32 },
    Transaction { hash: String },
    TransactionList { address: String, page_no: u32 },
    StakeKey { reward_address: String },
    StakeKeyAddresses { reward_address: String, page_no: u32 },
    NetworkState,
    ProtocolParams,
    CcHot { hot_hex: String },
    CcMember { cold_hex: String },
    Committee,
    CommitteeMembers {
        page_no: u32,
        #[serde(default)]
        include_expired: bool,
    },
    DRep { d_rep_id: String },
    DRepList { search: String, page_no: u32 },
    GovernanceAction { action_id: String },
}

fn required(field: &str, value: &str) -> Result<String, ExplorerError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ExplorerError::InvalidQuery(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn exact_len(field: &str, value: &str, len: usize) -> Result<String, ExplorerError> {
    let value = required(field, value)?;
    if value.chars().count() != len {
        return Err(ExplorerError::InvalidQuery(format!(
            "{field} must be exactly {len} characters"
        )));
    }
    Ok(value)
}

fn max_len(field: &str, value: &str, max: usize) -> Result<String, ExplorerError> {
    let value = required(field, value)?;
    if value.chars().count() > max {
        return Err(ExplorerError::InvalidQuery(format!(
            "{field} exceeds the maximum length of {max}"
        )));
    }
    Ok(value)
}

fn page(page_no: u32, max: Option<u32>) -> Result<u32, ExplorerError> {
    let upper = max.unwrap_or(u32::MAX);
    if !(1..=upper).contains(&page_no) {
        return Err(ExplorerError::InvalidQuery(match max {
            Some(max) => format!("pageNo must be between 1 and {max}"),
            None => "pageNo must be at least 1".to_string(),
        }));
    }
    Ok(page_no)
}

impl ExplorerQuery {
    /// Validate the inputs and build the request
    pub fn request(&self) -> Result<ExplorerRequest, ExplorerError> {
        let request = match self {
            Self::Block { by } => {
                let request = ExplorerRequest::new("/block");
                match by {
                    BlockSelector::Hash(hash) => {
                        request.param("blockHash", required("blockHash", hash)?)
                    }
                    BlockSelector::Height(height) => request.param("blockHeight", height),
                    BlockSelector::AbsoluteSlot(slot) => request.param("absoluteSlot", slot),
                    BlockSelector::EpochSlot { epoch, slot } => {
                        request.param("epoch", epoch).param("slot", slot)
                    }
                }
            }
            Self::LatestBlock => ExplorerRequest::new(LATEST_BLOCK),
            Self::PoolDetails { pool_id } => ExplorerRequest::new("/pool")
                .param("poolId", exact_len("poolId", pool_id, HASH_28_LEN)?),
            Self::PoolStats { pool_id } => ExplorerRequest::new("/pool/stats")
                .param("poolId", exact_len("poolId", pool_id, HASH_28_LEN)?),
            Self::PoolList { page_no } => {
                ExplorerRequest::new("/pool/list").param("pageNo", page(*page_no, Some(MAX_PAGE))?)
            }
            Self::PoolsExpiring { page_no } => ExplorerRequest::new("/pool/list/expiring")
                .param("pageNo", page(*page_no, Some(MAX_PAGE))?),
            Self::PoolsExpired { page_no } => ExplorerRequest::new("/pool/list/expired")
                .param("pageNo", page(*page_no, Some(MAX_PAGE))?),
            Self::AddressBalance { address } => ExplorerRequest::new("/address/balance")
                .param("address", max_len("address", address, MAX_TEXT_LEN)?),
            Self::Asset {
                asset_id,
                fingerprint,
            } => {
                let asset_id = asset_id.as_deref().map(str::trim).unwrap_or_default();
                let fingerprint = fingerprint.as_deref().map(str::trim).unwrap_or_default();

                if asset_id.chars().count() >= HASH_28_LEN {
                    ExplorerRequest::new("/asset").param("assetId", asset_id)
                } else if !fingerprint.is_empty() && fingerprint.chars().count() <= MAX_TEXT_LEN
                {
                    ExplorerRequest::new("/asset").param("fingerprint", fingerprint)
                } else {
                    return Err(ExplorerError::InvalidQuery(format!(
                        "either assetId (min length {HASH_28_LEN}) or fingerprint (max length {MAX_TEXT_LEN}) is required"
                    )));
                }
            }
            Self::AssetsByPolicy { policy_id, page_no } => {
                ExplorerRequest::new("/asset/list/byPolicyId")
                    .param("policyId", exact_len("policyId", policy_id, HASH_28_LEN)?)
                    .param("pageNo", page(*page_no, None)?)
            }
            Self::AssetsByAddress { address, page_no } => {
                ExplorerRequest::new("/asset/list/byAddress")
                    .param("address", max_len("address", address, MAX_TEXT_LEN)?)
                    .param("pageNo", page(*page_no, None)?)
            }
            Self::Transaction { hash } => ExplorerRequest::new("/transaction")
                .param("hash", exact_len("hash", hash, TX_HASH_LEN)?),
            Self::TransactionList { address, page_no } => {
                ExplorerRequest::new("/transaction/list")
                    .param("address", max_len("address", address, MAX_TEXT_LEN)?)
                    .param("pageNo", page(*page_no, None)?)
            }
            Self::StakeKey { reward_address } => ExplorerRequest::new("/rewardAccount").param(
                "rewardAddress",
                max_len("rewardAddress", reward_address, MAX_REWARD_ADDRESS_LEN)?,
            ),
            Self::StakeKeyAddresses {
                reward_address,
                page_no,
            } => ExplorerRequest::new("/rewardAccount/addresses")
                .param(
                    "rewardAddress",
                    max_len("rewardAddress", reward_address, MAX_REWARD_ADDRESS_LEN)?,
                )
                .param("pageNo", page(*page_no, None)?),
            Self::NetworkState => ExplorerRequest::new("/network/state"),
            Self::ProtocolParams => ExplorerRequest::new("/network/protocolParams"),
            Self::CcHot { hot_hex } => ExplorerRequest::new("/governance/ccHot")
                .param("hotHex", exact_len("hotHex", hot_hex, GOVERNANCE_ID_LEN)?),
            Self::CcMember { cold_hex } => ExplorerRequest::new("/governance/ccMember")
                .param("coldHex", exact_len("coldHex", cold_hex, GOVERNANCE_ID_LEN)?),
            Self::Committee => ExplorerRequest::new("/governance/committee"),
            Self::CommitteeMembers {
                page_no,
                include_expired,
            } => ExplorerRequest::new("/governance/committee/members")
                .param("pageNo", page(*page_no, None)?)
                .param("includeExpired", include_expired),
            Self::DRep { d_rep_id } => ExplorerRequest::new("/governance/dRep")
                .param("dRepId", exact_len("dRepId", d_rep_id, GOVERNANCE_ID_LEN)?),
            Self::DRepList { search, page_no } => ExplorerRequest::new("/governance/dRep/list")
                .param("search", max_len("search", search, MAX_TEXT_LEN)?)
                .param("pageNo", page(*page_no, None)?),
            Self::GovernanceAction { action_id } => ExplorerRequest::new("/governance/action")
                .param("actionId", exact_len("actionId", action_id, ACTION_ID_LEN)?),
        };

        Ok(request)
    }
}

pub struct ExplorerService;

impl ExplorerService {
    /// Store `api_key` after it answered the latest-block probe
    pub async fn store_api_key<S, C>(
        store: &S,
        client: &C,
        api_key: &str,
    ) -> Result<(), ExplorerError>
    where
        S: StateStore,
        C: ExplorerClient,
    {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ExplorerError::InvalidQuery("api key is required".to_string()));
        }

        match client
            .get(ExplorerRequest::new(LATEST_BLOCK), api_key.to_string())
            .await
        {
            Ok(block) if block.get("hash").is_some() => {}
            Ok(_) => {
                warn!("explorer key probe returned unexpected response format");
                return Err(ExplorerError::InvalidKey);
            }
            Err(e) => {
                warn!("explorer key probe failed: {e:#}");
                return Err(ExplorerError::InvalidKey);
            }
        }

        store
            .set(EXPLORER_KEY, Value::String(api_key.to_string()))
            .context("failed to store explorer api key")?;

        info!("explorer api key stored");
        Ok(())
    }

    pub fn api_key<S: StateStore>(store: &S) -> Result<String, ExplorerError> {
        match store
            .get(EXPLORER_KEY)
            .context("failed to read explorer api key")?
        {
            Some(Value::String(key)) if !key.is_empty() => Ok(key),
            _ => Err(ExplorerError::KeyMissing),
        }
    }

    pub async fn query<S, C>(
        store: &S,
        client: &C,
        query: &ExplorerQuery,
    ) -> Result<Value, ExplorerError>
    where
        S: StateStore,
        C: ExplorerClient,
    {
        let api_key = Self::api_key(store)?;
        let request = query.request()?;
        debug!("explorer query: {}", request.path);

        Ok(client.get(request, api_key).await?)
    }
}
