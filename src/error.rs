//! Typed failures of the registry and explorer flows
//!
//! Callers branch on these variants (prompt for a key, offer an add flow,
//! report a bad credential), so they are kept distinct instead of being
//! folded into `anyhow::Error`. The HTTP layer maps each variant to a
//! status code and a JSON body.

use crate::services::network::CardanoNetwork;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("no Cardano network configured")]
    ConfigurationMissing,
    #[error("only one network configured, add another network to switch")]
    AmbiguousSwitch,
    #[error("network {0} is not registered")]
    NotFound(CardanoNetwork),
    #[error("failed to connect to {0}, check the api key")]
    ConnectionFailed(CardanoNetwork),
    #[error("api key must not be empty")]
    InvalidApiKey,
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
    #[error("state storage failed: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl NetworkError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigurationMissing => "configuration_missing",
            Self::AmbiguousSwitch => "ambiguous_switch",
            Self::NotFound(_) => "not_found",
            Self::ConnectionFailed(_) => "connection_failed",
            Self::InvalidApiKey => "invalid_api_key",
            Self::UnknownNetwork(_) => "unknown_network",
            Self::Storage(_) => "storage",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("explorer api key is not set")]
    KeyMissing,
    #[error("explorer rejected the api key")]
    InvalidKey,
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("explorer request failed: {0:#}")]
    Failed(#[from] anyhow::Error),
}

impl ExplorerError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::KeyMissing => "explorer_key_missing",
            Self::InvalidKey => "explorer_key_invalid",
            Self::InvalidQuery(_) => "invalid_query",
            Self::Failed(_) => "explorer_failed",
        }
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
}

impl ResponseError for NetworkError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ConfigurationMissing => StatusCode::PRECONDITION_FAILED,
            Self::AmbiguousSwitch => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ConnectionFailed(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidApiKey | Self::UnknownNetwork(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiError {
            code: self.code(),
            message: self.to_string(),
        })
    }
}

impl ResponseError for ExplorerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::KeyMissing => StatusCode::PRECONDITION_FAILED,
            Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::InvalidKey | Self::Failed(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiError {
            code: self.code(),
            message: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_map_to_status() {
        assert_eq!(
            NetworkError::ConfigurationMissing.status_code(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            NetworkError::AmbiguousSwitch.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            NetworkError::NotFound(CardanoNetwork::Preview).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            NetworkError::ConnectionFailed(CardanoNetwork::Mainnet).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            NetworkError::Storage(anyhow::anyhow!("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn explorer_errors_map_to_status() {
        assert_eq!(
            ExplorerError::KeyMissing.status_code(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            ExplorerError::InvalidQuery("poolId".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn messages_name_the_network() {
        assert_eq!(
            NetworkError::ConnectionFailed(CardanoNetwork::Preprod).to_string(),
            "failed to connect to Preprod, check the api key"
        );
    }
}
