pub mod api;
pub mod blockfrost_client;
pub mod cardanoscan_client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod services;

pub use services::network::{CardanoNetwork, NetworkConfig, NetworkRegistry};
