//! Business logic services
//!
//! Registry, explorer and wallet logic, kept free of HTTP concerns so it can
//! be driven from tests with in-memory stores and mocked providers.

pub mod explorer;
pub mod network;
pub mod seed_cipher;
pub mod state_store;
pub mod status;
pub mod wallet;
