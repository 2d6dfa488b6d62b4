//! Wallet helpers that do not need a wallet SDK
//!
//! Address derivation stays with the front end; this side generates and
//! checks seed phrases, seals them into export files and sums balances.

use crate::{
    blockfrost_client::BlockchainProvider,
    services::{network::CardanoNetwork, seed_cipher::SeedCipher},
};
use anyhow::{Context, Result, ensure};
use bip39::{Language, Mnemonic};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize, Serializer};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const SEED_WORD_COUNT: usize = 24;
pub const LOVELACE_PER_ADA: u64 = 1_000_000;
pub const WALLET_DIR: &str = "wallet_details";
pub const MAX_ADDRESS_LEN: usize = 200;

/// Content of an exported wallet file
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub address: String,
    pub network: CardanoNetwork,
    pub encrypted_seed: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletExport {
    pub address: String,
    pub network: CardanoNetwork,
    /// Relative to the workspace root
    pub file_path: PathBuf,
}

fn as_string<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Balance {
    #[serde(serialize_with = "as_string")]
    pub lovelace: u128,
    pub ada: f64,
}

impl Balance {
    pub fn from_lovelace(lovelace: u128) -> Self {
        Self {
            lovelace,
            ada: lovelace as f64 / LOVELACE_PER_ADA as f64,
        }
    }
}

pub struct WalletService;

impl WalletService {
    pub fn generate_mnemonic() -> Result<Mnemonic> {
        Mnemonic::generate_in(Language::English, SEED_WORD_COUNT)
            .context("failed to generate mnemonic")
    }

    /// Accept a user-typed phrase: any whitespace, surrounding blanks, checksum verified
    pub fn parse_seed_phrase(phrase: &str) -> Result<Mnemonic> {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        ensure!(
            words.len() == SEED_WORD_COUNT,
            "please enter all {SEED_WORD_COUNT} seed words, got {}",
            words.len()
        );

        Mnemonic::parse_in_normalized(Language::English, &words.join(" "))
            .context("invalid seed phrase")
    }

    /// Bech32 and base58 addresses only use ascii letters and digits;
    /// `_` separates the human readable prefix, e.g. `addr_test1...`
    pub fn validate_address(address: &str) -> Result<()> {
        ensure!(!address.is_empty(), "address must not be empty");
        ensure!(
            address.len() <= MAX_ADDRESS_LEN,
            "address longer than {MAX_ADDRESS_LEN} characters"
        );
        ensure!(
            address
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "address contains invalid characters: {address}"
        );
        Ok(())
    }

    /// File-name-safe form of an address
    pub fn sanitize_address(address: &str) -> String {
        address
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }

    pub fn export_path(network: CardanoNetwork, address: &str) -> PathBuf {
        Path::new(WALLET_DIR)
            .join(network.as_str())
            .join(format!("{}.json", Self::sanitize_address(address)))
    }

    /// Seal `mnemonic` with `password` and write the record below `workspace`
    pub fn export_wallet(
        workspace: &Path,
        network: CardanoNetwork,
        address: &str,
        mnemonic: &Mnemonic,
        password: &str,
    ) -> Result<WalletExport> {
        let address = address.trim();
        ensure!(!address.is_empty(), "address must not be empty");

        let record = WalletRecord {
            address: address.to_string(),
            network,
            encrypted_seed: SeedCipher::encrypt(&mnemonic.to_string(), password)
                .context("failed to encrypt seed")?,
            created_at: Utc::now(),
        };

        let file_path = Self::export_path(network, address);
        let full_path = workspace.join(&file_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .context(format!("failed to create wallet directory: {parent:?}"))?;
        }

        let content =
            serde_json::to_string_pretty(&record).context("failed to serialize wallet record")?;
        fs::write(&full_path, content)
            .context(format!("failed to write wallet file: {full_path:?}"))?;

        info!("wallet exported to {file_path:?}");

        Ok(WalletExport {
            address: record.address,
            network,
            file_path,
        })
    }

    pub fn read_wallet(path: &Path) -> Result<WalletRecord> {
        let content =
            fs::read_to_string(path).context(format!("failed to read wallet file: {path:?}"))?;
        serde_json::from_str(&content).context(format!("failed to parse wallet file: {path:?}"))
    }

    pub fn reveal_seed(record: &WalletRecord, password: &str) -> Result<Mnemonic> {
        let phrase = SeedCipher::decrypt(&record.encrypted_seed, password)?;
        Self::parse_seed_phrase(&phrase)
    }

    /// Sum of lovelace over all UTXOs at `address`
    pub async fn balance<P>(
        provider: &P,
        network: CardanoNetwork,
        api_key: &str,
        address: &str,
    ) -> Result<Balance>
    where
        P: BlockchainProvider,
    {
        let utxos = provider
            .utxos(network, api_key, address)
            .await
            .context(format!("failed to fetch utxos for {address}"))?;

        let mut lovelace: u128 = 0;
        for utxo in &utxos {
            lovelace += u128::from(utxo.lovelace()?);
        }

        debug!("balance of {address}: {lovelace} lovelace");
        Ok(Balance::from_lovelace(lovelace))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockfrost_client::{Amount, MockBlockchainProvider, Utxo};
    use tempfile::TempDir;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";
    const ADDRESS: &str = "addr_test1qpw0djgj0x59ngrjvqthn7enhvruxnsavsw5th63la3mjel3tkc974sr23jmlzgq5zda4gtv8k9cy38756r9y3qgmkqqjz6aa7";

    mod address {
        use super::*;

        #[test]
        fn accepts_bech32_address() {
            assert!(WalletService::validate_address(ADDRESS).is_ok());
        }

        #[test]
        fn rejects_url_syntax_and_oversized_input() {
            let oversized = "a".repeat(MAX_ADDRESS_LEN + 1);
            for address in [
                "",
                "addr_test1?count=1",
                "addr_test1#x",
                "../../blocks/latest",
                "addr test1",
                oversized.as_str(),
            ] {
                assert!(
                    WalletService::validate_address(address).is_err(),
                    "{address} accepted"
                );
            }
        }
    }

    mod seed_phrase {
        use super::*;

        #[test]
        fn generated_phrase_has_24_words() {
            let mnemonic = WalletService::generate_mnemonic().unwrap();
            assert_eq!(mnemonic.word_count(), SEED_WORD_COUNT);
            assert!(WalletService::parse_seed_phrase(&mnemonic.to_string()).is_ok());
        }

        #[test]
        fn normalizes_whitespace() {
            let messy = format!("  {}\n", PHRASE.replace(' ', "  \t"));
            let mnemonic = WalletService::parse_seed_phrase(&messy).unwrap();
            assert_eq!(mnemonic.to_string(), PHRASE);
        }

        #[test]
        fn rejects_short_phrase() {
            let err = WalletService::parse_seed_phrase("abandon abandon art").unwrap_err();
            assert!(err.to_string().contains("all 24 seed words"));
        }

        #[test]
        fn rejects_bad_checksum() {
            let phrase = PHRASE.replace("art", "abandon");
            assert!(WalletService::parse_seed_phrase(&phrase).is_err());
        }
    }

    mod export {
        use super::*;

        #[test]
        fn sanitizes_address() {
            assert_eq!(WalletService::sanitize_address("addr_test1+q/z"), "addr_test1_q_z");
        }

        #[test]
        fn writes_record_below_network_dir() {
            let workspace = TempDir::new().unwrap();
            let mnemonic = WalletService::parse_seed_phrase(PHRASE).unwrap();

            let export = WalletService::export_wallet(
                workspace.path(),
                CardanoNetwork::Preprod,
                ADDRESS,
                &mnemonic,
                "secret",
            )
            .unwrap();

            assert_eq!(
                export.file_path,
                Path::new("wallet_details")
                    .join("Preprod")
                    .join(format!("{ADDRESS}.json"))
            );

            let record = WalletService::read_wallet(&workspace.path().join(&export.file_path))
                .unwrap();
            assert_eq!(record.address, ADDRESS);
            assert_eq!(record.network, CardanoNetwork::Preprod);
            assert_ne!(record.encrypted_seed, PHRASE);

            let revealed = WalletService::reveal_seed(&record, "secret").unwrap();
            assert_eq!(revealed.to_string(), PHRASE);
            assert!(WalletService::reveal_seed(&record, "nope").is_err());
        }

        #[test]
        fn record_uses_camel_case_keys() {
            let workspace = TempDir::new().unwrap();
            let mnemonic = WalletService::parse_seed_phrase(PHRASE).unwrap();

            let export = WalletService::export_wallet(
                workspace.path(),
                CardanoNetwork::Mainnet,
                "addr1xyz",
                &mnemonic,
                "secret",
            )
            .unwrap();

            let raw = fs::read_to_string(workspace.path().join(export.file_path)).unwrap();
            let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
            assert!(json.get("encryptedSeed").is_some());
            assert!(json.get("createdAt").is_some());
            assert_eq!(json["network"], "Mainnet");
        }
    }

    mod balance {
        use super::*;

        fn lovelace_utxo(quantity: &str) -> Utxo {
            Utxo {
                tx_hash: "00".repeat(32),
                output_index: 0,
                amount: vec![Amount {
                    unit: "lovelace".into(),
                    quantity: quantity.into(),
                }],
            }
        }

        #[tokio::test]
        async fn sums_all_utxos() {
            let mut provider = MockBlockchainProvider::default();
            provider
                .expect_utxos()
                .withf(|network, key, address| {
                    *network == CardanoNetwork::Preview && key == "k" && address == "addr"
                })
                .returning(|_, _, _| {
                    Box::pin(async {
                        Ok(vec![lovelace_utxo("1500000"), lovelace_utxo("2500000")])
                    })
                });

            let balance = WalletService::balance(&provider, CardanoNetwork::Preview, "k", "addr")
                .await
                .unwrap();

            assert_eq!(balance, Balance::from_lovelace(4_000_000));
            assert_eq!(balance.ada, 4.0);
        }

        #[tokio::test]
        async fn empty_address_is_zero() {
            let mut provider = MockBlockchainProvider::default();
            provider
                .expect_utxos()
                .returning(|_, _, _| Box::pin(async { Ok(Vec::new()) }));

            let balance = WalletService::balance(&provider, CardanoNetwork::Mainnet, "k", "addr")
                .await
                .unwrap();

            assert_eq!(balance.lovelace, 0);
        }

        #[test]
        fn lovelace_serialized_as_string() {
            let json = serde_json::to_value(Balance::from_lovelace(42)).unwrap();
            assert_eq!(json, serde_json::json!({"lovelace": "42", "ada": 0.000042}));
        }
    }
}
