use crate::{blockfrost_client::BlockfrostClient, cardanoscan_client::CardanoScanClient};
use anyhow::{Context, Result, ensure};
use std::{env, path::PathBuf, sync::OnceLock};

/// Application configuration loaded and validated at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Local HTTP server configuration
    pub server: ServerConfig,

    /// State and workspace locations
    pub paths: PathConfig,

    /// Blockfrost endpoint configuration
    pub blockfrost: BlockfrostConfig,

    /// CardanoScan endpoint configuration
    pub cardanoscan: CardanoScanConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct PathConfig {
    pub data_dir: PathBuf,
    pub state_file: PathBuf,
    pub workspace: PathBuf,
}

#[derive(Clone, Debug)]
pub struct BlockfrostConfig {
    pub url_template: String,
}

#[derive(Clone, Debug)]
pub struct CardanoScanConfig {
    pub base_url: String,
}

impl AppConfig {
    /// Get or load the application configuration
    ///
    /// Returns a reference to the cached configuration. The first call loads
    /// it from environment variables.
    ///
    /// # Panics
    /// Panics if configuration loading fails, the service cannot start
    /// without it.
    pub fn get() -> &'static Self {
        static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();
        APP_CONFIG.get_or_init(|| {
            Self::load_internal().expect("failed to load application configuration")
        })
    }

    fn load_internal() -> Result<Self> {
        Ok(Self {
            server: ServerConfig::load()?,
            paths: PathConfig::load()?,
            blockfrost: BlockfrostConfig::load()?,
            cardanoscan: CardanoScanConfig::load()?,
        })
    }
}

impl ServerConfig {
    fn load() -> Result<Self> {
        let port = env::var("CARDANOVSC_PORT")
            .unwrap_or_else(|_| "7743".to_string())
            .parse::<u16>()
            .context("failed to parse CARDANOVSC_PORT: invalid format")?;

        Ok(Self { port })
    }
}

impl PathConfig {
    fn load() -> Result<Self> {
        let data_dir = match env::var("CARDANOVSC_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => Self::default_data_dir()?,
        };

        std::fs::create_dir_all(&data_dir)
            .context(format!("failed to create data directory: {data_dir:?}"))?;

        let workspace = match env::var("CARDANOVSC_WORKSPACE") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => env::current_dir().context("failed to get current directory")?,
        };

        Ok(Self {
            state_file: data_dir.join("state.json"),
            data_dir,
            workspace,
        })
    }

    #[cfg(not(any(test, feature = "mock")))]
    fn default_data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(env!("CARGO_PKG_NAME")))
            .context("failed to determine platform data directory")
    }

    // In test mode, use temp directory to keep the user's state untouched
    #[cfg(any(test, feature = "mock"))]
    fn default_data_dir() -> Result<PathBuf> {
        Ok(env::temp_dir().join(concat!(env!("CARGO_PKG_NAME"), "-test")))
    }
}

impl BlockfrostConfig {
    fn load() -> Result<Self> {
        let url_template = env::var("BLOCKFROST_URL_TEMPLATE")
            .unwrap_or_else(|_| BlockfrostClient::DEFAULT_URL_TEMPLATE.to_string());

        ensure!(
            url_template.contains("{network}"),
            "failed to load BLOCKFROST_URL_TEMPLATE: missing {{network}} placeholder"
        );

        Ok(Self { url_template })
    }
}

impl CardanoScanConfig {
    fn load() -> Result<Self> {
        let base_url = env::var("CARDANOSCAN_URL")
            .unwrap_or_else(|_| CardanoScanClient::DEFAULT_BASE_URL.to_string());

        Ok(Self { base_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_apis() {
        let config = AppConfig::get();

        assert!(config.blockfrost.url_template.contains("{network}"));
        assert!(config.cardanoscan.base_url.starts_with("https://"));
        assert_eq!(config.paths.state_file.file_name().unwrap(), "state.json");
        assert!(config.paths.data_dir.exists());
    }
}
