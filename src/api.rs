use crate::{
    blockfrost_client::BlockchainProvider,
    cardanoscan_client::ExplorerClient,
    error::{ApiError, NetworkError},
    http_client::{ServiceResultResponse, handle_error_result, handle_service_result},
    json_response,
    services::{
        explorer::{ExplorerQuery, ExplorerService},
        network::{CardanoNetwork, NetworkConfig, NetworkRegistry},
        state_store::StateStore,
        status::{ActiveNetworkObserver, StatusIndicator, StatusInfo},
        wallet::{Balance, WalletExport, WalletService},
    },
};
use actix_web::{HttpResponse, Responder, ResponseError, error::InternalError, web};
use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::{fmt::Display, path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

pub type Registry<Store> = NetworkRegistry<Arc<Store>, Arc<StatusIndicator>>;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNetworkPayload {
    pub network: String,
    #[validate(max_length = 256)]
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct SwitchNetworkPayload {
    pub network: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerKeyPayload {
    #[validate(min_length = 1)]
    #[validate(max_length = 256)]
    pub api_key: String,
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExportWalletPayload {
    #[validate(min_length = 1)]
    #[validate(max_length = 200)]
    pub address: String,
    #[validate(min_length = 1)]
    pub seed_phrase: String,
    #[validate(min_length = 1)]
    pub password: String,
}

/// Registry entry as shown to the front end; the key itself never leaves
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub network: CardanoNetwork,
    pub masked_api_key: String,
}

impl From<&NetworkConfig> for NetworkSummary {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            network: config.network,
            masked_api_key: config.masked_api_key(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MnemonicResponse {
    pub mnemonic: String,
    pub words: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RemoveNetworkResponse {
    pub removed: bool,
}

json_response!(
    NetworkSummary,
    Vec<NetworkSummary>,
    Option<NetworkSummary>,
    StatusInfo,
    Balance,
    WalletExport,
    MnemonicResponse,
    RemoveNetworkResponse,
);

fn invalid_request(e: impl Display) -> HttpResponse {
    warn!("invalid request: {e}");
    HttpResponse::BadRequest().json(ApiError {
        code: "invalid_request",
        message: e.to_string(),
    })
}

pub struct Api<Store, Provider, Explorer>
where
    Store: StateStore,
    Provider: BlockchainProvider,
    Explorer: ExplorerClient,
{
    pub registry: Mutex<Registry<Store>>,
    pub store: Arc<Store>,
    pub status: Arc<StatusIndicator>,
    pub provider: Provider,
    pub explorer: Explorer,
    pub workspace: PathBuf,
}

impl<Store, Provider, Explorer> Api<Store, Provider, Explorer>
where
    Store: StateStore + 'static,
    Provider: BlockchainProvider + Sync + 'static,
    Explorer: ExplorerClient + Sync + 'static,
{
    /// Wire the registry to `store` and publish the stored active network
    pub fn new(
        store: Arc<Store>,
        provider: Provider,
        explorer: Explorer,
        workspace: PathBuf,
    ) -> Result<Self> {
        let status = Arc::new(StatusIndicator::new(None));
        let registry = NetworkRegistry::new(store.clone(), status.clone());

        let active = registry.first()?;
        status.active_network_changed(active.map(|config| config.network));

        Ok(Api {
            registry: Mutex::new(registry),
            store,
            status,
            provider,
            explorer,
            workspace,
        })
    }

    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
            let response = invalid_request(&err);
            InternalError::from_response(err, response).into()
        }))
        .route("/networks", web::get().to(Self::list_networks))
            .route("/networks", web::post().to(Self::register_network))
            .route("/networks/active", web::get().to(Self::active_network))
            .route("/networks/switch", web::get().to(Self::switch_candidates))
            .route("/networks/switch", web::post().to(Self::switch_network))
            .route("/networks/{network}", web::delete().to(Self::remove_network))
            .route("/status", web::get().to(Self::status))
            .route("/explorer/key", web::post().to(Self::set_explorer_key))
            .route("/explorer/query", web::post().to(Self::explorer_query))
            .route("/wallet/mnemonic", web::post().to(Self::generate_mnemonic))
            .route("/wallet/export", web::post().to(Self::export_wallet))
            .route(
                "/wallet/balance/{address}",
                web::get().to(Self::wallet_balance),
            )
            .route("/version", web::get().to(Self::version));
    }

    pub async fn list_networks(api: web::Data<Self>) -> impl Responder {
        debug!("list_networks() called");

        let result = api
            .registry
            .lock()
            .await
            .list()
            .map(|configs| configs.iter().map(NetworkSummary::from).collect::<Vec<_>>());

        handle_error_result(result, "list_networks")
    }

    pub async fn register_network(
        body: web::Json<RegisterNetworkPayload>,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("register_network() called: {}", body.network);

        if let Err(e) = body.validate() {
            return invalid_request(e);
        }

        handle_error_result(api.register(&body).await, "register_network")
    }

    pub async fn active_network(api: web::Data<Self>) -> impl Responder {
        debug!("active_network() called");

        let result = api
            .registry
            .lock()
            .await
            .first()
            .map(|config| config.as_ref().map(NetworkSummary::from));

        handle_error_result(result, "active_network")
    }

    pub async fn switch_candidates(api: web::Data<Self>) -> impl Responder {
        debug!("switch_candidates() called");

        let result = api
            .registry
            .lock()
            .await
            .switch_candidates()
            .map(|configs| configs.iter().map(NetworkSummary::from).collect::<Vec<_>>());

        handle_error_result(result, "switch_candidates")
    }

    pub async fn switch_network(
        body: web::Json<SwitchNetworkPayload>,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("switch_network() called: {}", body.network);

        handle_error_result(api.switch(&body.network).await, "switch_network")
    }

    pub async fn remove_network(path: web::Path<String>, api: web::Data<Self>) -> impl Responder {
        debug!("remove_network() called: {path}");

        let result = match path.parse::<CardanoNetwork>() {
            Ok(network) => api
                .registry
                .lock()
                .await
                .remove(network)
                .map(|removed| RemoveNetworkResponse { removed }),
            Err(e) => Err(e),
        };

        handle_error_result(result, "remove_network")
    }

    pub async fn status(api: web::Data<Self>) -> impl Responder {
        debug!("status() called");
        api.status.status().into_response()
    }

    pub async fn set_explorer_key(
        body: web::Json<ExplorerKeyPayload>,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("set_explorer_key() called");

        if let Err(e) = body.validate() {
            return invalid_request(e);
        }

        let result =
            ExplorerService::store_api_key(&api.store, &api.explorer, &body.api_key).await;

        handle_error_result(result, "set_explorer_key")
    }

    pub async fn explorer_query(
        body: web::Json<ExplorerQuery>,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("explorer_query() called: {body:?}");

        let result = ExplorerService::query(&api.store, &api.explorer, &body).await;

        handle_error_result(result, "explorer_query")
    }

    pub async fn generate_mnemonic() -> impl Responder {
        debug!("generate_mnemonic() called");

        let result = WalletService::generate_mnemonic().map(|mnemonic| {
            let mnemonic = mnemonic.to_string();
            let words = mnemonic.split_whitespace().map(String::from).collect();
            MnemonicResponse { mnemonic, words }
        });

        handle_service_result(result, "generate_mnemonic")
    }

    pub async fn export_wallet(
        body: web::Json<ExportWalletPayload>,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("export_wallet() called: {}", body.address);

        if let Err(e) = body.validate() {
            return invalid_request(e);
        }

        let config = match api.active_config().await {
            Ok(config) => config,
            Err(e) => return e.error_response(),
        };

        let mnemonic = match WalletService::parse_seed_phrase(&body.seed_phrase) {
            Ok(mnemonic) => mnemonic,
            Err(e) => return invalid_request(format!("{e:#}")),
        };

        let result = WalletService::export_wallet(
            &api.workspace,
            config.network,
            &body.address,
            &mnemonic,
            &body.password,
        );

        handle_service_result(result, "export_wallet")
    }

    pub async fn wallet_balance(path: web::Path<String>, api: web::Data<Self>) -> impl Responder {
        debug!("wallet_balance() called: {path}");

        if let Err(e) = WalletService::validate_address(&path) {
            return invalid_request(e);
        }

        let config = match api.active_config().await {
            Ok(config) => config,
            Err(e) => return e.error_response(),
        };

        let result =
            WalletService::balance(&api.provider, config.network, &config.api_key, &path).await;

        handle_service_result(result, "wallet_balance")
    }

    pub async fn version() -> impl Responder {
        HttpResponse::Ok().body(env!("CARGO_PKG_VERSION"))
    }

    async fn register(
        &self,
        payload: &RegisterNetworkPayload,
    ) -> Result<NetworkSummary, NetworkError> {
        let network = payload.network.parse::<CardanoNetwork>()?;

        // held across the liveness check so concurrent registrations serialize
        let registry = self.registry.lock().await;
        let config = registry
            .register(&self.provider, network, &payload.api_key)
            .await?;

        Ok(NetworkSummary::from(&config))
    }

    async fn switch(&self, network: &str) -> Result<NetworkSummary, NetworkError> {
        let network = network.parse::<CardanoNetwork>()?;

        let registry = self.registry.lock().await;
        let config = registry.switch_to(&self.provider, network).await?;

        Ok(NetworkSummary::from(&config))
    }

    async fn active_config(&self) -> Result<NetworkConfig, NetworkError> {
        self.registry.lock().await.active()
    }
}
