use actix_cors::Cors;
use actix_web::{App, HttpServer, web::Data};
use anyhow::{Context, Result};
use cardanovsc::{
    api::Api,
    blockfrost_client::BlockfrostClient,
    cardanoscan_client::CardanoScanClient,
    config::AppConfig,
    http_client::https_client,
    services::{state_store::JsonFileStore, status::StatusIndicator},
};
use env_logger::{Builder, Env, Target};
use log::{debug, error, info, warn};
use std::{io::Write, sync::Arc};
use tokio::sync::broadcast::error::RecvError;

type ServiceApi = Api<JsonFileStore, BlockfrostClient, CardanoScanClient>;

#[actix_web::main]
async fn main() {
    if let Err(e) = run().await {
        error!("application error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    initialize();

    let config = AppConfig::get();
    let client = https_client()?;

    let store = Arc::new(JsonFileStore::new(&config.paths.state_file));
    info!("state file: {:?}", store.path());

    let api = ServiceApi::new(
        store,
        BlockfrostClient::new(client.clone(), &config.blockfrost.url_template),
        CardanoScanClient::new(client, &config.cardanoscan.base_url),
        config.paths.workspace.clone(),
    )
    .context("failed to create api")?;

    let status_task = tokio::spawn(log_status_changes(api.status.clone()));
    info!("{}", api.status.status().label);

    let api = Data::new(api);
    let port = config.server.port;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_header()
                    .allowed_methods(vec!["GET", "POST", "DELETE"])
                    .max_age(3600),
            )
            .app_data(api.clone())
            .configure(ServiceApi::configure)
    })
    .bind(("127.0.0.1", port))
    .context("failed to bind server")?
    .disable_signals()
    .run();

    info!("listening on 127.0.0.1:{port}");

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            debug!("ctrl-c received");
        },
        result = server_task => {
            match result {
                Ok(Ok(())) => debug!("server stopped normally"),
                Ok(Err(e)) => error!("server stopped with error: {e}"),
                Err(e) => error!("server task panicked: {e}"),
            }
        },
    }

    info!("shutting down");
    server_handle.stop(true).await;
    status_task.abort();

    Ok(())
}

fn initialize() {
    log_panics::init();

    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => {
            writeln!(f, "{}", record.args())
        }
    });

    builder.target(Target::Stdout).init();

    info!("module version: {}", env!("CARGO_PKG_VERSION"));
}

async fn log_status_changes(status: Arc<StatusIndicator>) {
    let mut rx = status.subscribe();

    loop {
        match rx.recv().await {
            Ok(info) => info!("{}", info.label),
            Err(RecvError::Lagged(skipped)) => warn!("status log skipped {skipped} updates"),
            Err(RecvError::Closed) => break,
        }
    }
}
