use actix_web::{HttpResponse, ResponseError};
use anyhow::{Context, Result, ensure};
use log::{error, warn};
use reqwest::{Client, Response};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTPS client shared by the Blockfrost and CardanoScan clients
pub fn https_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to create https client")
}

/// Trait for converting service results into HTTP responses
pub trait ServiceResultResponse {
    fn into_response(self) -> HttpResponse;
}

impl ServiceResultResponse for () {
    fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().finish()
    }
}

impl ServiceResultResponse for String {
    fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().body(self)
    }
}

impl ServiceResultResponse for serde_json::Value {
    fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().json(self)
    }
}

/// Implements [`ServiceResultResponse`] as a JSON body for serializable types
#[macro_export]
macro_rules! json_response {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::http_client::ServiceResultResponse for $ty {
                fn into_response(self) -> actix_web::HttpResponse {
                    match serde_json::to_string(&self) {
                        Ok(json) => actix_web::HttpResponse::Ok()
                            .content_type("application/json")
                            .body(json),
                        Err(e) => {
                            log::error!("failed to serialize {}: {e:#}", stringify!($ty));
                            actix_web::HttpResponse::InternalServerError()
                                .body("failed to serialize response")
                        }
                    }
                }
            }
        )+
    };
}

/// Handle Result and convert data to Response
///
/// Untyped failures are reported as internal server errors.
///
/// # Arguments
/// * `result` - The Result to handle
/// * `operation` - Context message describing the operation
pub fn handle_service_result<T>(result: Result<T>, operation: &str) -> HttpResponse
where
    T: ServiceResultResponse,
{
    match result {
        Ok(data) => data.into_response(),
        Err(e) => {
            error!("{operation} failed: {e:#}");
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

/// Like [`handle_service_result`] for typed errors carrying their own status code
pub fn handle_error_result<T, E>(result: Result<T, E>, operation: &str) -> HttpResponse
where
    T: ServiceResultResponse,
    E: ResponseError,
{
    match result {
        Ok(data) => data.into_response(),
        Err(e) => {
            if e.status_code().is_server_error() {
                error!("{operation} failed: {e}");
            } else {
                warn!("{operation} rejected: {e}");
            }
            e.error_response()
        }
    }
}

/// Handle HTTP response by checking status and extracting body
///
/// # Arguments
/// * `res` - The HTTP response to handle
/// * `context_msg` - Context message describing the request (e.g., "utxo request")
///
/// # Returns
/// * `Ok(String)` - The response body if the status is successful
/// * `Err` - If the status is not successful or reading the body fails
pub async fn handle_http_response(res: Response, context_msg: &str) -> Result<String> {
    let status = res.status();
    let body = res.text().await.context("failed to read response body")?;

    ensure!(
        status.is_success(),
        "{context_msg} failed with status {status} and body: {body}"
    );

    Ok(body)
}
