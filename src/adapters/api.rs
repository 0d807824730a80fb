use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, get, post, web};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::adapters::cad_cloud::{CadCloudClient, CadError};
use crate::adapters::credentials::VIEWER_SCOPE;
use crate::adapters::upstream::{
    ExternalApiClient, ForgotPasswordRequest, ResetPasswordRequest, UpstreamError, UpstreamReply,
};
use crate::app::AppConfig;
use crate::domain::account::{Account, AccountSummary};
use crate::domain::clock::Clock;
use crate::domain::origin::OriginPolicy;
use crate::domain::telemetry::{PzemDevice, PzemLog, PzemRealtimeResponse, PzemWebSocketData};
use crate::domain::token_cache::TokenCache;

pub const AUTH_COOKIE: &str = "userAuth";

const MISCONFIGURED: &str = "Server misconfiguration";
const CAD_MISCONFIGURED: &str = "CAD credentials are not configured";
const FORBIDDEN_ORIGIN: &str = "Forbidden";
const UNAUTHORIZED: &str = "Unauthorized";
const INTERNAL_ERROR: &str = "Internal Server Error";
const REQUEST_FAILED: &str = "Request failed";

#[derive(Clone)]
pub struct ApiState {
    pub external_api: Option<ExternalApiClient>,
    pub cad_cloud: Option<CadCloudClient>,
    pub origins: OriginPolicy,
    pub clock: Arc<dyn Clock>,
}

impl ApiState {
    pub fn from_config(config: &AppConfig, http: reqwest::Client, clock: Arc<dyn Clock>) -> Self {
        let tokens = Arc::new(TokenCache::new(
            Arc::clone(&clock),
            config.token_expiry_margin_secs,
        ));

        Self {
            external_api: config
                .api_base_url
                .as_deref()
                .map(|base_url| ExternalApiClient::new(http.clone(), base_url)),
            cad_cloud: config.cad_credentials.clone().map(|credentials| {
                CadCloudClient::new(http.clone(), &config.cad_base_url, credentials, tokens)
            }),
            origins: OriginPolicy::new(config.allowed_origins.clone()),
            clock,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForgotRequestBody {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResetRequestBody {
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(create_bucket_endpoint)
        .service(oauth_token_endpoint)
        .service(forgot_request_endpoint)
        .service(forgot_reset_endpoint)
        .service(user_info_endpoint)
        .service(account_summary_endpoint)
        .service(pzem_realtime_endpoint)
        .service(pzem_live_endpoint)
        .service(pzem_logs_endpoint);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[post("/api/create-bucket")]
async fn create_bucket_endpoint(state: web::Data<ApiState>) -> HttpResponse {
    let request_id = Uuid::new_v4();
    let Some(cad) = state.cad_cloud.as_ref() else {
        tracing::error!(%request_id, route = "create-bucket", "cad credentials missing");
        return error_envelope(StatusCode::INTERNAL_SERVER_ERROR, CAD_MISCONFIGURED);
    };

    match cad.create_bucket().await {
        Ok(bucket) => {
            tracing::info!(%request_id, route = "create-bucket", bucket_key = %bucket.bucket_key, "bucket ready");
            HttpResponse::Ok().json(bucket)
        }
        Err(error) => cad_error_response(request_id, "create-bucket", "Failed to create bucket", error),
    }
}

#[post("/api/oauth/token")]
async fn oauth_token_endpoint(state: web::Data<ApiState>) -> HttpResponse {
    let request_id = Uuid::new_v4();
    let Some(cad) = state.cad_cloud.as_ref() else {
        tracing::error!(%request_id, route = "oauth/token", "cad credentials missing");
        return error_envelope(StatusCode::INTERNAL_SERVER_ERROR, CAD_MISCONFIGURED);
    };

    match cad.request_token(VIEWER_SCOPE).await {
        Ok(token) => {
            tracing::info!(%request_id, route = "oauth/token", expires_in = token.expires_in, "viewer token issued");
            HttpResponse::Ok().json(token)
        }
        Err(error) => cad_error_response(
            request_id,
            "oauth/token",
            "Failed to obtain access token",
            error,
        ),
    }
}

#[post("/api/forgot/request")]
async fn forgot_request_endpoint(
    state: web::Data<ApiState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let request_id = Uuid::new_v4();
    let api = match guarded_api(&state, &req) {
        Ok(api) => api,
        Err(response) => return response,
    };

    let Some(body) = parse_body::<ForgotRequestBody>(&body) else {
        return message(StatusCode::BAD_REQUEST, "Invalid request body");
    };
    let Some(email) = required(body.email) else {
        return message(StatusCode::BAD_REQUEST, "Email is required");
    };

    let result = api.forgot_request(&ForgotPasswordRequest { email }).await;
    relay(request_id, "forgot/request", result)
}

#[post("/api/forgot/reset")]
async fn forgot_reset_endpoint(
    state: web::Data<ApiState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let request_id = Uuid::new_v4();
    let api = match guarded_api(&state, &req) {
        Ok(api) => api,
        Err(response) => return response,
    };

    let Some(body) = parse_body::<ResetRequestBody>(&body) else {
        return message(StatusCode::BAD_REQUEST, "Invalid request body");
    };
    let (Some(password), Some(token)) = (required(body.password), required(body.token)) else {
        return message(StatusCode::BAD_REQUEST, "Password and token are required");
    };

    let result = api
        .forgot_reset(&ResetPasswordRequest { password, token })
        .await;
    relay(request_id, "forgot/reset", result)
}

#[get("/api/user-info")]
async fn user_info_endpoint(state: web::Data<ApiState>, req: HttpRequest) -> HttpResponse {
    let request_id = Uuid::new_v4();
    let (api, token) = match authenticated_api(&state, &req) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    relay(request_id, "user-info", api.user_info(&token).await)
}

#[get("/api/account/summary")]
async fn account_summary_endpoint(state: web::Data<ApiState>, req: HttpRequest) -> HttpResponse {
    let request_id = Uuid::new_v4();
    let (api, token) = match authenticated_api(&state, &req) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    let result = api.user_info(&token).await;
    match decode_reply::<Account>(request_id, "account/summary", result) {
        Ok(account) => HttpResponse::Ok().json(AccountSummary::from_account(
            &account,
            state.clock.now().to_datetime(),
        )),
        Err(response) => response,
    }
}

#[get("/api/pzem/{device_id}/realtime")]
async fn pzem_realtime_endpoint(
    state: web::Data<ApiState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    match fetch_realtime(&state, &req, &path.into_inner(), "pzem/realtime").await {
        Ok(realtime) => HttpResponse::Ok().json(realtime),
        Err(response) => response,
    }
}

#[get("/api/pzem/{device_id}/live")]
async fn pzem_live_endpoint(
    state: web::Data<ApiState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    match fetch_realtime(&state, &req, &path.into_inner(), "pzem/live").await {
        Ok(realtime) => HttpResponse::Ok().json(PzemWebSocketData::from(&realtime)),
        Err(response) => response,
    }
}

#[get("/api/pzem/{device_id}/logs")]
async fn pzem_logs_endpoint(
    state: web::Data<ApiState>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<ListQuery>,
) -> HttpResponse {
    let request_id = Uuid::new_v4();
    let device_id = path.into_inner();
    if !is_valid_device_id(&device_id) {
        return message(StatusCode::BAD_REQUEST, "Invalid device id");
    }
    let (api, token) = match authenticated_api(&state, &req) {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let result = api.pzem_logs(&token, &device_id, limit).await;
    match decode_reply::<Vec<PzemLog>>(request_id, "pzem/logs", result) {
        Ok(logs) => HttpResponse::Ok().json(logs),
        Err(response) => response,
    }
}

async fn fetch_realtime(
    state: &ApiState,
    req: &HttpRequest,
    device_id: &str,
    route: &'static str,
) -> Result<PzemRealtimeResponse, HttpResponse> {
    let request_id = Uuid::new_v4();
    if !is_valid_device_id(device_id) {
        return Err(message(StatusCode::BAD_REQUEST, "Invalid device id"));
    }
    let (api, token) = authenticated_api(state, req)?;

    let result = api.pzem_device(&token, device_id).await;
    decode_reply::<PzemDevice>(request_id, route, result).map(PzemRealtimeResponse::from_device)
}

fn guarded_api<'a>(
    state: &'a ApiState,
    req: &HttpRequest,
) -> Result<&'a ExternalApiClient, HttpResponse> {
    let Some(api) = state.external_api.as_ref() else {
        tracing::error!("API_HOST is not configured");
        return Err(message(StatusCode::INTERNAL_SERVER_ERROR, MISCONFIGURED));
    };

    let origin = req
        .headers()
        .get(actix_web::http::header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if !state.origins.is_allowed(origin) {
        tracing::warn!(origin = origin.unwrap_or("<none>"), "rejected request from origin");
        return Err(message(StatusCode::FORBIDDEN, FORBIDDEN_ORIGIN));
    }

    Ok(api)
}

fn authenticated_api<'a>(
    state: &'a ApiState,
    req: &HttpRequest,
) -> Result<(&'a ExternalApiClient, String), HttpResponse> {
    let Some(api) = state.external_api.as_ref() else {
        tracing::error!("API_HOST is not configured");
        return Err(message(StatusCode::INTERNAL_SERVER_ERROR, MISCONFIGURED));
    };

    let token = req
        .cookie(AUTH_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| message(StatusCode::UNAUTHORIZED, UNAUTHORIZED))?;

    Ok((api, token))
}

fn relay(
    request_id: Uuid,
    route: &'static str,
    result: Result<UpstreamReply, UpstreamError>,
) -> HttpResponse {
    match result {
        Ok(reply) if reply.is_success() => {
            tracing::info!(%request_id, route, status = reply.status, "proxied request");
            HttpResponse::Ok().json(reply.body)
        }
        Ok(reply) => upstream_failure(request_id, route, &reply),
        Err(error) => upstream_error(request_id, route, &error),
    }
}

fn decode_reply<T: DeserializeOwned>(
    request_id: Uuid,
    route: &'static str,
    result: Result<UpstreamReply, UpstreamError>,
) -> Result<T, HttpResponse> {
    match result {
        Ok(reply) if reply.is_success() => {
            tracing::info!(%request_id, route, status = reply.status, "proxied request");
            serde_json::from_value(reply.body).map_err(|error| {
                tracing::error!(%request_id, route, error = %error, "unexpected upstream payload");
                message(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            })
        }
        Ok(reply) => Err(upstream_failure(request_id, route, &reply)),
        Err(error) => Err(upstream_error(request_id, route, &error)),
    }
}

fn upstream_failure(request_id: Uuid, route: &'static str, reply: &UpstreamReply) -> HttpResponse {
    tracing::warn!(%request_id, route, status = reply.status, "upstream rejected request");
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    message(status, reply.message().unwrap_or(REQUEST_FAILED))
}

fn upstream_error(request_id: Uuid, route: &'static str, error: &UpstreamError) -> HttpResponse {
    tracing::error!(%request_id, route, error = %error, "upstream call failed");
    message(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
}

fn cad_error_response(
    request_id: Uuid,
    route: &'static str,
    text: &str,
    error: CadError,
) -> HttpResponse {
    match &error {
        CadError::Upstream { status, .. } => {
            tracing::warn!(%request_id, route, upstream_status = *status, error = %error, "cad cloud rejected request");
        }
        CadError::Transport(_) => {
            tracing::error!(%request_id, route, error = %error, "cad cloud unreachable");
        }
        CadError::Decode(_) => {
            tracing::error!(%request_id, route, error = %error, "cad cloud sent an unexpected payload");
        }
        CadError::InvalidUrl(_) => {
            tracing::error!(%request_id, route, error = %error, "cad cloud url is invalid");
        }
    }
    error_envelope(StatusCode::INTERNAL_SERVER_ERROR, text)
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Option<T> {
    serde_json::from_slice(body).ok()
}

fn required(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn is_valid_device_id(device_id: &str) -> bool {
    !device_id.is_empty()
        && device_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn message(status: StatusCode, text: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "message": text }))
}

fn error_envelope(status: StatusCode, text: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "error": text }))
}
