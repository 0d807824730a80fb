use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{App, HttpServer, middleware, web};

use crate::adapters::api::{ApiState, configure_routes};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::domain::clock::SystemClock;

const USER_AGENT: &str = concat!("garden-hub/", env!("CARGO_PKG_VERSION"));
const CORS_MAX_AGE_SECS: usize = 3600;

fn build_http_client() -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(AppError::runtime)
}

fn cors(allowed_origins: &[String]) -> Cors {
    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(["GET", "POST"])
        .allowed_headers([header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials()
        .max_age(CORS_MAX_AGE_SECS)
}

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let http = build_http_client()?;
    let api_state = ApiState::from_config(&config, http, Arc::new(SystemClock));

    if api_state.external_api.is_none() {
        tracing::warn!("API_HOST is not set; password and user routes will answer 500");
    }
    if api_state.cad_cloud.is_none() {
        tracing::warn!("CAD credentials are not set; viewer routes will answer 500");
    }

    let allowed_origins = api_state.origins.origins().to_vec();
    tracing::info!(bind = %config.http_bind, "http server starting");

    actix_web::rt::System::new()
        .block_on(async move {
            HttpServer::new(move || {
                App::new()
                    .wrap(cors(&allowed_origins))
                    .wrap(middleware::Logger::default())
                    .app_data(web::Data::new(api_state.clone()))
                    .configure(configure_routes)
            })
            .bind(&config.http_bind)?
            .run()
            .await
        })
        .map_err(AppError::runtime)
}
