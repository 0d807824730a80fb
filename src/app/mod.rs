mod config;
mod error;
mod logging;
mod runtime;

pub use config::{AppConfig, CadCredentials};
pub use error::AppError;

pub fn run() -> Result<(), AppError> {
    let env_file = dotenvy::dotenv();
    logging::init()?;

    if let Ok(path) = env_file {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }

    let config = AppConfig::from_env()?;

    tracing::info!(
        http_bind = %config.http_bind,
        api_configured = config.api_base_url.is_some(),
        cad_configured = config.cad_credentials.is_some(),
        cad_base_url = %config.cad_base_url,
        allowed_origins = config.allowed_origins.len(),
        token_expiry_margin_secs = config.token_expiry_margin_secs,
        "application bootstrap initialized"
    );

    runtime::run(config)
}
