use crate::app::AppError;

const DEFAULT_CAD_BASE_URL: &str = "https://developer.api.autodesk.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_bind: String,
    pub api_base_url: Option<String>,
    pub cad_credentials: Option<CadCredentials>,
    pub cad_base_url: String,
    pub allowed_origins: Vec<String>,
    pub token_expiry_margin_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cad_credentials = match (
            non_empty(&lookup, "CAD_CLIENT_ID"),
            non_empty(&lookup, "CAD_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(CadCredentials {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Ok(Self {
            http_bind: non_empty(&lookup, "HTTP_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            api_base_url: non_empty(&lookup, "API_HOST").map(|host| api_base_url(&host)),
            cad_credentials,
            cad_base_url: non_empty(&lookup, "CAD_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_CAD_BASE_URL.to_string()),
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|raw| split_csv(&raw))
                .unwrap_or_default(),
            token_expiry_margin_secs: parse_or_default(&lookup, "TOKEN_EXPIRY_MARGIN_SECS", 60_u64)?,
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn api_base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().trim_end_matches('/').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}
