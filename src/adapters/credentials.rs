use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::Serialize;

use crate::app::CadCredentials;

pub const VIEWER_SCOPE: &str = "viewables:read";
pub const BUCKET_SCOPE: &str = "bucket:create bucket:read";

pub fn basic_authorization(credentials: &CadCredentials) -> String {
    let pair = format!("{}:{}", credentials.client_id, credentials.client_secret);
    format!("Basic {}", BASE64.encode(pair))
}

pub fn bearer_authorization(token: &str) -> String {
    format!("Bearer {token}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientCredentialsForm<'a> {
    pub grant_type: &'static str,
    pub scope: &'a str,
}

impl<'a> ClientCredentialsForm<'a> {
    pub fn new(scope: &'a str) -> Self {
        Self {
            grant_type: "client_credentials",
            scope,
        }
    }
}
