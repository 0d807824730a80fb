use std::sync::Arc;

use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::credentials::{
    BUCKET_SCOPE, ClientCredentialsForm, basic_authorization, bearer_authorization,
};
use crate::app::CadCredentials;
use crate::domain::token_cache::{OAuthToken, TokenCache};
use crate::viewer::document::Manifest;

pub const BUCKET_KEY: &str = "garden-hub-models";
pub const BUCKET_POLICY: &str = "transient";

#[derive(Debug, Error)]
pub enum CadError {
    #[error("cad cloud request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("cad cloud payload could not be decoded: {0}")]
    Decode(reqwest::Error),
    #[error("invalid cad cloud url: {0}")]
    InvalidUrl(String),
    #[error("cad cloud returned status {status}: {message}")]
    Upstream { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    pub bucket_key: String,
    pub policy_key: String,
}

#[derive(Clone)]
pub struct CadCloudClient {
    client: Client,
    base_url: String,
    credentials: CadCredentials,
    tokens: Arc<TokenCache>,
}

impl CadCloudClient {
    pub fn new(
        client: Client,
        base_url: &str,
        credentials: CadCredentials,
        tokens: Arc<TokenCache>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            tokens,
        }
    }

    pub async fn request_token(&self, scope: &str) -> Result<OAuthToken, CadError> {
        if let Some(token) = self.tokens.get(scope) {
            tracing::debug!(scope, expires_in = token.expires_in, "using cached cad token");
            return Ok(token);
        }

        let response = self
            .client
            .post(format!("{}/authentication/v2/token", self.base_url))
            .header(
                reqwest::header::AUTHORIZATION,
                basic_authorization(&self.credentials),
            )
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&ClientCredentialsForm::new(scope))
            .send()
            .await?;

        let token: OAuthToken = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(CadError::Decode)?;
        self.tokens.insert(scope, &token);

        tracing::info!(scope, expires_in = token.expires_in, "issued cad token");
        Ok(token)
    }

    pub async fn create_bucket(&self) -> Result<BucketInfo, CadError> {
        let token = self.request_token(BUCKET_SCOPE).await?;

        let response = self
            .client
            .post(format!("{}/oss/v2/buckets", self.base_url))
            .header(
                reqwest::header::AUTHORIZATION,
                bearer_authorization(&token.access_token),
            )
            .json(&BucketInfo {
                bucket_key: BUCKET_KEY.to_string(),
                policy_key: BUCKET_POLICY.to_string(),
            })
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate(BUCKET_SCOPE);
        }

        let bucket: BucketInfo = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(CadError::Decode)?;
        tracing::info!(bucket_key = %bucket.bucket_key, policy_key = %bucket.policy_key, "bucket created");
        Ok(bucket)
    }

    pub async fn fetch_manifest(&self, urn: &str, access_token: &str) -> Result<Manifest, CadError> {
        let response = self
            .client
            .get(self.manifest_url(urn)?)
            .header(
                reqwest::header::AUTHORIZATION,
                bearer_authorization(access_token),
            )
            .send()
            .await?;

        ensure_success(response)
            .await?
            .json()
            .await
            .map_err(CadError::Decode)
    }

    // The urn is pushed as a single percent-encoded segment.
    fn manifest_url(&self, urn: &str) -> Result<Url, CadError> {
        if urn.is_empty() || urn.chars().all(|c| c == '.') {
            return Err(CadError::InvalidUrl(format!("unusable urn {urn:?}")));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|error| CadError::InvalidUrl(format!("{}: {error}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| CadError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["modelderivative", "v2", "designdata", urn, "manifest"]);

        Ok(url)
    }
}

async fn ensure_success(response: Response) -> Result<Response, CadError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            ["developerMessage", "reason", "message", "error_description"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or(body);

    Err(CadError::Upstream {
        status: status.as_u16(),
        message,
    })
}
