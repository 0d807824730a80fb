use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::adapters::credentials::bearer_authorization;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned an unreadable body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Status and JSON body of an external API response.
///
/// Non-success bodies that are not JSON are kept as `Value::Null` so the
/// caller can still relay the status.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: Value,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResetPasswordRequest {
    pub password: String,
    pub token: String,
}

#[derive(Clone)]
pub struct ExternalApiClient {
    client: Client,
    base_url: String,
}

impl ExternalApiClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn forgot_request(
        &self,
        body: &ForgotPasswordRequest,
    ) -> Result<UpstreamReply, UpstreamError> {
        self.send(self.client.post(self.url("/auth/forgot/request")).json(body))
            .await
    }

    pub async fn forgot_reset(
        &self,
        body: &ResetPasswordRequest,
    ) -> Result<UpstreamReply, UpstreamError> {
        self.send(self.client.post(self.url("/auth/forgot/reset")).json(body))
            .await
    }

    pub async fn user_info(&self, token: &str) -> Result<UpstreamReply, UpstreamError> {
        self.send(
            self.client
                .get(self.url("/user/info"))
                .header(reqwest::header::AUTHORIZATION, bearer_authorization(token)),
        )
        .await
    }

    pub async fn pzem_device(
        &self,
        token: &str,
        device_id: &str,
    ) -> Result<UpstreamReply, UpstreamError> {
        self.send(
            self.client
                .get(self.url(&format!("/pzem/devices/{device_id}")))
                .header(reqwest::header::AUTHORIZATION, bearer_authorization(token)),
        )
        .await
    }

    pub async fn pzem_logs(
        &self,
        token: &str,
        device_id: &str,
        limit: u32,
    ) -> Result<UpstreamReply, UpstreamError> {
        self.send(
            self.client
                .get(self.url(&format!("/pzem/devices/{device_id}/logs")))
                .query(&[("limit", limit)])
                .header(reqwest::header::AUTHORIZATION, bearer_authorization(token)),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<UpstreamReply, UpstreamError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => value,
                Err(_) if !(200..300).contains(&status) => Value::Null,
                Err(error) => return Err(UpstreamError::Decode(error)),
            }
        };

        tracing::debug!(status, "external api responded");
        Ok(UpstreamReply { status, body })
    }
}
