use std::future::Future;

use thiserror::Error;

use crate::domain::token_cache::OAuthToken;
use crate::viewer::document::DocumentNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewerHandle(pub u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewerError {
    #[error("model identifier must not be empty")]
    EmptyUrn,
    #[error("failed to fetch viewer token: {0}")]
    TokenFetch(String),
    #[error("viewer sdk initialization failed: {0}")]
    Init(String),
    #[error("viewer failed to start: {0}")]
    Start(String),
    #[error("failed to load document {urn}: {reason}")]
    DocumentLoad { urn: String, reason: String },
    #[error("document {urn} has no geometry")]
    NoGeometry { urn: String },
    #[error("failed to display geometry: {0}")]
    Display(String),
}

pub trait TokenSource: Send + Sync {
    fn fetch_token(&self) -> impl Future<Output = Result<OAuthToken, ViewerError>> + Send;
}

pub trait ViewerSdk: Send + Sync {
    fn init(&self, access_token: &str) -> impl Future<Output = Result<(), ViewerError>> + Send;

    fn start(&self, container: &str) -> Result<ViewerHandle, ViewerError>;

    fn load_document(
        &self,
        urn: &str,
    ) -> impl Future<Output = Result<DocumentNode, ViewerError>> + Send;

    fn display(&self, handle: ViewerHandle, node: &DocumentNode) -> Result<(), ViewerError>;

    fn dispose(&self, handle: ViewerHandle);
}
