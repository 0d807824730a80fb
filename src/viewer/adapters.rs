use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Client;

use crate::adapters::cad_cloud::CadCloudClient;
use crate::domain::token_cache::OAuthToken;
use crate::viewer::document::DocumentNode;
use crate::viewer::sdk::{TokenSource, ViewerError, ViewerHandle, ViewerSdk};

#[derive(Clone)]
pub struct ProxyTokenSource {
    client: Client,
    token_url: String,
}

impl ProxyTokenSource {
    pub fn new(client: Client, service_base_url: &str) -> Self {
        Self {
            client,
            token_url: format!(
                "{}/api/oauth/token",
                service_base_url.trim_end_matches('/')
            ),
        }
    }
}

impl TokenSource for ProxyTokenSource {
    async fn fetch_token(&self) -> Result<OAuthToken, ViewerError> {
        let response = self
            .client
            .post(&self.token_url)
            .send()
            .await
            .map_err(|error| ViewerError::TokenFetch(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ViewerError::TokenFetch(format!(
                "token route returned {status}"
            )));
        }

        response
            .json::<OAuthToken>()
            .await
            .map_err(|error| ViewerError::TokenFetch(error.to_string()))
    }
}

pub struct ManifestSdk {
    cad: CadCloudClient,
    access_token: Mutex<Option<String>>,
    next_handle: AtomicU64,
    viewers: Mutex<HashMap<ViewerHandle, Option<String>>>,
}

impl ManifestSdk {
    pub fn new(cad: CadCloudClient) -> Self {
        Self {
            cad,
            access_token: Mutex::new(None),
            next_handle: AtomicU64::new(1),
            viewers: Mutex::new(HashMap::new()),
        }
    }

    pub fn displayed(&self, handle: ViewerHandle) -> Option<String> {
        self.viewers
            .lock()
            .ok()
            .and_then(|viewers| viewers.get(&handle).cloned().flatten())
    }

    pub fn live_viewers(&self) -> usize {
        self.viewers.lock().map(|viewers| viewers.len()).unwrap_or(0)
    }

    fn token(&self) -> Option<String> {
        self.access_token.lock().ok().and_then(|token| token.clone())
    }
}

impl ViewerSdk for ManifestSdk {
    async fn init(&self, access_token: &str) -> Result<(), ViewerError> {
        if access_token.trim().is_empty() {
            return Err(ViewerError::Init("empty access token".to_string()));
        }

        let mut slot = self
            .access_token
            .lock()
            .map_err(|_| ViewerError::Init("token slot poisoned".to_string()))?;
        *slot = Some(access_token.to_string());
        Ok(())
    }

    fn start(&self, container: &str) -> Result<ViewerHandle, ViewerError> {
        if self.token().is_none() {
            return Err(ViewerError::Start("sdk is not initialized".to_string()));
        }
        if container.trim().is_empty() {
            return Err(ViewerError::Start("no container element".to_string()));
        }

        let handle = ViewerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.viewers
            .lock()
            .map_err(|_| ViewerError::Start("viewer registry poisoned".to_string()))?
            .insert(handle, None);
        Ok(handle)
    }

    async fn load_document(&self, urn: &str) -> Result<DocumentNode, ViewerError> {
        let token = self.token().ok_or_else(|| ViewerError::DocumentLoad {
            urn: urn.to_string(),
            reason: "sdk is not initialized".to_string(),
        })?;

        let manifest = self
            .cad
            .fetch_manifest(urn, &token)
            .await
            .map_err(|error| ViewerError::DocumentLoad {
                urn: urn.to_string(),
                reason: error.to_string(),
            })?;

        Ok(manifest.into_document())
    }

    fn display(&self, handle: ViewerHandle, node: &DocumentNode) -> Result<(), ViewerError> {
        let mut viewers = self
            .viewers
            .lock()
            .map_err(|_| ViewerError::Display("viewer registry poisoned".to_string()))?;
        let slot = viewers
            .get_mut(&handle)
            .ok_or_else(|| ViewerError::Display(format!("viewer {} is gone", handle.0)))?;
        *slot = node.guid.clone();
        Ok(())
    }

    fn dispose(&self, handle: ViewerHandle) {
        if let Ok(mut viewers) = self.viewers.lock() {
            viewers.remove(&handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{HttpRequest, HttpResponse, web};

    use super::{ManifestSdk, ProxyTokenSource};
    use crate::adapters::cad_cloud::CadCloudClient;
    use crate::app::CadCredentials;
    use crate::domain::token_cache::TokenCache;
    use crate::test_support::{FixedClock, spawn_upstream};
    use crate::viewer::bootstrap::{BootstrapOutcome, ViewerBootstrap};
    use crate::viewer::sdk::{TokenSource, ViewerError, ViewerSdk};

    fn cad_client(base_url: &str) -> CadCloudClient {
        CadCloudClient::new(
            reqwest::Client::new(),
            base_url,
            CadCredentials {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
            },
            Arc::new(TokenCache::new(FixedClock::new(0), 60)),
        )
    }

    #[actix_web::test]
    async fn proxy_token_source_reads_token_route() {
        let service = spawn_upstream(|cfg| {
            cfg.route(
                "/api/oauth/token",
                web::post().to(|| async {
                    HttpResponse::Ok().json(serde_json::json!({
                        "access_token": "abc",
                        "token_type": "Bearer",
                        "expires_in": 1200
                    }))
                }),
            );
        });

        let token = ProxyTokenSource::new(reqwest::Client::new(), &service.base_url)
            .fetch_token()
            .await
            .expect("token should be fetched");

        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_in, 1200);
    }

    #[actix_web::test]
    async fn proxy_token_source_reports_failed_route() {
        let service = spawn_upstream(|cfg| {
            cfg.route(
                "/api/oauth/token",
                web::post().to(|| async {
                    HttpResponse::InternalServerError()
                        .json(serde_json::json!({ "error": "Failed to obtain access token" }))
                }),
            );
        });

        let result = ProxyTokenSource::new(reqwest::Client::new(), &service.base_url)
            .fetch_token()
            .await;

        assert!(matches!(result, Err(ViewerError::TokenFetch(_))));
    }

    #[actix_web::test]
    async fn bootstrap_over_manifest_shows_first_geometry() {
        let cloud = spawn_upstream(|cfg| {
            cfg.route(
                "/api/oauth/token",
                web::post().to(|| async {
                    HttpResponse::Ok().json(serde_json::json!({
                        "access_token": "viewer-token",
                        "token_type": "Bearer",
                        "expires_in": 3599
                    }))
                }),
            )
            .route(
                "/modelderivative/v2/designdata/{urn}/manifest",
                web::get().to(|req: HttpRequest, path: web::Path<String>| async move {
                    let authorized = req
                        .headers()
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        == Some("Bearer viewer-token");
                    if !authorized {
                        return HttpResponse::Unauthorized().finish();
                    }
                    HttpResponse::Ok().json(serde_json::json!({
                        "type": "manifest",
                        "urn": path.into_inner(),
                        "status": "success",
                        "derivatives": [{
                            "outputType": "thumbnail",
                            "children": [{ "guid": "thumb", "type": "resource" }]
                        }, {
                            "outputType": "svf",
                            "children": [
                                { "guid": "view-2d", "type": "view", "role": "2d" },
                                { "guid": "geo-3d", "type": "geometry", "role": "3d" }
                            ]
                        }]
                    }))
                }),
            );
        });

        let sdk = ManifestSdk::new(cad_client(&cloud.base_url));
        let tokens = ProxyTokenSource::new(reqwest::Client::new(), &cloud.base_url);
        let bootstrap = ViewerBootstrap::new(tokens, sdk, "forge-viewer");

        let task = bootstrap.begin("dXJuOnBvbmQ").expect("urn is valid");
        let outcome = bootstrap.run(&task).await.expect("bootstrap should succeed");

        match outcome {
            BootstrapOutcome::Displayed { geometry, .. } => {
                assert_eq!(geometry.guid.as_deref(), Some("geo-3d"));
            }
            BootstrapOutcome::Superseded => panic!("task should be current"),
        }
    }

    #[actix_web::test]
    async fn start_requires_initialized_sdk() {
        let sdk = ManifestSdk::new(cad_client("http://127.0.0.1:1"));

        assert!(matches!(sdk.start("viewer"), Err(ViewerError::Start(_))));

        sdk.init("tok").await.expect("init should succeed");
        let handle = sdk.start("viewer").expect("viewer should start");
        assert_eq!(sdk.live_viewers(), 1);
        assert_eq!(sdk.displayed(handle), None);

        sdk.dispose(handle);
        assert_eq!(sdk.live_viewers(), 0);
    }
}
