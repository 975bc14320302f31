//! HTTP-backed release lookup.
//!
//! Both stores are reached over a small REST surface:
//! - legacy: `GET {base}/namespaces/{ns}/releases/{name}/versions`
//! - current: `GET {base}/namespaces/{ns}/releases/{name}`
//!
//! Either answers with a [`ReleaseRecord`] body, or 404 when the release is
//! unknown. Anything else is a backend failure.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::probe::{LookupError, ReleaseLookup, ReleaseRecord};
use crate::config::{NetworkConfig, StoreEndpoint, StoreKind};
use crate::error::{MigratorError, Result};

/// Build the shared HTTP client used by store lookups and the migration invoker.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(NetworkConfig::USER_AGENT)
        .build()
        .map_err(|e| MigratorError::Config {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Release lookup against one store's HTTP endpoint.
pub struct HttpReleaseLookup {
    kind: StoreKind,
    client: Client,
    endpoint: StoreEndpoint,
}

impl HttpReleaseLookup {
    pub fn new(kind: StoreKind, client: Client, endpoint: StoreEndpoint) -> Self {
        Self {
            kind,
            client,
            endpoint,
        }
    }

    fn release_url(&self, namespace: &str, name: &str) -> String {
        match self.kind {
            StoreKind::Legacy => self
                .endpoint
                .url_for(&["namespaces", namespace, "releases", name, "versions"]),
            StoreKind::Current => self
                .endpoint
                .url_for(&["namespaces", namespace, "releases", name]),
        }
    }
}

#[async_trait]
impl ReleaseLookup for HttpReleaseLookup {
    async fn lookup(
        &self,
        namespace: &str,
        name: &str,
    ) -> std::result::Result<ReleaseRecord, LookupError> {
        let url = self.release_url(namespace, name);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.endpoint.timeout)
            .send()
            .await
            .map_err(|e| LookupError::Backend(format!("GET {} failed: {}", url, e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(LookupError::NotFound),
            status if status.is_success() => response.json::<ReleaseRecord>().await.map_err(|e| {
                LookupError::Backend(format!("Malformed release record from {}: {}", url, e))
            }),
            status => Err(LookupError::Backend(format!(
                "GET {} returned {}",
                url, status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::time::Duration;

    /// Serve a fake store: `app-a` exists, `broken` fails, everything else 404s.
    async fn spawn_store() -> StoreEndpoint {
        async fn release(
            Path((namespace, name)): Path<(String, String)>,
        ) -> std::result::Result<Json<ReleaseRecord>, AxumStatus> {
            match name.as_str() {
                "app-a" => Ok(Json(ReleaseRecord {
                    name,
                    namespace,
                    versions: vec![1, 2, 3],
                })),
                "broken" => Err(AxumStatus::INTERNAL_SERVER_ERROR),
                _ => Err(AxumStatus::NOT_FOUND),
            }
        }

        let app = Router::new()
            .route("/namespaces/:namespace/releases/:name", get(release))
            .route("/namespaces/:namespace/releases/:name/versions", get(release));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        StoreEndpoint::parse(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_found() {
        let endpoint = spawn_store().await;
        let lookup = HttpReleaseLookup::new(StoreKind::Legacy, build_client().unwrap(), endpoint);

        let record = lookup.lookup("kube-system", "app-a").await.unwrap();
        assert_eq!(record.namespace, "kube-system");
        assert_eq!(record.versions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_lookup_distinguishes_not_found_from_failure() {
        let endpoint = spawn_store().await;
        let lookup = HttpReleaseLookup::new(StoreKind::Current, build_client().unwrap(), endpoint);

        assert_eq!(
            lookup.lookup("apps", "missing").await,
            Err(LookupError::NotFound)
        );
        assert!(matches!(
            lookup.lookup("apps", "broken").await,
            Err(LookupError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_backend_failure() {
        // Bind and drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint =
            StoreEndpoint::parse(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        let lookup = HttpReleaseLookup::new(StoreKind::Current, build_client().unwrap(), endpoint);

        assert!(matches!(
            lookup.lookup("apps", "app-a").await,
            Err(LookupError::Backend(_))
        ));
    }

    #[test]
    fn test_release_urls() {
        let endpoint =
            StoreEndpoint::parse("http://store.local", Duration::from_secs(1)).unwrap();
        let client = build_client().unwrap();

        let legacy = HttpReleaseLookup::new(StoreKind::Legacy, client.clone(), endpoint.clone());
        assert_eq!(
            legacy.release_url("kube-system", "app-a"),
            "http://store.local/namespaces/kube-system/releases/app-a/versions"
        );

        let current = HttpReleaseLookup::new(StoreKind::Current, client, endpoint);
        assert_eq!(
            current.release_url("apps", "app-a"),
            "http://store.local/namespaces/apps/releases/app-a"
        );
    }
}
