//! Read-only HTTP republish of the product catalog.
//!
//! `GET /products` reads the catalog file fresh on every request so a batch
//! run writing in parallel is picked up without restarting the server. The
//! tolerant loader applies here too: a broken catalog serves as empty rather
//! than 500ing.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::types::ProductStore;
use crate::store::load_catalog;

struct ServeState {
    store_path: PathBuf,
}

pub fn router(store_path: impl Into<PathBuf>) -> Router {
    let state = Arc::new(ServeState {
        store_path: store_path.into(),
    });
    Router::new()
        .route("/health", get(health_check))
        .route("/products", get(list_products))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn run(port: u16, store_path: impl Into<PathBuf>) -> anyhow::Result<()> {
    let app = router(store_path);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {}.",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("serve: 📡 catalog server listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("serve: shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_products(State(state): State<Arc<ServeState>>) -> Json<ProductStore> {
    Json(load_catalog(&state.store_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_products_endpoint_reads_catalog() {
        use tower::util::ServiceExt;

        let dir = std::env::temp_dir().join("solescout_serve");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("catalog.json");
        std::fs::write(&path, r#"{"products":[{"id":"p1"}]}"#).unwrap();

        let app = router(&path);
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/products")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let store: ProductStore = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(store.products.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_catalog_serves_empty() {
        use tower::util::ServiceExt;

        let app = router("/definitely/not/here/catalog.json");
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/products")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let store: ProductStore = serde_json::from_slice(&bytes).unwrap();
        assert!(store.products.is_empty());
    }
}
