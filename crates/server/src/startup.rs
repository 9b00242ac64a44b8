use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use configs::{AppConfig, StorageBackend, StorageConfig};
use service::{DatastoreStore, EntryStore, MemoryStore};

use crate::routes::{self, SharedStore};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Instantiate the configured storage adapter. The router never learns
/// which one it got.
pub fn build_store(cfg: &StorageConfig) -> SharedStore {
    match cfg.backend {
        StorageBackend::Memory => {
            if cfg.sleep_ms > 0 {
                MemoryStore::with_artificial_latency(Duration::from_millis(cfg.sleep_ms))
            } else {
                MemoryStore::new()
            }
        }
        StorageBackend::Datastore => {
            let ds = &cfg.datastore;
            let mut store = DatastoreStore::new(&ds.endpoint, &ds.project_id, &ds.namespace);
            if let Ok(token) = env::var("DATASTORE_TOKEN") {
                if !token.trim().is_empty() {
                    store = store.with_token(token);
                }
            }
            Arc::new(store) as Arc<dyn EntryStore>
        }
    }
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    common::env::ensure_env("static").await?;

    let cfg = AppConfig::load_and_validate()?;
    let store = build_store(&cfg.storage);

    let cors = build_cors();
    let app: Router = routes::build_router(store, cors);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, backend = ?cfg.storage.backend, "starting textstore server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
