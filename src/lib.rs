// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod admin;
pub mod aggregate;
pub mod api;
pub mod calendar;
pub mod config;
pub mod error;
pub mod menu;
pub mod metrics;
pub mod model;
pub mod mystery;
pub mod ratings;
pub mod store;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::services::ServeDir;
use tracing::info;

pub use crate::api::{create_router, AppState};
pub use crate::config::AppSettings;
pub use crate::error::{CanteenError, StoreError};

use crate::config::{start_hot_reload_thread, SecretsHandle};
use crate::metrics::Metrics;
use crate::store::{FileBackend, Record, RecordStore};

/// Build the full application from `AppSettings::load()` (TOML + env).
pub async fn app() -> anyhow::Result<Router> {
    let settings = AppSettings::load()?;
    app_with(&settings).await
}

/// Build the full application for explicit settings: open and seed the data
/// directory, load secrets, then attach the optional routes.
pub async fn app_with(settings: &AppSettings) -> anyhow::Result<Router> {
    let backend = FileBackend::open(&settings.data_dir)
        .await
        .with_context(|| format!("opening data dir {}", settings.data_dir.display()))?;
    let store = RecordStore::new(Arc::new(backend));
    store
        .seed(&settings.seed_config())
        .await
        .context("seeding records")?;

    let secrets = SecretsHandle::load(&store)
        .await
        .context("loading config.json")?;

    if settings.hot_reload {
        if let Some(path) = store.backend().location(Record::Config) {
            start_hot_reload_thread(secrets.clone(), path);
        }
    }

    let mut router = create_router(AppState::new(Arc::new(store), secrets));

    if settings.debug_routes {
        if let Some(m) = Metrics::init() {
            router = router.merge(m.router());
        }
    }
    if let Some(dir) = &settings.static_dir {
        info!(dir = %dir.display(), "serving static UI");
        router = router.fallback_service(ServeDir::new(dir));
    }

    info!(data_dir = %settings.data_dir.display(), "canteen rating service ready");
    Ok(router)
}
