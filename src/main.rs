//! Canteen Rating Service — Binary Entrypoint
//! Boots the Axum HTTP server through Shuttle; everything else lives in the library.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Local log output. Activation requires CANTEEN_DEV_LOG=1; Shuttle installs
/// its own subscriber in deployment. CANTEEN_LOG_FORMAT=json switches to
/// JSON lines.
fn enable_dev_tracing() {
    let dev_flag = std::env::var("CANTEEN_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");
    if !dev_flag {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("canteen_rating=info,ratings=info,warn"));

    let json = std::env::var("CANTEEN_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // try_init: a subscriber may already be installed by the runtime
    let _ = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let router = canteen_rating::app().await?;
    Ok(router.into())
}
