// tests/app_bootstrap.rs
//
// Full application built from settings over a temp data directory:
// first-run seeding, persistence across restarts, optional routes.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use canteen_rating::{app_with, AppSettings};
use serde_json::{json, Value as Json};
use std::fs;
use std::path::Path;
use tower::ServiceExt;

fn settings_for(dir: &Path) -> AppSettings {
    AppSettings {
        data_dir: dir.join("data"),
        ..AppSettings::default()
    }
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn post_json(uri: &str, v: Json) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(v.to_string()))
        .unwrap()
}

#[tokio::test]
async fn first_run_seeds_all_three_records() {
    let tmp = tempfile::tempdir().unwrap();
    let mut settings = settings_for(tmp.path());
    settings.seed_admin_password = "pw-from-settings".into();
    app_with(&settings).await.expect("app builds");

    let data = tmp.path().join("data");
    let menu: Json = serde_json::from_str(&fs::read_to_string(data.join("menu.json")).unwrap()).unwrap();
    let ratings: Json =
        serde_json::from_str(&fs::read_to_string(data.join("ratings.json")).unwrap()).unwrap();
    let config: Json =
        serde_json::from_str(&fs::read_to_string(data.join("config.json")).unwrap()).unwrap();

    assert_eq!(menu, json!({ "weekMenu": [] }));
    assert_eq!(ratings, json!({ "ratings": [] }));
    assert_eq!(
        config,
        json!({ "adminPassword": "pw-from-settings", "mysteryCode": "8888" })
    );
}

#[tokio::test]
async fn state_survives_a_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let settings = settings_for(tmp.path());

    let app = app_with(&settings).await.unwrap();
    let (status, _) = call(
        &app,
        post_json(
            "/api/mystery/setcode",
            json!({ "password": "0111ll", "newCode": "97531" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(
        &app,
        post_json(
            "/api/ratings/submit",
            json!({ "day": "周五", "mealType": "午餐", "dishName": "饺子", "score": 10,
                    "isMystery": true, "visitorId": "v_x", "dateKey": "2024-11-22" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    drop(app);

    // seed values must not overwrite what is already on disk
    let mut settings = settings;
    settings.seed_mystery_code = "1111".into();
    let app = app_with(&settings).await.unwrap();

    let (status, _) = call(&app, post_json("/api/mystery/verify", json!({ "code": "97531" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, post_json("/api/ratings/all", json!({ "password": "0111ll" }))).await;
    let v: Json = serde_json::from_str(&body).unwrap();
    assert_eq!(v["ratings"][0]["dishName"], "饺子");
    assert_eq!(v["ratings"][0]["isMystery"], true);
}

#[tokio::test]
async fn metrics_route_only_with_debug_routes() {
    let tmp = tempfile::tempdir().unwrap();

    let app = app_with(&settings_for(tmp.path())).await.unwrap();
    let (status, _) = call(&app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut settings = settings_for(tmp.path());
    settings.debug_routes = true;
    let app = app_with(&settings).await.unwrap();

    call(&app, post_json("/api/mystery/verify", json!({ "code": "nope" }))).await;
    let (status, text) = call(&app, Request::get("/metrics").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        text.contains("mystery_verify_total"),
        "metrics exposition missing mystery_verify_total\n{text}"
    );
}

#[tokio::test]
async fn static_dir_serves_ui_without_shadowing_api() {
    let tmp = tempfile::tempdir().unwrap();
    let ui = tmp.path().join("ui");
    fs::create_dir_all(&ui).unwrap();
    fs::write(ui.join("index.html"), "<h1>canteen</h1>").unwrap();

    let mut settings = settings_for(tmp.path());
    settings.static_dir = Some(ui);
    let app = app_with(&settings).await.unwrap();

    let (status, body) = call(&app, Request::get("/index.html").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("canteen"));

    let (status, body) = call(&app, Request::get("/api/menu").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("weekMenu"));
}
