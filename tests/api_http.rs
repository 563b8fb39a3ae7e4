// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use canteen_rating::calendar::DayInfo;
use canteen_rating::config::SecretsHandle;
use canteen_rating::model::ConfigRecord;
use canteen_rating::store::RecordStore;
use canteen_rating::{create_router, AppState};

const BODY_LIMIT: usize = 1024 * 1024;
const ADMIN: &str = "0111ll";

/// Fresh in-memory app with default secrets.
fn test_router() -> Router {
    let state = AppState::new(
        Arc::new(RecordStore::in_memory()),
        SecretsHandle::new(ConfigRecord::default()),
    );
    create_router(state)
}

/// Fresh in-memory app whose "today" is fixed.
fn router_on(clock: fn() -> DayInfo) -> Router {
    let state = AppState::new(
        Arc::new(RecordStore::in_memory()),
        SecretsHandle::new(ConfigRecord::default()),
    )
    .with_clock(clock);
    create_router(state)
}

/// 2024-11-18 was a Monday.
fn monday() -> DayInfo {
    DayInfo::from_date(chrono::NaiveDate::from_ymd_opt(2024, 11, 18).unwrap())
}

fn saturday() -> DayInfo {
    DayInfo::from_date(chrono::NaiveDate::from_ymd_opt(2024, 11, 23).unwrap())
}

async fn post(app: &Router, uri: &str, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST");
    send(app, req).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    send(app, req).await
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

fn rating(dish: &str, score: i64, mystery: bool, visitor: &str) -> Json {
    json!({
        "day": "周一",
        "mealType": "午餐",
        "dishName": dish,
        "score": score,
        "isMystery": mystery,
        "visitorId": visitor,
        "dateKey": "2024-11-18"
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let app = test_router();
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn empty_menu_has_documented_shape() {
    let app = test_router();
    let (status, v) = get(&app, "/api/menu").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!({ "weekMenu": [] }));
}

#[tokio::test]
async fn menu_save_strips_blanks_and_clear_empties() {
    let app = test_router();
    let week = json!([
        { "day": "周一", "meals": [
            { "type": "早餐", "dishes": ["包子", "", "  "] },
            { "type": "午餐", "dishes": ["", "红烧肉"] }
        ]}
    ]);

    let (status, v) = post(&app, "/api/menu", json!({ "password": "bad", "weekMenu": week })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(v["error"].is_string());

    let (status, v) = post(&app, "/api/menu", json!({ "password": ADMIN, "weekMenu": week })).await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["success"], true);

    let (_, v) = get(&app, "/api/menu").await;
    assert_eq!(v["weekMenu"][0]["meals"][0]["dishes"], json!(["包子"]));
    assert_eq!(v["weekMenu"][0]["meals"][1]["dishes"], json!(["红烧肉"]));

    let (status, _) = post(&app, "/api/menu/clear", json!({ "password": "bad" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post(&app, "/api/menu/clear", json!({ "password": ADMIN })).await;
    assert_eq!(status, StatusCode::OK);
    let (_, v) = get(&app, "/api/menu").await;
    assert_eq!(v, json!({ "weekMenu": [] }));
}

#[tokio::test]
async fn menu_save_without_week_menu_is_bad_request() {
    let app = test_router();
    let (status, v) = post(&app, "/api/menu", json!({ "password": ADMIN })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("weekMenu"));
}

#[tokio::test]
async fn wrong_password_wins_over_missing_fields() {
    let app = test_router();

    let (status, v) = post(&app, "/api/menu", json!({ "password": "wrong" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{v}");
    assert!(!v["error"].as_str().unwrap().contains("weekMenu"));

    let (status, v) = post(&app, "/api/mystery/setcode", json!({ "password": "wrong" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{v}");
    assert!(!v["error"].as_str().unwrap().contains("newCode"));

    let (status, _) = post(&app, "/api/mystery/setcode", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn menu_template_lists_every_weekday() {
    let app = test_router();
    let (status, v) = get(&app, "/api/menu/template").await;
    assert_eq!(status, StatusCode::OK);
    let days: Vec<&str> = v["weekMenu"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["day"].as_str().unwrap())
        .collect();
    assert_eq!(days, vec!["周一", "周二", "周三", "周四", "周五"]);
}

#[tokio::test]
async fn submit_then_summary_reflects_weighting() {
    let app = test_router();

    let (status, v) = post(&app, "/api/ratings/submit", rating("鱼香肉丝", 8, false, "v_a")).await;
    assert_eq!(status, StatusCode::OK, "{v}");
    assert_eq!(v["success"], true);
    let (status, _) = post(&app, "/api/ratings/submit", rating("鱼香肉丝", 2, true, "v_b")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, v) = post(&app, "/api/ratings/summary", json!({ "password": ADMIN })).await;
    assert_eq!(status, StatusCode::OK);
    let item = &v["summary"][0];
    assert_eq!(item["dishName"], "鱼香肉丝");
    assert_eq!(item["weightedTotal"], 14);
    assert_eq!(item["weightedCount"], 4);
    assert_eq!(item["averageScore"], 3.5);
    assert_eq!(item["ratingCount"], 2);
}

#[tokio::test]
async fn duplicate_submission_is_rejected_with_distinct_message() {
    let app = test_router();
    let (status, _) = post(&app, "/api/ratings/submit", rating("汤", 6, false, "v_a")).await;
    assert_eq!(status, StatusCode::OK);

    let mut again = rating("汤", 9, true, "v_a");
    again["comment"] = json!("different");
    let (status, v) = post(&app, "/api/ratings/submit", again).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "already rated this dish today");

    let (_, all) = post(&app, "/api/ratings/all", json!({ "password": ADMIN })).await;
    assert_eq!(all["ratings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn out_of_range_and_missing_fields_are_rejected() {
    let app = test_router();
    for score in [0, 11] {
        let (status, v) = post(&app, "/api/ratings/submit", rating("汤", score, false, "v")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "score {score}");
        assert_ne!(v["error"], "already rated this dish today");
    }

    let (status, _) = post(
        &app,
        "/api/ratings/submit",
        json!({ "day": "周一", "mealType": "午餐", "score": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, all) = post(&app, "/api/ratings/all", json!({ "password": ADMIN })).await;
    assert_eq!(all, json!({ "ratings": [] }));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = test_router();
    let req = Request::builder()
        .method("POST")
        .uri("/api/ratings/submit")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, v) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].is_string());
}

#[tokio::test]
async fn admin_endpoints_require_password() {
    let app = test_router();
    for uri in [
        "/api/ratings/summary",
        "/api/ratings/all",
        "/api/ratings/clear",
        "/api/mystery/getcode",
        "/api/admin/verify",
    ] {
        let (status, v) = post(&app, uri, json!({ "password": "guess" })).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(v["error"], "wrong admin password", "{uri}");

        let (status, _) = post(&app, uri, json!({})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} without password");
    }

    let (status, v) = post(&app, "/api/admin/verify", json!({ "password": ADMIN })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!({ "success": true }));
}

#[tokio::test]
async fn clearing_ratings_leaves_menu_untouched() {
    let app = test_router();
    let week = json!([{ "day": "周二", "meals": [{ "type": "午餐", "dishes": ["面"] }] }]);
    post(&app, "/api/menu", json!({ "password": ADMIN, "weekMenu": week })).await;
    post(&app, "/api/ratings/submit", rating("面", 7, false, "v")).await;

    let (status, _) = post(&app, "/api/ratings/clear", json!({ "password": ADMIN })).await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = post(&app, "/api/ratings/all", json!({ "password": ADMIN })).await;
    assert_eq!(all, json!({ "ratings": [] }));
    let (_, menu) = get(&app, "/api/menu").await;
    assert_eq!(menu["weekMenu"][0]["day"], "周二");

    // and the other way round
    post(&app, "/api/ratings/submit", rating("面", 7, false, "v")).await;
    post(&app, "/api/menu/clear", json!({ "password": ADMIN })).await;
    let (_, all) = post(&app, "/api/ratings/all", json!({ "password": ADMIN })).await;
    assert_eq!(all["ratings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn mystery_code_lifecycle() {
    let app = test_router();

    let (status, v) = post(&app, "/api/mystery/verify", json!({ "code": "8888" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["success"], true);

    let (status, v) = post(&app, "/api/mystery/verify", json!({ "code": "0000" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(v["error"], "wrong mystery code");

    let (status, _) = post(
        &app,
        "/api/mystery/setcode",
        json!({ "password": "nope", "newCode": "2468" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post(
        &app,
        "/api/mystery/setcode",
        json!({ "password": ADMIN, "newCode": "2468" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, v) = post(&app, "/api/mystery/getcode", json!({ "password": ADMIN })).await;
    assert_eq!(v, json!({ "code": "2468" }));

    let (status, _) = post(&app, "/api/mystery/verify", json!({ "code": "8888" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = post(&app, "/api/mystery/verify", json!({ "code": "2468" })).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn set_code_without_new_code_is_bad_request() {
    let app = test_router();
    let (status, _) = post(&app, "/api/mystery/setcode", json!({ "password": ADMIN })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, v) = post(&app, "/api/mystery/getcode", json!({ "password": ADMIN })).await;
    assert_eq!(v["code"], "8888");
}

#[tokio::test]
async fn today_view_has_stable_shape() {
    let app = test_router();
    let (status, v) = get(&app, "/api/today").await;
    assert_eq!(status, StatusCode::OK);
    assert!(v.get("weekday").is_some(), "missing 'weekday'");
    assert!(v["dateKey"].is_string(), "missing 'dateKey'");
    assert!(v.get("entry").is_some(), "missing 'entry'");
    assert!(v["topDishes"].is_array(), "missing 'topDishes'");
}

#[tokio::test]
async fn today_view_picks_top_dish_per_meal() {
    let app = router_on(monday);
    let week = json!([
        { "day": "周一", "meals": [
            { "type": "早餐", "dishes": ["包子", "油条"] },
            { "type": "午餐", "dishes": ["红烧肉", "宫保鸡丁"] }
        ]},
        { "day": "周二", "meals": [{ "type": "午餐", "dishes": ["面条"] }] }
    ]);
    let (status, _) = post(&app, "/api/menu", json!({ "password": ADMIN, "weekMenu": week })).await;
    assert_eq!(status, StatusCode::OK);

    for (dish, score, mystery, visitor) in [
        ("红烧肉", 6, false, "v_a"),
        ("宫保鸡丁", 9, false, "v_a"),
        ("宫保鸡丁", 5, true, "v_b"),
        ("红烧肉", 8, false, "v_b"),
    ] {
        let (status, v) = post(&app, "/api/ratings/submit", rating(dish, score, mystery, visitor)).await;
        assert_eq!(status, StatusCode::OK, "{v}");
    }

    let (status, v) = get(&app, "/api/today").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["weekday"], "周一");
    assert_eq!(v["dateKey"], "2024-11-18");
    assert_eq!(v["entry"]["day"], "周一");
    // 宫保鸡丁: (9 + 5*3) / 4 = 6.0, 红烧肉: (6 + 8) / 2 = 7.0; nothing rated at breakfast.
    assert_eq!(
        v["topDishes"],
        json!([{ "mealType": "午餐", "dishName": "红烧肉", "averageScore": 7.0 }])
    );
}

#[tokio::test]
async fn today_view_is_empty_on_weekends() {
    let app = router_on(saturday);
    let week = json!([{ "day": "周一", "meals": [{ "type": "午餐", "dishes": ["红烧肉"] }] }]);
    post(&app, "/api/menu", json!({ "password": ADMIN, "weekMenu": week })).await;

    let (status, v) = get(&app, "/api/today").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["weekday"], Json::Null);
    assert_eq!(v["dateKey"], "2024-11-23");
    assert_eq!(v["entry"], Json::Null);
    assert_eq!(v["topDishes"], json!([]));
}
