use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::aggregate::{self, SummaryItem, TopDish};
use crate::calendar::DayInfo;
use crate::config::SecretsHandle;
use crate::error::CanteenError;
use crate::model::{DayEntry, Menu, Rating};
use crate::store::RecordStore;
use crate::{admin, menu, mystery, ratings};

#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub secrets: SecretsHandle,
    /// Source of "today" for the today view.
    pub clock: fn() -> DayInfo,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>, secrets: SecretsHandle) -> Self {
        Self {
            store,
            secrets,
            clock: DayInfo::today,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DayInfo) -> Self {
        self.clock = clock;
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/menu", get(get_menu).post(save_menu))
        .route("/api/menu/clear", post(clear_menu))
        .route("/api/menu/template", get(menu_template))
        .route("/api/today", get(today))
        .route("/api/ratings/submit", post(submit_rating))
        .route("/api/ratings/summary", post(ratings_summary))
        .route("/api/ratings/all", post(ratings_all))
        .route("/api/ratings/clear", post(clear_ratings))
        .route("/api/mystery/verify", post(verify_mystery))
        .route("/api/mystery/setcode", post(set_mystery_code))
        .route("/api/mystery/getcode", post(get_mystery_code))
        .route("/api/admin/verify", post(verify_admin))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

type ApiResult<T> = Result<Json<T>, CanteenError>;
type Body<T> = Result<Json<T>, JsonRejection>;

#[derive(Debug, Serialize)]
struct Ack {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

fn ack(message: &'static str) -> Json<Ack> {
    Json(Ack {
        success: true,
        message: Some(message),
    })
}

#[derive(Deserialize)]
struct PasswordReq {
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveMenuReq {
    #[serde(default)]
    password: String,
    week_menu: Option<Vec<DayEntry>>,
}

#[derive(Deserialize)]
struct CodeReq {
    #[serde(default)]
    code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetCodeReq {
    #[serde(default)]
    password: String,
    new_code: Option<String>,
}

#[derive(Serialize)]
struct SummaryResp {
    summary: Vec<SummaryItem>,
}

#[derive(Serialize)]
struct RatingsResp {
    ratings: Vec<Rating>,
}

#[derive(Serialize)]
struct CodeResp {
    code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TodayResp {
    /// `None` on weekends.
    weekday: Option<&'static str>,
    date_key: String,
    entry: Option<DayEntry>,
    top_dishes: Vec<TopDish>,
}

async fn get_menu(State(state): State<AppState>) -> ApiResult<Menu> {
    Ok(Json(menu::get(&state.store).await?))
}

async fn save_menu(State(state): State<AppState>, body: Body<SaveMenuReq>) -> ApiResult<Ack> {
    let Json(req) = body?;
    admin::check(&state.secrets, &req.password)?;
    let week_menu = req
        .week_menu
        .ok_or_else(|| CanteenError::validation("weekMenu is required"))?;
    menu::save(&state.store, &state.secrets, &req.password, Menu { week_menu }).await?;
    Ok(ack("menu saved"))
}

async fn clear_menu(State(state): State<AppState>, body: Body<PasswordReq>) -> ApiResult<Ack> {
    let Json(req) = body?;
    menu::clear(&state.store, &state.secrets, &req.password).await?;
    Ok(ack("menu cleared"))
}

async fn menu_template() -> Json<Menu> {
    Json(menu::blank_week())
}

async fn today(State(state): State<AppState>) -> ApiResult<TodayResp> {
    let day = (state.clock)();
    let weekday = menu::weekday_label(day.weekday_index);

    let current = menu::get(&state.store).await?;
    let entry = menu::today_entry(&current, day.weekday_index).cloned();
    let top_dishes = match weekday {
        Some(label) if entry.is_some() => {
            let summary = aggregate::summarize(&state.store.ratings().await?);
            aggregate::top_dishes_for_day(&current, &summary, label)
        }
        _ => Vec::new(),
    };

    Ok(Json(TodayResp {
        weekday,
        date_key: day.day_key,
        entry,
        top_dishes,
    }))
}

async fn submit_rating(
    State(state): State<AppState>,
    body: Body<ratings::Submission>,
) -> ApiResult<Ack> {
    let Json(submission) = body?;
    ratings::submit(&state.store, submission).await?;
    Ok(ack("rating submitted"))
}

async fn ratings_summary(
    State(state): State<AppState>,
    body: Body<PasswordReq>,
) -> ApiResult<SummaryResp> {
    let Json(req) = body?;
    let summary = aggregate::summary(&state.store, &state.secrets, &req.password).await?;
    Ok(Json(SummaryResp { summary }))
}

async fn ratings_all(
    State(state): State<AppState>,
    body: Body<PasswordReq>,
) -> ApiResult<RatingsResp> {
    let Json(req) = body?;
    let ratings = ratings::all(&state.store, &state.secrets, &req.password).await?;
    Ok(Json(RatingsResp { ratings }))
}

async fn clear_ratings(State(state): State<AppState>, body: Body<PasswordReq>) -> ApiResult<Ack> {
    let Json(req) = body?;
    ratings::clear(&state.store, &state.secrets, &req.password).await?;
    Ok(ack("ratings cleared"))
}

async fn verify_mystery(State(state): State<AppState>, body: Body<CodeReq>) -> ApiResult<Ack> {
    let Json(req) = body?;
    mystery::verify(&state.secrets, &req.code)?;
    Ok(ack("mystery reviewer verified, your ratings count three times"))
}

async fn set_mystery_code(
    State(state): State<AppState>,
    body: Body<SetCodeReq>,
) -> ApiResult<Ack> {
    let Json(req) = body?;
    admin::check(&state.secrets, &req.password)?;
    let new_code = req
        .new_code
        .ok_or_else(|| CanteenError::validation("newCode is required"))?;
    mystery::set_code(&state.store, &state.secrets, &req.password, &new_code).await?;
    Ok(ack("mystery code updated"))
}

async fn get_mystery_code(
    State(state): State<AppState>,
    body: Body<PasswordReq>,
) -> ApiResult<CodeResp> {
    let Json(req) = body?;
    let code = mystery::get_code(&state.secrets, &req.password)?;
    Ok(Json(CodeResp { code }))
}

async fn verify_admin(State(state): State<AppState>, body: Body<PasswordReq>) -> ApiResult<Ack> {
    let Json(req) = body?;
    admin::check(&state.secrets, &req.password)?;
    Ok(Json(Ack {
        success: true,
        message: None,
    }))
}
