use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::error::ApiError;
use crate::monitor::Monitor;
use crate::notify::{anon_token, validate_push_token, PushSender};
use crate::site::Site;
use crate::subscriptions::SubscriptionStore;
use crate::types::{HelperContact, NewsItem, NotificationKind, RankEntry, Subscription};

#[derive(Clone)]
pub struct AppState {
    pub site: Arc<Site>,
    pub monitor: Arc<Monitor>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub push: Arc<dyn PushSender>,
    pub helpers: Arc<Vec<HelperContact>>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/ranking", get(get_ranking))
        .route("/news", get(get_news))
        .route("/send-notification", post(send_notification))
        .route("/test-notification", get(test_notification_info))
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
        .route("/check-updates", post(check_updates))
        .route("/status", get(status))
        .route("/helpers", get(helpers));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Serve rank icons / news images from `dir` under `/images`.
pub fn with_assets(router: Router, dir: impl AsRef<Path>) -> Router {
    router.nest_service("/images", ServeDir::new(dir.as_ref()))
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::validation(format!("'{field}' is required"))),
    }
}

async fn get_ranking(State(state): State<AppState>) -> Result<Json<Vec<RankEntry>>, ApiError> {
    let rows = state.site.fetch_ranking().await?;
    Ok(Json(rows))
}

async fn get_news(State(state): State<AppState>) -> Result<Json<Vec<NewsItem>>, ApiError> {
    let news = state.site.fetch_news().await?;
    Ok(Json(news))
}

#[derive(serde::Deserialize)]
struct SendNotificationReq {
    #[serde(default, alias = "expoPushToken")]
    token: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

async fn send_notification(
    State(state): State<AppState>,
    Json(req): Json<SendNotificationReq>,
) -> Result<Json<Value>, ApiError> {
    let token = required(req.token, "token")?;
    let title = required(req.title, "title")?;
    let body = required(req.body, "body")?;

    validate_push_token(&token)?;

    let data = state.push.send(&token, &title, &body).await?;
    tracing::info!(target: "api", token = %anon_token(&token), "manual notification sent");
    Ok(Json(json!({
        "success": true,
        "message": "Notification sent",
        "data": data,
    })))
}

async fn test_notification_info() -> Json<Value> {
    Json(json!({
        "endpoint": "POST /api/send-notification",
        "body": {
            "token": "ExponentPushToken[...]",
            "title": "Notification title",
            "body": "Notification text",
        },
        "acceptedTokenPrefixes": crate::notify::TOKEN_PREFIXES,
    }))
}

#[derive(serde::Deserialize)]
struct SubscribeReq {
    #[serde(default, alias = "expoPushToken")]
    token: Option<String>,
    #[serde(default)]
    notifications: Option<Vec<String>>,
}

fn parse_kinds(raw: Vec<String>) -> Result<Vec<NotificationKind>, ApiError> {
    raw.iter()
        .map(|k| match k.trim().to_ascii_lowercase().as_str() {
            "ranking" => Ok(NotificationKind::Ranking),
            "news" => Ok(NotificationKind::News),
            other => Err(ApiError::validation(format!("unknown notification kind '{other}'"))),
        })
        .collect()
}

async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeReq>,
) -> Result<Json<Value>, ApiError> {
    let token = required(req.token, "token")?;
    let kinds = match req.notifications {
        Some(raw) if !raw.is_empty() => parse_kinds(raw)?,
        _ => return Err(ApiError::validation("'notifications' is required")),
    };

    let sub = Subscription::new(token, kinds);
    tracing::info!(
        target: "api",
        token = %anon_token(&sub.token),
        kinds = ?sub.notifications,
        "subscribed"
    );
    state.subscriptions.upsert(sub).await?;
    Ok(Json(json!({ "success": true, "message": "Subscribed" })))
}

#[derive(serde::Deserialize)]
struct UnsubscribeReq {
    #[serde(default, alias = "expoPushToken")]
    token: Option<String>,
}

async fn unsubscribe(
    State(state): State<AppState>,
    Json(req): Json<UnsubscribeReq>,
) -> Result<Json<Value>, ApiError> {
    let token = required(req.token, "token")?;
    let removed = state.subscriptions.remove(&token).await?;
    tracing::info!(target: "api", token = %anon_token(&token), removed, "unsubscribed");
    Ok(Json(json!({ "success": true, "message": "Unsubscribed" })))
}

async fn check_updates(State(state): State<AppState>) -> Json<Value> {
    let report = state.monitor.check_all().await;
    Json(json!({
        "success": true,
        "message": "Update check completed",
        "changes": report.total_changes(),
        "timestamp": report.finished_at.to_rfc3339(),
    }))
}

fn check_state(captured: bool) -> &'static str {
    if captured {
        "completed"
    } else {
        "pending"
    }
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    let store = state.monitor.store();
    let ranking = store.ranking();
    let news = store.news();
    Json(json!({
        "status": "running",
        "lastRankingCheck": check_state(ranking.is_captured()),
        "lastNewsCheck": check_state(news.is_captured()),
        "rankingPlayers": ranking.len(),
        "newsCount": news.len(),
        "subscribers": state.subscriptions.count().await,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn helpers(State(state): State<AppState>) -> Json<Vec<HelperContact>> {
    Json(state.helpers.as_ref().clone())
}
