// src/server/mod.rs

//! HTTP surface over the event cache.
//!
//! - `GET /`: index page with sample links
//! - `GET /debug`: cache counters
//! - `GET /{json,rss,ical}/{name}/{id}`: feeds for one performer

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::feeds::{FeedFormat, render_ical, render_json, render_rss};
use crate::models::ActorKey;
use crate::storage::EventCache;

const SAMPLE_NAME: &str = "三森すずこ";
const SAMPLE_ID: u64 = 2634;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<EventCache>,
}

impl AppState {
    pub fn new(cache: Arc<EventCache>) -> Self {
        Self { cache }
    }
}

/// Error returned by handlers, rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            err if err.is_upstream() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/debug", get(debug))
        .route("/json/{name}/{id}", get(json_feed))
        .route("/rss/{name}/{id}", get(rss_feed))
        .route("/ical/{name}/{id}", get(ical_feed))
        .with_state(state)
}

async fn index() -> Html<String> {
    let mut links = String::new();
    for (route, label) in [("json", "JSON"), ("rss", "RSS"), ("ical", "iCal")] {
        links.push_str(&format!(
            "    <a href=\"/{route}/{SAMPLE_NAME}/{SAMPLE_ID}\">/{route}/{SAMPLE_NAME}/{SAMPLE_ID}</a> \
             Events for {SAMPLE_NAME}(id={SAMPLE_ID}) in {label}<br/>\n"
        ));
    }

    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n    <title>eventfeed</title>\n</head>\n<body>\n\
         \x20   I'm alive!<br/>\n{links}    <a href=\"/debug\">/debug</a>\n</body>\n</html>\n"
    ))
}

async fn debug(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.cache.snapshot().await;
    Json(json!({
        "events_cache": {
            "actors_size": snapshot.tracked_keys,
            "actors": snapshot.actors,
            "events_size": snapshot.total_events,
            "crawling": snapshot.crawling,
        }
    }))
}

async fn json_feed(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, u64)>,
) -> Result<Response, ApiError> {
    let events = state.cache.resolve(&ActorKey::new(name, id)).await?;
    Ok(feed_response(FeedFormat::Json, render_json(&events)?))
}

async fn rss_feed(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, u64)>,
) -> Result<Response, ApiError> {
    let key = ActorKey::new(name, id);
    let events = state.cache.resolve(&key).await?;
    let base_url = state.cache.crawler().base_url();
    Ok(feed_response(
        FeedFormat::Rss,
        render_rss(&key, base_url, &events, Utc::now())?,
    ))
}

async fn ical_feed(
    State(state): State<AppState>,
    Path((name, id)): Path<(String, u64)>,
) -> Result<Response, ApiError> {
    let events = state.cache.resolve(&ActorKey::new(name, id)).await?;
    let base_url = state.cache.crawler().base_url();
    Ok(feed_response(
        FeedFormat::Ical,
        render_ical(base_url, &events, Utc::now())?,
    ))
}

fn feed_response(format: FeedFormat, body: String) -> Response {
    ([(header::CONTENT_TYPE, format.content_type())], body).into_response()
}
