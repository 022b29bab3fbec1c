use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{error, instrument};

use crate::auth::jwt::AuthUser;
use crate::db::from_unix_millis;
use crate::meals::repo::MealType;
use crate::state::AppState;

use super::repo;
use super::service::{RolloverEvent, RolloverOutcome};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/log/rollover", post(trigger_rollover))
        .route("/log/rollover/wait", get(wait_for_rollover))
        .route("/log/archive", get(list_archive))
}

#[derive(Debug, Serialize)]
pub struct RolloverResponse {
    pub status: &'static str,
    pub archived: u64,
}

#[derive(Debug, Deserialize)]
pub struct ArchivePage {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct ArchivedEntryOut {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub meal_type: MealType,
    pub quantity_g: i64,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub archived_at: OffsetDateTime,
}

/// User-initiated refresh. Unlike the view-load triggers this one reports a
/// failed rollover to the caller instead of absorbing it.
#[instrument(skip(state))]
pub async fn trigger_rollover(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<RolloverResponse>, (StatusCode, String)> {
    match state.archiver.check(user_id, OffsetDateTime::now_utc()).await {
        Ok(RolloverOutcome::Current) => Ok(Json(RolloverResponse {
            status: "current",
            archived: 0,
        })),
        Ok(RolloverOutcome::AlreadyRunning) => Ok(Json(RolloverResponse {
            status: "already_running",
            archived: 0,
        })),
        Ok(RolloverOutcome::Completed { archived }) => Ok(Json(RolloverResponse {
            status: "rolled_over",
            archived,
        })),
        Err(e) => {
            error!(error = %e, %user_id, "requested rollover failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Long-poll used by log views to learn that a rollover happened and their
/// data needs reloading. Answers `null` when nothing fires within the window.
#[instrument(skip(state))]
pub async fn wait_for_rollover(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Json<Option<RolloverEvent>> {
    let mut events = state.archiver.subscribe();
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(25);
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Ok(event)) if event.user_id == user_id => return Json(Some(event)),
            Ok(Ok(_)) => continue,
            Ok(Err(tokio::sync::broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(_)) | Err(_) => return Json(None),
        }
    }
}

#[instrument(skip(state))]
pub async fn list_archive(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(page): Query<ArchivePage>,
) -> Result<Json<Vec<ArchivedEntryOut>>, (StatusCode, String)> {
    let rows = repo::archive_page(&state.db, &user_id, page.limit.clamp(1, 200), page.offset.max(0))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let out = rows
        .into_iter()
        .map(|r| ArchivedEntryOut {
            id: r.id,
            product_id: r.product_id,
            product_name: r.product_name,
            meal_type: r.meal_type,
            quantity_g: r.quantity_g,
            calories: r.calories,
            protein: r.protein,
            fat: r.fat,
            carbs: r.carbs,
            logged_at: from_unix_millis(r.logged_at),
            archived_at: from_unix_millis(r.archived_at),
        })
        .collect();
    Ok(Json(out))
}
