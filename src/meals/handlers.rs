use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::auth::jwt::AuthUser;
use crate::catalog::repo as catalog;
use crate::db::unix_millis;
use crate::profile::goals;
use crate::state::AppState;

use super::dto::{AddEntryRequest, DailySummaryOut, EntriesParams, LogEntryOut, UpdateEntryRequest};
use super::repo;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/log/summary", get(daily_summary))
        .route("/log/entries", get(list_entries))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/log/entries", post(add_entry))
        .route("/log/entries/:id", patch(update_entry).delete(delete_entry))
}

/// A log view becoming visible is a rollover trigger; a failed check must not
/// keep the view from loading, the next trigger retries.
async fn ensure_rolled_over(state: &AppState, user_id: Uuid, now: OffsetDateTime) {
    if let Err(e) = state.archiver.check(user_id, now).await {
        error!(error = %e, %user_id, "rollover check failed, serving current log anyway");
    }
}

#[instrument(skip(state))]
pub async fn daily_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<DailySummaryOut>, (StatusCode, String)> {
    let now = OffsetDateTime::now_utc();
    ensure_rolled_over(&state, user_id, now).await;

    let user = crate::auth::repo::find_by_id(&state.db, &user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let since = state.archiver.start_of_today_ms(now);
    let totals = repo::daily_totals(&state.db, &user_id, since)
        .await
        .map_err(internal)?;
    let summaries = repo::meal_summaries(&state.db, &user_id, since)
        .await
        .map_err(internal)?;

    Ok(Json(DailySummaryOut::assemble(
        state.archiver.local_today(now).to_string(),
        goals::effective_goals(&user),
        totals,
        summaries,
    )))
}

#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<EntriesParams>,
) -> Result<Json<Vec<LogEntryOut>>, (StatusCode, String)> {
    let now = OffsetDateTime::now_utc();
    ensure_rolled_over(&state, user_id, now).await;

    let since = state.archiver.start_of_today_ms(now);
    let rows = repo::entries_by_type(&state.db, &user_id, params.meal_type, since)
        .await
        .map_err(internal)?;
    Ok(Json(rows.into_iter().map(LogEntryOut::from).collect()))
}

#[instrument(skip(state, body))]
pub async fn add_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<AddEntryRequest>,
) -> Result<(StatusCode, Json<LogEntryOut>), (StatusCode, String)> {
    if body.quantity_g <= 0 {
        return Err((StatusCode::BAD_REQUEST, "quantity_g must be positive".into()));
    }

    let product = catalog::find_by_id(&state.db, body.product_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Product not found".to_string()))?;

    // макросы каталога даны на 100 г
    let factor = body.quantity_g as f64 / 100.0;
    let now = OffsetDateTime::now_utc();
    let entry_id = repo::add_entry(
        &state.db,
        &user_id,
        body.product_id,
        body.meal_type,
        body.quantity_g,
        product.calories * factor,
        product.protein * factor,
        product.fat * factor,
        product.carbs * factor,
        unix_millis(now),
    )
    .await
    .map_err(internal)?;

    let row = repo::get_entry(&state.db, &user_id, entry_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| internal_msg("entry vanished after insert"))?;

    tracing::info!(%user_id, meal = body.meal_type.as_str(), product = %row.product_name, "meal logged");

    Ok((StatusCode::CREATED, Json(LogEntryOut::from(row))))
}

#[instrument(skip(state, body))]
pub async fn update_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateEntryRequest>,
) -> Result<Json<LogEntryOut>, (StatusCode, String)> {
    if body.quantity_g <= 0 {
        return Err((StatusCode::BAD_REQUEST, "quantity_g must be positive".into()));
    }

    let entry = repo::get_entry(&state.db, &user_id, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Log entry not found".to_string()))?;

    let product = catalog::find_by_id(&state.db, entry.product_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Product not found".to_string()))?;

    let factor = body.quantity_g as f64 / 100.0;
    let updated = repo::update_entry_quantity(
        &state.db,
        &user_id,
        id,
        body.quantity_g,
        product.calories * factor,
        product.protein * factor,
        product.fat * factor,
        product.carbs * factor,
    )
    .await
    .map_err(internal)?;
    if !updated {
        return Err((StatusCode::NOT_FOUND, "Log entry not found".into()));
    }

    let row = repo::get_entry(&state.db, &user_id, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| internal_msg("entry vanished after update"))?;
    Ok(Json(LogEntryOut::from(row)))
}

#[instrument(skip(state))]
pub async fn delete_entry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    let deleted = repo::delete_entry(&state.db, &user_id, id)
        .await
        .map_err(internal)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Log entry not found".into()))
    }
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn internal_msg(msg: &str) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string())
}
