use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::instrument;

use crate::auth::jwt::AuthUser;
use crate::auth::repo as users;
use crate::state::AppState;

use super::dto::{GoalsOut, ProfileOut, UpdateProfileRequest};
use super::goals;
use super::repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/goals", get(get_goals))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileOut>, (StatusCode, String)> {
    let user = users::find_by_id(&state.db, &user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;
    Ok(Json(ProfileOut::from(user)))
}

#[instrument(skip(state, body))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileOut>, (StatusCode, String)> {
    if let Some(age) = body.age {
        if !(1..=120).contains(&age) {
            return Err((StatusCode::BAD_REQUEST, "Implausible age".into()));
        }
    }
    if matches!(body.weight_kg, Some(w) if w <= 0)
        || matches!(body.height_cm, Some(h) if h <= 0)
    {
        return Err((StatusCode::BAD_REQUEST, "Implausible body metrics".into()));
    }

    let updated = repo::update_profile(&state.db, &user_id, &body)
        .await
        .map_err(internal)?;
    if !updated {
        return Err((StatusCode::UNAUTHORIZED, "User not found".into()));
    }

    let user = users::find_by_id(&state.db, &user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;
    Ok(Json(ProfileOut::from(user)))
}

#[instrument(skip(state))]
pub async fn get_goals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<GoalsOut>, (StatusCode, String)> {
    let user = users::find_by_id(&state.db, &user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;
    Ok(Json(GoalsOut {
        effective: goals::effective_goals(&user),
        computed: goals::computed_goals(&user),
    }))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
