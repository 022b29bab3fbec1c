use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::auth::jwt::AuthUser;
use crate::search::coordinator::SearchOutcome;
use crate::state::AppState;

use super::dto::{LookupParams, SearchParams, SearchResponse};
use super::repo::{self, Product};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products/search", get(search_products))
        .route("/products/lookup", get(lookup_product))
        .route("/products/search/cache/clear", post(clear_search_cache))
        .route("/products/:id", get(get_product))
}

#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let outcome = state
        .search
        .resolve(user_id, &params.q)
        .await
        .map_err(internal)?;
    let response = match outcome {
        SearchOutcome::Results(products) => SearchResponse {
            products,
            superseded: false,
        },
        SearchOutcome::Superseded => SearchResponse {
            products: Vec::new(),
            superseded: true,
        },
    };
    Ok(Json(response))
}

/// Resolves a tapped suggestion by its display name, with no remote round
/// trip.
#[instrument(skip(state))]
pub async fn lookup_product(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(params): Query<LookupParams>,
) -> Result<Json<Product>, (StatusCode, String)> {
    let product = state
        .search
        .resolve_selection(&params.name)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Product not found".to_string()))?;
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Product>, (StatusCode, String)> {
    let product = repo::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Product not found".to_string()))?;
    Ok(Json(product))
}

/// Explicit invalidation of the in-memory search caches.
#[instrument(skip(state))]
pub async fn clear_search_cache(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> StatusCode {
    state.search.invalidate_cache();
    info!(%user_id, "search caches cleared");
    StatusCode::NO_CONTENT
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
