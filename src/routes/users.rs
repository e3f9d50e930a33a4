use axum::{
    Router,
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::AppState;
use crate::onboarding::{self, StartProfile};
use crate::store::RewardStore;

/// Payload the messaging glue posts when it sees a `/start` command.
#[derive(Deserialize)]
struct StartRequest {
    id: i64,
    first_name: String,
    photo_url: Option<String>,
    ref_param: Option<String>,
}

async fn start(State(state): State<AppState>, Json(req): Json<StartRequest>) -> Response {
    let profile = StartProfile {
        id: req.id,
        first_name: req.first_name,
        photo_url: req.photo_url,
        ref_param: req.ref_param,
    };

    match onboarding::onboard(state.store.as_ref(), &profile).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {}", e),
        )
            .into_response(),
    }
}

async fn opened(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.store.set_frontend_opened(id).await {
        Ok(true) => (StatusCode::OK, "Frontend open recorded".to_string()).into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "User not found".to_string()).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {}", e),
        )
            .into_response(),
    }
}

async fn profile(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.store.find_user(id).await {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "User not found".to_string()).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {}", e),
        )
            .into_response(),
    }
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/start", post(start))
        .route("/users/:id", get(profile))
        .route("/users/:id/opened", post(opened))
}
