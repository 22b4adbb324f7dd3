use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::jwt::AuthUser,
    state::AppState,
    store::{StoreError, UserUpdate},
    users::dto::{ProfileResponse, UpdateProfileRequest},
};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/user/profile", get(get_profile).put(update_profile))
}

#[instrument(skip(state, claims))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let Some(user) = state.store.get_user_by_email(&claims.email).await else {
        warn!(user_id = %claims.sub, "profile fetch for missing account");
        return Err((StatusCode::NOT_FOUND, "User not found".into()));
    };
    Ok(Json(ProfileResponse::from(user)))
}

#[instrument(skip(state, claims, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    if payload.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No valid fields to update".into()));
    }

    let update = UserUpdate {
        first_name: payload.first_name,
        last_name: payload.last_name,
        company: payload.company,
        phone: payload.phone,
        ..UserUpdate::default()
    };

    let user = state
        .store
        .update_user(claims.sub, update)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
            other => {
                error!(error = %other, "profile update failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        })?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(ProfileResponse::from(user)))
}
