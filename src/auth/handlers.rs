use axum::{
    extract::{FromRef, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, PublicUser, RegisterRequest, RegisterResponse,
            VerifyParams, VerifyResponse,
        },
        jwt::JwtKeys,
    },
    state::AppState,
    store::{NewUser, StoreError, UserUpdate},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify_email))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn store_error(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::Duplicate => (
            StatusCode::CONFLICT,
            "User with this email already exists".into(),
        ),
        StoreError::NotFound => (StatusCode::NOT_FOUND, "User not found".into()),
        StoreError::Persistence { .. } | StoreError::Hash { .. } => {
            error!(error = %e, "store operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
            )
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), (StatusCode, String)> {
    payload.email = payload.email.trim().to_string();

    if payload.first_name.trim().is_empty() || payload.last_name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "First name and last name are required".into(),
        ));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    if state
        .store
        .get_user_by_email(&payload.email)
        .await
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err((
            StatusCode::CONFLICT,
            "User with this email already exists".into(),
        ));
    }

    // The pre-check above can lose a race; the store re-checks under its
    // write lock and a late Duplicate still maps to 409.
    let user = state
        .store
        .create_user(NewUser {
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            company: payload.company,
            phone: payload.phone,
            password: payload.password,
            is_verified: false,
        })
        .await
        .map_err(store_error)?;

    send_verification_notice(&user.email, user.id);

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: PublicUser::from(&user),
            message: "User registered successfully. Please check your email for verification."
                .into(),
        }),
    ))
}

/// Simulated delivery: the platform logs the link instead of sending real
/// mail, and the verification token is the user id.
fn send_verification_notice(email: &str, user_id: Uuid) {
    info!(%email, "verification notice queued: /api/auth/verify?token={user_id}");
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_string();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email and password are required".into(),
        ));
    }

    // Unknown account and wrong password produce the same response so the
    // endpoint cannot be used to enumerate registered emails.
    let Some(user) = state.store.get_user_by_email(&payload.email).await else {
        warn!(email = %payload.email, "login unknown email");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    };

    if !user.is_verified {
        warn!(user_id = %user.id, "login attempt on unverified account");
        return Err((
            StatusCode::UNAUTHORIZED,
            "Please verify your email before logging in".into(),
        ));
    }

    let ok = state
        .store
        .verify_password(&payload.email, &payload.password)
        .await
        .map_err(store_error)?;
    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let user = state
        .store
        .update_user(
            user.id,
            UserUpdate {
                last_login: Some(OffsetDateTime::now_utc()),
                ..UserUpdate::default()
            },
        )
        .await
        .map_err(store_error)?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<VerifyResponse>, (StatusCode, String)> {
    let users = state.store.get_all_users().await;
    let Some(user) = users.into_iter().find(|u| u.id == params.token) else {
        warn!(token = %params.token, "invalid verification token");
        return Err((StatusCode::BAD_REQUEST, "Invalid verification token".into()));
    };

    let user = state
        .store
        .update_user(
            user.id,
            UserUpdate {
                is_verified: Some(true),
                ..UserUpdate::default()
            },
        )
        .await
        .map_err(store_error)?;

    info!(user_id = %user.id, "email verified");
    Ok(Json(VerifyResponse {
        user: PublicUser::from(&user),
        message: "Email verified successfully! You can now log in.".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }
}
