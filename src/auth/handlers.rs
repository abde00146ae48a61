use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::session;
use crate::db::models::NewUser;
use crate::error::{AppError, AppResult, FieldError};
use crate::extractors::{ApiJson, CurrentUser};
use crate::state::AppState;
use crate::store::StoreError;

// -- Request types --

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Rules for new accounts; login only needs the fields to be present.
    fn validate_new(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();

        let username = self.username.trim();
        if username.len() < 3 || username.len() > 32 {
            errors.push(FieldError::new(
                "username",
                "must be between 3 and 32 characters",
            ));
        } else if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            errors.push(FieldError::new(
                "username",
                "may only contain letters, digits and underscores",
            ));
        }

        if self.password.chars().count() < 8 {
            errors.push(FieldError::new("password", "must be at least 8 characters"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

fn with_session_cookie(state: &AppState, status: StatusCode, token: &str, body: impl IntoResponse) -> Response {
    let cookie = session::session_cookie(
        &state.config.auth.cookie_name,
        token,
        state.config.auth.session_hours,
    );
    (status, [(header::SET_COOKIE, cookie)], body).into_response()
}

/// POST /auth/register: create an account and sign it in.
/// The first account on an empty instance becomes the admin.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Credentials>,
) -> AppResult<Response> {
    req.validate_new()?;

    let user_count = state.store.user_count().await?;
    if user_count > 0 && !state.config.auth.allow_registration {
        return Err(AppError::Forbidden);
    }

    let password_hash =
        session::hash_password(req.password, state.config.auth.password_cost).await?;

    let user = state
        .store
        .create_user(NewUser {
            username: req.username.trim().to_string(),
            password_hash,
            is_admin: false,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::Validation(vec![FieldError::new(
                "username",
                "is already taken",
            )]),
            other => other.into(),
        })?;

    tracing::info!(user_id = user.id, admin = user.is_admin, "Registered user {}", user.username);

    let token =
        session::create_session(state.store.as_ref(), user.id, state.config.auth.session_hours)
            .await?;
    Ok(with_session_cookie(&state, StatusCode::CREATED, &token, Json(user)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Credentials>,
) -> AppResult<Response> {
    let user = state
        .store
        .find_user_by_username(req.username.trim())
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !session::verify_password(req.password, user.password_hash.clone()).await? {
        tracing::warn!("Failed login for {}", user.username);
        return Err(AppError::Unauthorized);
    }

    let token =
        session::create_session(state.store.as_ref(), user.id, state.config.auth.session_hours)
            .await?;
    Ok(with_session_cookie(&state, StatusCode::OK, &token, Json(user)))
}

/// POST /auth/logout: drop the session (if any) and clear the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = session::cookie_value(&headers, cookie_name) {
        state.store.delete_session(token).await?;
    }

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session::clear_session_cookie(cookie_name))],
        Json(json!({ "ok": true })),
    )
        .into_response())
}

/// GET /auth/me
pub async fn me(user: CurrentUser) -> Json<CurrentUser> {
    Json(user)
}
