//! Registration, login and logout.

use axum::extract::State;
use axum_extra::extract::CookieJar;
use std::sync::Arc;

use super::auth::{access_cookie, hash_password, issue_access_token, removal_cookie, verify_password};
use super::error::{is_unique_violation, ApiError};
use super::extract::ApiJson;
use super::response::{ApiResponse, Empty};
use super::validation;
use crate::db::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, User};
use crate::AppState;

const EMAIL_IN_USE: &str = "Email already in use";

fn email_in_use_on_race(err: sqlx::Error) -> ApiError {
    if is_unique_violation(&err) {
        ApiError::conflict(EMAIL_IN_USE)
    } else {
        err.into()
    }
}

/// Register endpoint
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<ApiResponse<RegisterResponse>, ApiError> {
    let new_user = validation::validate_registration(&request).map_err(ApiError::bad_request)?;

    if User::find_by_email(&state.db, &new_user.email).await?.is_some() {
        return Err(ApiError::conflict(EMAIL_IN_USE));
    }

    let password_hash = hash_password(&new_user.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    // The unique index still catches a registration racing this one
    let user = User::create(&state.db, &new_user.full_name, &new_user.email, &password_hash)
        .await
        .map_err(email_in_use_on_race)?;

    tracing::info!(user_id = %user.id, "Registered user {}", user.email);

    Ok(ApiResponse::created(
        RegisterResponse { user: user.into() },
        "User registered successfully",
    ))
}

/// Login endpoint. Issues a fresh access token as a cookie and in the body.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>), ApiError> {
    let credentials = validation::validate_login(&request).map_err(ApiError::bad_request)?;

    let user = match User::find_by_email(&state.db, &credentials.email).await? {
        Some(user) => user,
        None => {
            tracing::warn!("Login attempt for unregistered email");
            return Err(ApiError::unauthorized("Please register first"));
        }
    };

    if !verify_password(&credentials.password, &user.password_hash) {
        tracing::warn!(user_id = %user.id, "Login attempt with invalid password");
        return Err(ApiError::unauthorized("Invalid password"));
    }

    let auth = &state.config.auth;
    let access_token = issue_access_token(
        &user.id,
        &user.email,
        &auth.access_token_secret,
        auth.access_token_ttl_secs,
    )
    .map_err(|e| ApiError::internal(format!("Failed to sign access token: {}", e)))?;

    tracing::info!(user_id = %user.id, "User logged in");

    let jar = jar.add(access_cookie(auth, access_token.clone()));
    Ok((
        jar,
        ApiResponse::ok(LoginResponse { access_token }, "User logged in successfully"),
    ))
}

/// Logout endpoint. Always clears the cookie; the token itself is not checked.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, ApiResponse<Empty>) {
    let jar = jar.add(removal_cookie(&state.config.auth));
    (jar, ApiResponse::ok(Empty {}, "User logged out successfully"))
}
