use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::error::ApiError;
use crate::config::AuthConfig;
use crate::db::AuthUser;
use crate::AppState;

/// Reasons a request fails authentication. All of them surface as 401.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unauthorized request")]
    MissingToken,

    #[error("Invalid access token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid access token")]
    UnknownSubject,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if let AuthError::InvalidToken(ref cause) = err {
            tracing::debug!("Access token rejected: {}", cause);
        }
        ApiError::unauthorized(err.to_string())
    }
}

/// Claims embedded in an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Sign an HS256 access token for `user_id` valid for `ttl_secs`
pub fn issue_access_token(
    user_id: &str,
    email: &str,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::seconds(ttl_secs)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Check signature and expiry. Malformed, forged and expired tokens all fail
/// the same way.
pub fn verify_access_token(token: &str, secret: &str) -> Result<AccessClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Pull the access token from the cookie, falling back to a bearer header
fn extract_token(jar: &CookieJar, headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Build the access token cookie set on login
pub fn access_cookie(config: &AuthConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(config.cookie_max_age_secs))
        .build()
}

/// Expired cookie matching the login cookie's attributes, used to clear it.
/// Added to the jar rather than removed from it so that it is sent even when
/// the request carried no cookie.
pub fn removal_cookie(config: &AuthConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build((config.cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}

/// Resolve a raw token to the identity it was issued for
pub async fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, ApiError> {
    let claims = verify_access_token(token, &state.config.auth.access_token_secret)?;

    AuthUser::find_by_id(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| AuthError::UnknownSubject.into())
}

/// Auth middleware guarding the todo routes.
///
/// On success the resolved `AuthUser` is stored in the request extensions,
/// where the `AuthUser` extractor picks it up.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let jar = CookieJar::from_headers(request.headers());
    let token = extract_token(&jar, request.headers(), &state.config.auth.cookie_name)
        .ok_or(AuthError::MissingToken)?;

    let user = authenticate(&state, &token).await?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Extractor for the identity attached by `require_user`
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorCode;
    use axum::http::header::{AUTHORIZATION, COOKIE};

    const SECRET: &str = "test-secret";

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("Abcde1!").unwrap();
        assert_ne!(hash, "Abcde1!");
        assert!(verify_password("Abcde1!", &hash));
        assert!(!verify_password("abcde1!", &hash));
        assert!(!verify_password("Abcde1!", "not-a-hash"));
    }

    #[test]
    fn test_token_carries_subject() {
        let token = issue_access_token("user-1", "ada@example.com", SECRET, 60).unwrap();
        let claims = verify_access_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "ada@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejections_collapse_to_unauthorized() {
        let forged = issue_access_token("user-1", "ada@example.com", "other-secret", 60).unwrap();
        let expired = issue_access_token("user-1", "ada@example.com", SECRET, -3600).unwrap();

        for token in [forged.as_str(), expired.as_str(), "garbage", ""] {
            let err = ApiError::from(verify_access_token(token, SECRET).unwrap_err());
            assert_eq!(err.code(), ErrorCode::Unauthorized);
            assert_eq!(err.message(), "Invalid access token");
        }
    }

    #[test]
    fn test_recently_expired_token_rejected() {
        let token = issue_access_token("user-1", "ada@example.com", SECRET, -30).unwrap();

        let err = ApiError::from(verify_access_token(&token, SECRET).unwrap_err());
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), "Invalid access token");
    }

    #[test]
    fn test_missing_token_message() {
        let err = ApiError::from(AuthError::MissingToken);
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert_eq!(err.message(), "Unauthorized request");
    }

    #[test]
    fn test_extract_token_prefers_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "accessToken=from-cookie".parse().unwrap());
        headers.insert(AUTHORIZATION, "Bearer from-header".parse().unwrap());
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(
            extract_token(&jar, &headers, "accessToken").as_deref(),
            Some("from-cookie")
        );

        headers.remove(COOKIE);
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(
            extract_token(&jar, &headers, "accessToken").as_deref(),
            Some("from-header")
        );

        headers.remove(AUTHORIZATION);
        let jar = CookieJar::from_headers(&headers);
        assert!(extract_token(&jar, &headers, "accessToken").is_none());
    }

    #[test]
    fn test_access_cookie_attributes() {
        let config = AuthConfig::default();
        let cookie = access_cookie(&config, "token".to_string());

        assert_eq!(cookie.name(), "accessToken");
        assert_eq!(cookie.value(), "token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(86_400)));
    }

    #[test]
    fn test_removal_cookie_expires() {
        let cookie = removal_cookie(&AuthConfig::default());

        assert_eq!(cookie.name(), "accessToken");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }
}
