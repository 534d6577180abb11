//! Registration, login and bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose `sub` claim carries the user id as a
//! string. Handlers that need a logged-in user take an
//! [`AuthenticatedUser`] argument; extraction fails closed.

use std::future::{ready, Ready};
use std::time::Duration;

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    db,
    errors::AppError,
    structs::User,
    utils::{hash_password, verify_password},
    AppState,
};

/// Registered JWT claims issued at login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys plus token lifetime.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("keys", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        TokenKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<String, AppError> {
        let iat = chrono::Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user_id.to_string(),
            iat,
            exp: iat.saturating_add(ttl),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verifies signature and expiry and returns the user id in `sub`.
    pub fn authenticate(&self, token: &str) -> Result<i64, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|e| AppError::Unauthenticated(format!("Invalid token: {}", e)))?;
        data.claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthenticated("Token subject is not a user id".to_owned()))
    }
}

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub lastname: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginToken {
    pub token: String,
    pub user_id: i64,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(state: &AppState, new_user: NewUser) -> Result<User, AppError> {
    let email = normalize_email(&new_user.email);
    let pwd_hash = hash_password(&new_user.password)?;
    db::create_user(
        state,
        &email,
        &pwd_hash,
        new_user.name.trim(),
        new_user.lastname.as_deref(),
    )
    .await
}

pub async fn login(state: &AppState, email: &str, password: &str) -> Result<LoginToken, AppError> {
    let email = normalize_email(email);
    let user = db::get_user_by_email(state, &email)
        .await?
        .ok_or_else(|| {
            log::warn!("Login attempt for unknown email {}", email);
            AppError::UnknownEmail
        })?;

    if !verify_password(password, &user.pwd_hash)? {
        log::warn!("Wrong password for user ID: {}", user.id);
        return Err(AppError::InvalidCredentials);
    }

    let token = state.tokens.issue(user.id)?;
    log::info!("User {} logged in", user.id);
    Ok(LoginToken {
        token,
        user_id: user.id,
    })
}

/// The user id carried by a valid `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub i64);

impl AuthenticatedUser {
    fn extract(req: &HttpRequest) -> Result<Self, AppError> {
        let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
            log::error!("AppState is not registered on the app");
            AppError::InternalServerError
        })?;

        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthenticated("Missing bearer token".to_owned()))?;

        state.tokens.authenticate(token).map(AuthenticatedUser)
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::extract(req))
    }
}
