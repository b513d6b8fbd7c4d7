//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration, login, and logout, plus
//! issuing and checking the bearer tokens the middleware relies on.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use serde::{Deserialize, Serialize};
use silogia_core::domain::{AuthSession, NewUser, UserProfile};
use std::sync::{Arc, LazyLock};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{port_error, HandlerError};
use crate::web::dto::{MessageResponseGeneric, UserResponse};
use crate::web::state::{AppState, CurrentUser};

pub const MIN_PASSWORD_CHARS: usize = 6;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

//=========================================================================================
// Tokens
//=========================================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing keys and token lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

pub struct IssuedToken {
    pub token: String,
    /// The session row that must exist for the token to be accepted.
    pub session: AuthSession,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let jti = Uuid::new_v4().to_string();
        let claims = Claims {
            sub: user_id.to_string(),
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken {
            token,
            session: AuthSession {
                id: jti,
                user_id,
                expires_at,
            },
        })
    }

    /// Checks the signature and expiry. Revocation is checked separately against
    /// the stored sessions.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub country: Option<String>,
    pub profession: Option<String>,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), String> {
        if !EMAIL.is_match(self.email.trim()) {
            return Err("A valid email address is required".to_string());
        }
        let username_len = self.username.trim().chars().count();
        if !(3..=50).contains(&username_len) {
            return Err("Username must be between 3 and 50 characters".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_CHARS
            ));
        }
        Ok(())
    }
}

/// Either `username` or `email` identifies the account.
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    /// Always `bearer`.
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/users/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email or username already registered"),
        (status = 500, description = "Internal server error")
    ),
    tag = "users"
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    req.validate().map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    let salt = SaltString::generate(&mut OsRng);
    let hashed_password = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    let new_user = NewUser {
        email: req.email.trim().to_string(),
        username: req.username.trim().to_string(),
        hashed_password,
        profile: UserProfile {
            full_name: req.full_name,
            avatar_url: req.avatar_url,
            bio: req.bio,
            country: req.country,
            profession: req.profession,
        },
    };
    let user = state.db.create_user(&new_user).await.map_err(port_error)?;
    info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /api/users/login - Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Neither username nor email given"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "users"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string());

    let login = req
        .username
        .as_deref()
        .or(req.email.as_deref())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "username or email is required".to_string()))?;

    let creds = state.db.get_credentials(login).await.map_err(|e| {
        warn!("Login failed for '{}': {}", login, e);
        invalid()
    })?;

    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        warn!(user_id = %creds.user_id, "Login failed: wrong password");
        return Err(invalid());
    }

    let issued = state.jwt.issue(creds.user_id).map_err(|e| {
        error!("Failed to sign token: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
    })?;
    state
        .db
        .create_auth_session(&issued.session)
        .await
        .map_err(port_error)?;
    let user = state.db.get_user_by_id(creds.user_id).await.map_err(port_error)?;

    Ok(Json(TokenResponse {
        token: issued.token,
        token_type: "bearer".to_string(),
        expires_at: issued.session.expires_at,
        user: user.into(),
    }))
}

/// POST /api/users/logout - Revoke the token used for this request
#[utoipa::path(
    post,
    path = "/api/users/logout",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponseGeneric),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, HandlerError> {
    state
        .db
        .delete_auth_session(&current.session_id.to_string())
        .await
        .map_err(port_error)?;
    info!(user_id = %current.user_id, "User logged out");
    Ok(Json(MessageResponseGeneric::new("Logged out successfully")))
}
