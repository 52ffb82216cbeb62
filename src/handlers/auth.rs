use actix_web::{web, HttpRequest, HttpResponse, Result};
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::config::AppConfig;
use crate::database::Database;
use crate::models::auth::{LoginRequest, LoginResponse, UserPublic};
use crate::utils::errors::ServiceError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user id)
    pub username: String,
    pub exp: usize, // Expiration time (Unix timestamp)
    pub iat: usize, // Issued at (Unix timestamp)
}

/// Resolves the caller's user id from the bearer token. This is the only
/// source for a task's owner; the request body is never consulted for it.
pub fn authenticate(req: &HttpRequest, config: &AppConfig) -> Result<i32, ServiceError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| ServiceError::Unauthorized("Invalid token".to_string()))?;

    claims
        .claims
        .sub
        .parse()
        .map_err(|_| ServiceError::Unauthorized("Invalid user ID in token".to_string()))
}

/// User login endpoint
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn login(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    login_req: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/login - Login attempt for: {}", login_req.username);

    if login_req.username.trim().is_empty() {
        return Err(ServiceError::Validation("Username is required".to_string()));
    }
    if login_req.password.trim().is_empty() {
        return Err(ServiceError::Validation("Password is required".to_string()));
    }

    let user_row = sqlx::query(
        "SELECT id, username, email, name, password_hash FROM users WHERE username = $1",
    )
    .bind(&login_req.username)
    .fetch_optional(&db.pool)
    .await
    .map_err(|e| {
        log::error!("Database error during login: {}", e);
        crate::store::StoreError::Database(e)
    })?;

    let user_row = match user_row {
        Some(row) => row,
        None => {
            log::warn!("Login failed: user not found - {}", login_req.username);
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let stored_hash: String = user_row.get("password_hash");
    let password_valid = verify(&login_req.password, &stored_hash).map_err(|e| {
        log::error!("Password verification error: {}", e);
        ServiceError::Internal("Password verification failed".to_string())
    })?;

    if !password_valid {
        log::warn!("Login failed: invalid password for {}", login_req.username);
        return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
    }

    let user_id: i32 = user_row.get("id");
    let now = Utc::now();
    let exp = (now + Duration::hours(24)).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        username: login_req.username.clone(),
        exp,
        iat: now.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| {
        log::error!("JWT encoding error: {}", e);
        ServiceError::Internal("Failed to generate token".to_string())
    })?;

    log::info!("Login successful for user: {}", login_req.username);
    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: UserPublic {
            id: user_id,
            username: user_row.get("username"),
            name: user_row.get("name"),
            email: user_row.get("email"),
        },
    }))
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/auth").route("/login", web::post().to(login)));
}
