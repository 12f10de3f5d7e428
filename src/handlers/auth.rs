use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::auth_service::AuthSession;
use crate::domain::user::UserView;
use crate::errors::AppError;
use crate::handlers::extract::AuthUser;
use crate::handlers::{run_blocking, Auth};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    /// At least 8 characters.
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    /// `USER` or `ADMIN`.
    pub role: String,
    pub created_at: String,
}

impl From<UserView> for UserResponse {
    fn from(u: UserView) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            role: u.role.to_string(),
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    pub expires_at: String,
    pub user: UserResponse,
}

impl From<AuthSession> for AuthResponse {
    fn from(s: AuthSession) -> Self {
        Self {
            token: s.token,
            expires_at: s.expires_at.to_rfc3339(),
            user: s.user.into(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /auth/register
///
/// Creates a customer account and signs it in.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid email, password or name"),
        (status = 409, description = "Email already registered"),
    ),
    tag = "auth"
)]
pub async fn register(
    auth: web::Data<Auth>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let session =
        run_blocking(move || auth.register(&body.email, &body.password, &body.full_name)).await?;
    Ok(HttpResponse::Created().json(AuthResponse::from(session)))
}

/// POST /auth/login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid email or password"),
    ),
    tag = "auth"
)]
pub async fn login(
    auth: web::Data<Auth>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let session = run_blocking(move || auth.login(&body.email, &body.password)).await?;
    Ok(HttpResponse::Ok().json(AuthResponse::from(session)))
}

/// GET /auth/me
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The signed-in user", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(auth: web::Data<Auth>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let view = run_blocking(move || auth.me(&user.0)).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(view)))
}
