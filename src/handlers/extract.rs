use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};

use crate::domain::user::Principal;
use crate::errors::AppError;
use crate::handlers::Auth;

/// Any caller holding a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

/// A caller whose token carries the `ADMIN` role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Principal);

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn principal(req: &HttpRequest) -> Result<Principal, AppError> {
    let auth = req
        .app_data::<web::Data<Auth>>()
        .ok_or_else(|| AppError::Internal("auth service is not configured".to_string()))?;
    let token = bearer_token(req)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
    Ok(auth.authenticate(token)?)
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(principal(req).map(AuthUser))
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = principal(req).and_then(|p| {
            if p.is_admin() {
                Ok(AdminUser(p))
            } else {
                log::warn!("User {} denied access to {}", p.user_id, req.path());
                Err(AppError::Forbidden)
            }
        });
        ready(result)
    }
}
