//! HS256 bearer tokens carrying the user id, email and role.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::{IssuedToken, TokenIssuer};
use crate::domain::user::Principal;

const ISSUER: &str = "apex-api";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    role: String,
    iat: i64,
    exp: i64,
    iss: String,
}

pub struct JwtTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration: Duration,
}

impl JwtTokens {
    pub fn new(secret: &str, expiration_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration: Duration::minutes(expiration_minutes),
        }
    }
}

impl TokenIssuer for JwtTokens {
    fn issue(&self, principal: &Principal) -> Result<IssuedToken, DomainError> {
        let now = Utc::now();
        let expires_at = now + self.expiration;
        let claims = Claims {
            sub: principal.user_id.to_string(),
            email: principal.email.clone(),
            role: principal.role.as_str().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: ISSUER.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::Internal(format!("token generation failed: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    fn validate(&self, token: &str) -> Result<Principal, DomainError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["sub", "exp", "iss"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                ErrorKind::InvalidSignature => "invalid token signature",
                _ => "invalid token",
            };
            DomainError::Unauthorized(reason.to_string())
        })?;

        let claims = data.claims;
        Ok(Principal {
            user_id: Uuid::parse_str(&claims.sub)
                .map_err(|_| DomainError::Unauthorized("invalid token subject".to_string()))?,
            email: claims.email,
            role: claims
                .role
                .parse()
                .map_err(|_| DomainError::Unauthorized("invalid token role".to_string()))?,
        })
    }
}
