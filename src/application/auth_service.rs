use chrono::{DateTime, Utc};

use crate::domain::errors::DomainError;
use crate::domain::ports::{PasswordHasher, TokenIssuer, UserRepository};
use crate::domain::user::{normalize_email, NewUser, Principal, Role, UserView};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

pub struct AuthService<R, H, T> {
    users: R,
    hasher: H,
    tokens: T,
}

impl<R, H, T> AuthService<R, H, T>
where
    R: UserRepository,
    H: PasswordHasher,
    T: TokenIssuer,
{
    pub fn new(users: R, hasher: H, tokens: T) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthSession, DomainError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::invalid(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if full_name.trim().is_empty() {
            return Err(DomainError::invalid("full name is required"));
        }

        let user = self.users.create(&NewUser {
            email,
            full_name: full_name.trim().to_string(),
            password_hash: self.hasher.hash(password)?,
            role: Role::User,
        })?;
        log::info!("Registered user {}", user.id);
        self.session_for(user)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<AuthSession, DomainError> {
        let invalid = || DomainError::Unauthorized("invalid email or password".to_string());
        let email = normalize_email(email).map_err(|_| invalid())?;
        let Some(credentials) = self.users.find_credentials(&email)? else {
            return Err(invalid());
        };
        if !self.hasher.verify(&credentials.password_hash, password)? {
            log::warn!("Failed login for user {}", credentials.user.id);
            return Err(invalid());
        }
        self.session_for(credentials.user)
    }

    /// Resolves a bearer token to the principal it was issued for.
    pub fn authenticate(&self, token: &str) -> Result<Principal, DomainError> {
        self.tokens.validate(token)
    }

    pub fn me(&self, principal: &Principal) -> Result<UserView, DomainError> {
        self.users
            .find_by_id(principal.user_id)?
            .ok_or_else(|| DomainError::not_found("User"))
    }

    /// Makes sure an administrator with this email exists, promoting an
    /// existing account if necessary.
    pub fn ensure_admin(&self, email: &str, password: &str) -> Result<UserView, DomainError> {
        let email = normalize_email(email)?;
        if let Some(existing) = self.users.find_credentials(&email)? {
            if existing.user.role != Role::Admin {
                self.users.update_role(existing.user.id, Role::Admin)?;
                log::info!("Promoted {} to administrator", existing.user.id);
            }
            return Ok(UserView {
                role: Role::Admin,
                ..existing.user
            });
        }
        let user = self.users.create(&NewUser {
            email,
            full_name: "Administrator".to_string(),
            password_hash: self.hasher.hash(password)?,
            role: Role::Admin,
        })?;
        log::info!("Created administrator account {}", user.id);
        Ok(user)
    }

    fn session_for(&self, user: UserView) -> Result<AuthSession, DomainError> {
        let issued = self.tokens.issue(&Principal {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
        })?;
        Ok(AuthSession {
            token: issued.token,
            expires_at: issued.expires_at,
            user,
        })
    }
}
