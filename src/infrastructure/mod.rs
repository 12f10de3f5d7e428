pub mod cart_repo;
pub mod catalog_repo;
pub mod image_store;
pub mod jwt;
pub mod models;
pub mod order_repo;
pub mod password;
pub mod payment_repo;
pub mod payu;
pub mod report_repo;
pub mod user_repo;

#[cfg(test)]
pub(crate) mod test_db;

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::domain::errors::DomainError;

/// Row offset of a 1-based page; pages past what an `i64` offset can address are invalid.
pub(crate) fn page_offset(page: i64, limit: i64) -> Result<i64, DomainError> {
    page.max(1)
        .checked_sub(1)
        .and_then(|p| p.checked_mul(limit))
        .ok_or_else(|| DomainError::invalid("page is out of range"))
}

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::NotFound => DomainError::not_found("Record"),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DomainError::Conflict(info.message().to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                DomainError::InvalidInput(info.message().to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}
