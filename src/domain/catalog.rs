use std::collections::HashSet;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BrandView {
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BrandInput {
    pub name: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub search: Option<String>,
    pub include_inactive: bool,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct ProductPage {
    pub items: Vec<ProductView>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct BundleMember {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct BundleView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub members: Vec<BundleMember>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleMemberInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct BundleInput {
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub image_url: Option<String>,
    pub is_active: bool,
    /// `None` on update keeps the current members.
    pub members: Option<Vec<BundleMemberInput>>,
}

fn require_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::invalid("name must not be empty"));
    }
    Ok(())
}

fn require_price(price: &BigDecimal) -> Result<(), DomainError> {
    if *price < BigDecimal::from(0) {
        return Err(DomainError::invalid("price must not be negative"));
    }
    Ok(())
}

impl CategoryInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_name(&self.name)
    }
}

impl BrandInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_name(&self.name)
    }
}

impl ProductInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_name(&self.name)?;
        require_price(&self.price)?;
        if self.stock < 0 {
            return Err(DomainError::invalid("stock must not be negative"));
        }
        Ok(())
    }
}

impl BundleInput {
    pub fn validate(&self, creating: bool) -> Result<(), DomainError> {
        require_name(&self.name)?;
        require_price(&self.price)?;

        let Some(members) = &self.members else {
            if creating {
                return Err(DomainError::invalid("a bundle needs at least one product"));
            }
            return Ok(());
        };
        if members.is_empty() {
            return Err(DomainError::invalid("a bundle needs at least one product"));
        }
        let mut seen = HashSet::new();
        for member in members {
            if member.quantity < 1 {
                return Err(DomainError::invalid("bundle quantities must be at least 1"));
            }
            if !seen.insert(member.product_id) {
                return Err(DomainError::invalid(format!(
                    "product {} is listed twice in the bundle",
                    member.product_id
                )));
            }
        }
        Ok(())
    }
}
