use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::errors::DomainError;

/// What a cart or order line points at: a single product or a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Product(Uuid),
    Bundle(Uuid),
}

impl ItemRef {
    /// Builds a reference from the pair of nullable columns / request fields.
    /// Exactly one of them must be set.
    pub fn from_parts(product_id: Option<Uuid>, bundle_id: Option<Uuid>) -> Result<Self, DomainError> {
        match (product_id, bundle_id) {
            (Some(p), None) => Ok(ItemRef::Product(p)),
            (None, Some(b)) => Ok(ItemRef::Bundle(b)),
            (Some(_), Some(_)) => Err(DomainError::invalid(
                "a line must reference either a product or a bundle, not both",
            )),
            (None, None) => Err(DomainError::invalid(
                "a line must reference a product or a bundle",
            )),
        }
    }

    pub fn product_id(&self) -> Option<Uuid> {
        match self {
            ItemRef::Product(id) => Some(*id),
            ItemRef::Bundle(_) => None,
        }
    }

    pub fn bundle_id(&self) -> Option<Uuid> {
        match self {
            ItemRef::Bundle(id) => Some(*id),
            ItemRef::Product(_) => None,
        }
    }
}

/// A cart line joined with the current catalog price of its target.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub item_id: Uuid,
    pub item: ItemRef,
    pub name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub active: bool,
}

impl PricedLine {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

/// Σ unit_price × quantity over the given lines.
pub fn subtotal(lines: &[PricedLine]) -> BigDecimal {
    lines
        .iter()
        .fold(BigDecimal::from(0), |acc, line| acc + line.line_total())
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lines: Vec<PricedLine>,
    pub subtotal: BigDecimal,
}

impl CartView {
    pub fn new(id: Uuid, user_id: Uuid, lines: Vec<PricedLine>) -> Self {
        let subtotal = subtotal(&lines);
        Self {
            id,
            user_id,
            lines,
            subtotal,
        }
    }

    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }
}

/// Client-held cart line sent on login to be merged into the server cart.
#[derive(Debug, Clone)]
pub struct SyncItem {
    pub item: ItemRef,
    pub quantity: i32,
}
