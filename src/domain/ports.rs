use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::cart::{CartView, ItemRef, SyncItem};
use super::catalog::{
    BrandInput, BrandView, BundleInput, BundleView, CategoryInput, CategoryView, ProductInput,
    ProductPage, ProductQuery, ProductView,
};
use super::errors::DomainError;
use super::order::{ListResult, OrderFilter, OrderStatus, OrderView, ShippingAddress};
use super::payment::{CheckoutForm, PaymentNotification, PaymentRecord, PaymentReturn, PaymentView};
use super::report::DashboardStats;
use super::user::{NewUser, Principal, Role, UserCredentials, UserView};

pub trait OrderRepository: Send + Sync + 'static {
    /// Snapshots the user's cart into a PENDING order and empties the cart,
    /// all in one transaction.
    fn create_from_cart(&self, user_id: Uuid, shipping: &ShippingAddress) -> Result<Uuid, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn list(&self, filter: &OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    /// Moves the order from `from` to `to`; `Conflict` if its status is no longer `from`.
    fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<(), DomainError>;
}

pub trait PaymentRepository: Send + Sync + 'static {
    /// Upserts the payment by transaction id and sets the order status in one transaction.
    fn record_confirmation(
        &self,
        payment: &PaymentRecord,
        order_status: OrderStatus,
    ) -> Result<(), DomainError>;
    fn list_for_order(&self, order_id: Uuid) -> Result<Vec<PaymentView>, DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    fn get_or_create(&self, user_id: Uuid) -> Result<CartView, DomainError>;
    fn add_item(&self, user_id: Uuid, item: ItemRef, quantity: i32) -> Result<CartView, DomainError>;
    /// A quantity of zero or less removes the line.
    fn set_quantity(&self, user_id: Uuid, item_id: Uuid, quantity: i32) -> Result<CartView, DomainError>;
    fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError>;
    fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError>;
    fn sync(&self, user_id: Uuid, items: &[SyncItem]) -> Result<CartView, DomainError>;
}

pub trait CatalogRepository: Send + Sync + 'static {
    fn list_categories(&self) -> Result<Vec<CategoryView>, DomainError>;
    fn find_category(&self, id: Uuid) -> Result<Option<CategoryView>, DomainError>;
    fn create_category(&self, input: &CategoryInput) -> Result<CategoryView, DomainError>;
    fn update_category(&self, id: Uuid, input: &CategoryInput) -> Result<CategoryView, DomainError>;
    fn delete_category(&self, id: Uuid) -> Result<(), DomainError>;

    fn list_brands(&self) -> Result<Vec<BrandView>, DomainError>;
    fn find_brand(&self, id: Uuid) -> Result<Option<BrandView>, DomainError>;
    fn create_brand(&self, input: &BrandInput) -> Result<BrandView, DomainError>;
    fn update_brand(&self, id: Uuid, input: &BrandInput) -> Result<BrandView, DomainError>;
    fn delete_brand(&self, id: Uuid) -> Result<(), DomainError>;

    fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, DomainError>;
    fn find_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError>;
    fn create_product(&self, input: &ProductInput) -> Result<ProductView, DomainError>;
    fn update_product(&self, id: Uuid, input: &ProductInput) -> Result<ProductView, DomainError>;
    fn delete_product(&self, id: Uuid) -> Result<(), DomainError>;

    fn list_bundles(&self, include_inactive: bool) -> Result<Vec<BundleView>, DomainError>;
    fn find_bundle(&self, id: Uuid) -> Result<Option<BundleView>, DomainError>;
    fn create_bundle(&self, input: &BundleInput) -> Result<BundleView, DomainError>;
    fn update_bundle(&self, id: Uuid, input: &BundleInput) -> Result<BundleView, DomainError>;
    fn delete_bundle(&self, id: Uuid) -> Result<(), DomainError>;
}

pub trait UserRepository: Send + Sync + 'static {
    /// Fails with `Conflict` when the email is already registered.
    fn create(&self, user: &NewUser) -> Result<UserView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<UserView>, DomainError>;
    fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, DomainError>;
    fn update_role(&self, id: Uuid, role: Role) -> Result<(), DomainError>;
}

pub trait ReportRepository: Send + Sync + 'static {
    fn dashboard(&self, low_stock_threshold: i32, top_n: i64) -> Result<DashboardStats, DomainError>;
}

/// The external payment provider: request signing and verification.
pub trait PaymentGateway: Send + Sync + 'static {
    fn verify_confirmation(&self, notification: &PaymentNotification) -> bool;
    fn verify_return(&self, payment_return: &PaymentReturn) -> bool;
    fn checkout_form(&self, order: &OrderView, buyer_email: &str) -> CheckoutForm;
}

pub trait ImageStore: Send + Sync + 'static {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), DomainError>;
    /// Returns `false` when there was nothing to delete.
    fn delete(&self, filename: &str) -> Result<bool, DomainError>;
}

pub trait PasswordHasher: Send + Sync + 'static {
    fn hash(&self, password: &str) -> Result<String, DomainError>;
    fn verify(&self, hash: &str, password: &str) -> Result<bool, DomainError>;
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub trait TokenIssuer: Send + Sync + 'static {
    fn issue(&self, principal: &Principal) -> Result<IssuedToken, DomainError>;
    fn validate(&self, token: &str) -> Result<Principal, DomainError>;
}
