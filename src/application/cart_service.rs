use uuid::Uuid;

use crate::domain::cart::{CartView, ItemRef, SyncItem};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::domain::user::Principal;

pub struct CartService<R> {
    repo: R,
}

impl<R: CartRepository> CartService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_cart(&self, principal: &Principal) -> Result<CartView, DomainError> {
        self.repo.get_or_create(principal.user_id)
    }

    /// Adds to the cart, merging with an existing line for the same item.
    pub fn add_item(
        &self,
        principal: &Principal,
        item: ItemRef,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        if quantity < 1 {
            return Err(DomainError::invalid("quantity must be at least 1"));
        }
        self.repo.add_item(principal.user_id, item, quantity)
    }

    pub fn update_quantity(
        &self,
        principal: &Principal,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        self.repo.set_quantity(principal.user_id, item_id, quantity)
    }

    pub fn remove_item(&self, principal: &Principal, item_id: Uuid) -> Result<CartView, DomainError> {
        self.repo.remove_item(principal.user_id, item_id)
    }

    pub fn clear(&self, principal: &Principal) -> Result<CartView, DomainError> {
        self.repo.clear(principal.user_id)
    }

    /// Merges the client-held cart into the server cart (last write wins per
    /// item) and returns the server state the client should adopt.
    pub fn sync(&self, principal: &Principal, items: Vec<SyncItem>) -> Result<CartView, DomainError> {
        let items: Vec<SyncItem> = items.into_iter().filter(|i| i.quantity > 0).collect();
        let cart = self.repo.sync(principal.user_id, &items)?;
        log::debug!(
            "Synced {} client cart lines for user {}",
            items.len(),
            principal.user_id
        );
        Ok(cart)
    }
}
