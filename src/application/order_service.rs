use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, OrderFilter, OrderStatus, OrderView, ShippingAddress};
use crate::domain::ports::OrderRepository;
use crate::domain::user::Principal;

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn place_order(
        &self,
        principal: &Principal,
        shipping: ShippingAddress,
    ) -> Result<OrderView, DomainError> {
        shipping.validate()?;
        let order_id = self.repo.create_from_cart(principal.user_id, &shipping)?;
        log::info!("Order {} placed by user {}", order_id, principal.user_id);
        self.load(order_id)
    }

    pub fn get_order(&self, principal: &Principal, id: Uuid) -> Result<OrderView, DomainError> {
        let order = self.load(id)?;
        principal.ensure_can_access(order.user_id)?;
        Ok(order)
    }

    pub fn list_for_user(
        &self,
        principal: &Principal,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let filter = OrderFilter {
            user_id: Some(principal.user_id),
            status: None,
        };
        self.repo.list(&filter, page, limit)
    }

    pub fn list_all(
        &self,
        status: Option<OrderStatus>,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let filter = OrderFilter {
            user_id: None,
            status,
        };
        self.repo.list(&filter, page, limit)
    }

    /// Admin transition; only the edges of the order lifecycle are accepted.
    pub fn update_status(&self, id: Uuid, next: OrderStatus) -> Result<OrderView, DomainError> {
        let order = self.load(id)?;
        if !order.status.can_transition_to(next) {
            return Err(DomainError::Conflict(format!(
                "order cannot move from {} to {}",
                order.status, next
            )));
        }
        self.repo.update_status(id, order.status, next)?;
        log::info!("Order {} moved from {} to {}", id, order.status, next);
        self.load(id)
    }

    pub fn cancel(&self, principal: &Principal, id: Uuid) -> Result<OrderView, DomainError> {
        let order = self.get_order(principal, id)?;
        if !order.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(DomainError::Conflict(format!(
                "an order in status {} can no longer be cancelled",
                order.status
            )));
        }
        self.repo.update_status(id, order.status, OrderStatus::Cancelled)?;
        log::info!("Order {} cancelled by user {}", id, principal.user_id);
        self.load(id)
    }

    fn load(&self, id: Uuid) -> Result<OrderView, DomainError> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("Order"))
    }
}
