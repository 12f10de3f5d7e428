//! In-memory implementations of the repository ports for service tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::cart::{subtotal, CartView, ItemRef, PricedLine, SyncItem};
use crate::domain::errors::DomainError;
use crate::domain::order::{
    ListResult, OrderFilter, OrderLineView, OrderStatus, OrderView, ShippingAddress,
};
use crate::domain::payment::{
    CheckoutForm, PaymentNotification, PaymentRecord, PaymentReturn, PaymentView,
};
use crate::domain::ports::{
    CartRepository, IssuedToken, OrderRepository, PasswordHasher, PaymentGateway,
    PaymentRepository, TokenIssuer, UserRepository,
};
use crate::domain::user::{NewUser, Principal, Role, UserCredentials, UserView};
use crate::infrastructure::page_offset;

pub fn customer() -> Principal {
    Principal {
        user_id: Uuid::new_v4(),
        email: "athlete@apexlabs.co".to_string(),
        role: Role::User,
    }
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Ana Ruiz".to_string(),
        address_line: "Calle 10 # 5-20".to_string(),
        city: "Medellín".to_string(),
        region: Some("Antioquia".to_string()),
        postal_code: None,
        phone: "3001234567".to_string(),
        notes: None,
    }
}

#[derive(Debug, Clone)]
struct CatalogItem {
    name: String,
    price: BigDecimal,
    active: bool,
}

#[derive(Debug, Clone)]
struct CartLine {
    id: Uuid,
    item: ItemRef,
    quantity: i32,
}

#[derive(Default)]
struct State {
    items: HashMap<ItemRef, CatalogItem>,
    carts: HashMap<Uuid, (Uuid, Vec<CartLine>)>,
    orders: HashMap<Uuid, OrderView>,
    payments: HashMap<String, PaymentView>,
    users: HashMap<Uuid, UserCredentials>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn add_item(&self, item: ItemRef, name: &str, price: &str) {
        self.with(|s| {
            s.items.insert(
                item,
                CatalogItem {
                    name: name.to_string(),
                    price: BigDecimal::from_str(price).unwrap(),
                    active: true,
                },
            )
        });
    }

    pub fn add_product(&self, name: &str, price: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.add_item(ItemRef::Product(id), name, price);
        id
    }

    pub fn add_bundle(&self, name: &str, price: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.add_item(ItemRef::Bundle(id), name, price);
        id
    }

    pub fn set_price(&self, product_id: Uuid, price: &str) {
        self.with(|s| {
            if let Some(item) = s.items.get_mut(&ItemRef::Product(product_id)) {
                item.price = BigDecimal::from_str(price).unwrap();
            }
        });
    }

    pub fn deactivate(&self, item: ItemRef) {
        self.with(|s| {
            if let Some(item) = s.items.get_mut(&item) {
                item.active = false;
            }
        });
    }

    pub fn put_in_cart(&self, user_id: Uuid, item: ItemRef, quantity: i32) {
        self.with(|s| {
            let (_, lines) = s
                .carts
                .entry(user_id)
                .or_insert_with(|| (Uuid::new_v4(), Vec::new()));
            lines.push(CartLine {
                id: Uuid::new_v4(),
                item,
                quantity,
            });
        });
    }

    pub fn cart_lines(&self, user_id: Uuid) -> Vec<(ItemRef, i32)> {
        self.with(|s| {
            s.carts
                .get(&user_id)
                .map(|(_, lines)| lines.iter().map(|l| (l.item, l.quantity)).collect())
                .unwrap_or_default()
        })
    }

    pub fn order_count(&self) -> usize {
        self.with(|s| s.orders.len())
    }

    pub fn order_status(&self, id: Uuid) -> Option<OrderStatus> {
        self.with(|s| s.orders.get(&id).map(|o| o.status))
    }

    pub fn payment_count(&self) -> usize {
        self.with(|s| s.payments.len())
    }

    pub fn payment(&self, transaction_id: &str) -> Option<PaymentView> {
        self.with(|s| s.payments.get(transaction_id).cloned())
    }

    pub fn insert_order(&self, user_id: Uuid, status: OrderStatus, created_at: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        let order = OrderView {
            id,
            user_id,
            status,
            total_amount: BigDecimal::from_str("42.00").unwrap(),
            shipping_address: address(),
            created_at,
            updated_at: created_at,
            lines: vec![OrderLineView {
                id: Uuid::new_v4(),
                item: ItemRef::Product(Uuid::new_v4()),
                name: "BCAA 2:1:1".to_string(),
                quantity: 1,
                unit_price: BigDecimal::from_str("42.00").unwrap(),
            }],
        };
        self.with(|s| s.orders.insert(id, order));
        id
    }

    fn priced(state: &State, lines: &[CartLine]) -> Vec<PricedLine> {
        lines
            .iter()
            .filter_map(|line| {
                state.items.get(&line.item).map(|item| PricedLine {
                    item_id: line.id,
                    item: line.item,
                    name: item.name.clone(),
                    quantity: line.quantity,
                    unit_price: item.price.clone(),
                    active: item.active,
                })
            })
            .collect()
    }

    fn view(state: &mut State, user_id: Uuid) -> CartView {
        let (cart_id, lines) = state
            .carts
            .entry(user_id)
            .or_insert_with(|| (Uuid::new_v4(), Vec::new()))
            .clone();
        CartView::new(cart_id, user_id, Self::priced(state, &lines))
    }

    fn available(state: &State, item: ItemRef) -> bool {
        state.items.get(&item).is_some_and(|i| i.active)
    }
}

impl OrderRepository for InMemoryStore {
    fn create_from_cart(&self, user_id: Uuid, shipping: &ShippingAddress) -> Result<Uuid, DomainError> {
        self.with(|s| {
            let cart = Self::view(s, user_id);
            if cart.lines.is_empty() {
                return Err(DomainError::EmptyCart);
            }
            if let Some(line) = cart.lines.iter().find(|l| !l.active) {
                return Err(DomainError::invalid(format!("{} is no longer available", line.name)));
            }
            let id = Uuid::new_v4();
            let now = Utc::now();
            s.orders.insert(
                id,
                OrderView {
                    id,
                    user_id,
                    status: OrderStatus::Pending,
                    total_amount: subtotal(&cart.lines),
                    shipping_address: shipping.clone(),
                    created_at: now,
                    updated_at: now,
                    lines: cart
                        .lines
                        .iter()
                        .map(|l| OrderLineView {
                            id: Uuid::new_v4(),
                            item: l.item,
                            name: l.name.clone(),
                            quantity: l.quantity,
                            unit_price: l.unit_price.clone(),
                        })
                        .collect(),
                },
            );
            if let Some((_, lines)) = s.carts.get_mut(&user_id) {
                lines.clear();
            }
            Ok(id)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        Ok(self.with(|s| s.orders.get(&id).cloned()))
    }

    fn list(&self, filter: &OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let offset = page_offset(page, limit)?;
        self.with(|s| {
            let mut matching: Vec<OrderView> = s
                .orders
                .values()
                .filter(|o| filter.user_id.map_or(true, |u| o.user_id == u))
                .filter(|o| filter.status.map_or(true, |st| o.status == st))
                .cloned()
                .collect();
            matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let total = matching.len() as i64;
            let items = matching
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect();
            Ok(ListResult { items, total })
        })
    }

    fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<(), DomainError> {
        self.with(|s| match s.orders.get_mut(&id) {
            Some(order) if order.status != from => Err(DomainError::Conflict(format!(
                "order is now {}, expected {}",
                order.status, from
            ))),
            Some(order) => {
                order.status = to;
                order.updated_at = Utc::now();
                Ok(())
            }
            None => Err(DomainError::not_found("Order")),
        })
    }
}

impl PaymentRepository for InMemoryStore {
    fn record_confirmation(&self, payment: &PaymentRecord, order_status: OrderStatus) -> Result<(), DomainError> {
        self.with(|s| {
            let Some(order) = s.orders.get_mut(&payment.order_id) else {
                return Err(DomainError::not_found("Order"));
            };
            order.status = order_status;
            let now = Utc::now();
            let created_at = s
                .payments
                .get(&payment.transaction_id)
                .map_or(now, |p| p.created_at);
            let id = s
                .payments
                .get(&payment.transaction_id)
                .map_or_else(Uuid::new_v4, |p| p.id);
            s.payments.insert(
                payment.transaction_id.clone(),
                PaymentView {
                    id,
                    order_id: payment.order_id,
                    provider: payment.provider.clone(),
                    transaction_id: payment.transaction_id.clone(),
                    status: payment.status,
                    amount: payment.amount.clone(),
                    currency: payment.currency.clone(),
                    created_at,
                    updated_at: now,
                },
            );
            Ok(())
        })
    }

    fn list_for_order(&self, order_id: Uuid) -> Result<Vec<PaymentView>, DomainError> {
        Ok(self.with(|s| {
            s.payments
                .values()
                .filter(|p| p.order_id == order_id)
                .cloned()
                .collect()
        }))
    }
}

impl CartRepository for InMemoryStore {
    fn get_or_create(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        Ok(self.with(|s| Self::view(s, user_id)))
    }

    fn add_item(&self, user_id: Uuid, item: ItemRef, quantity: i32) -> Result<CartView, DomainError> {
        self.with(|s| {
            if !Self::available(s, item) {
                return Err(DomainError::not_found("Product or bundle"));
            }
            let (_, lines) = s
                .carts
                .entry(user_id)
                .or_insert_with(|| (Uuid::new_v4(), Vec::new()));
            match lines.iter_mut().find(|l| l.item == item) {
                Some(line) => {
                    line.quantity = line
                        .quantity
                        .checked_add(quantity)
                        .ok_or_else(|| DomainError::invalid("quantity too large"))?;
                }
                None => lines.push(CartLine {
                    id: Uuid::new_v4(),
                    item,
                    quantity,
                }),
            }
            Ok(Self::view(s, user_id))
        })
    }

    fn set_quantity(&self, user_id: Uuid, item_id: Uuid, quantity: i32) -> Result<CartView, DomainError> {
        self.with(|s| {
            let lines = s
                .carts
                .get_mut(&user_id)
                .map(|(_, lines)| lines)
                .ok_or_else(|| DomainError::not_found("Cart item"))?;
            let pos = lines
                .iter()
                .position(|l| l.id == item_id)
                .ok_or_else(|| DomainError::not_found("Cart item"))?;
            if quantity <= 0 {
                lines.remove(pos);
            } else {
                lines[pos].quantity = quantity;
            }
            Ok(Self::view(s, user_id))
        })
    }

    fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        self.set_quantity(user_id, item_id, 0)
    }

    fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        self.with(|s| {
            if let Some((_, lines)) = s.carts.get_mut(&user_id) {
                lines.clear();
            }
            Ok(Self::view(s, user_id))
        })
    }

    fn sync(&self, user_id: Uuid, items: &[SyncItem]) -> Result<CartView, DomainError> {
        self.with(|s| {
            let available: Vec<SyncItem> = items
                .iter()
                .filter(|i| i.quantity > 0 && Self::available(s, i.item))
                .cloned()
                .collect();
            let (_, lines) = s
                .carts
                .entry(user_id)
                .or_insert_with(|| (Uuid::new_v4(), Vec::new()));
            for incoming in available {
                match lines.iter_mut().find(|l| l.item == incoming.item) {
                    Some(line) => line.quantity = incoming.quantity,
                    None => lines.push(CartLine {
                        id: Uuid::new_v4(),
                        item: incoming.item,
                        quantity: incoming.quantity,
                    }),
                }
            }
            Ok(Self::view(s, user_id))
        })
    }
}

impl UserRepository for InMemoryStore {
    fn create(&self, user: &NewUser) -> Result<UserView, DomainError> {
        self.with(|s| {
            if s.users.values().any(|u| u.user.email == user.email) {
                return Err(DomainError::Conflict("email already registered".to_string()));
            }
            let view = UserView {
                id: Uuid::new_v4(),
                email: user.email.clone(),
                full_name: user.full_name.clone(),
                role: user.role,
                created_at: Utc::now(),
            };
            s.users.insert(
                view.id,
                UserCredentials {
                    user: view.clone(),
                    password_hash: user.password_hash.clone(),
                },
            );
            Ok(view)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<UserView>, DomainError> {
        Ok(self.with(|s| s.users.get(&id).map(|c| c.user.clone())))
    }

    fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, DomainError> {
        Ok(self.with(|s| s.users.values().find(|u| u.user.email == email).cloned()))
    }

    fn update_role(&self, id: Uuid, role: Role) -> Result<(), DomainError> {
        self.with(|s| match s.users.get_mut(&id) {
            Some(creds) => {
                creds.user.role = role;
                Ok(())
            }
            None => Err(DomainError::not_found("User")),
        })
    }
}

/// Accepts any notification whose `sign` equals `"valid"`.
pub struct FakeGateway;

impl PaymentGateway for FakeGateway {
    fn verify_confirmation(&self, notification: &PaymentNotification) -> bool {
        notification.sign == "valid"
    }

    fn verify_return(&self, payment_return: &PaymentReturn) -> bool {
        payment_return.signature == "valid"
    }

    fn checkout_form(&self, order: &OrderView, buyer_email: &str) -> CheckoutForm {
        CheckoutForm {
            gateway_url: "https://gateway.test/checkout".to_string(),
            merchant_id: "508029".to_string(),
            account_id: "512321".to_string(),
            description: format!("Order {}", order.id),
            reference_code: order.id.to_string(),
            amount: order.total_amount.to_string(),
            tax: "0".to_string(),
            tax_return_base: "0".to_string(),
            currency: "COP".to_string(),
            signature: "signed".to_string(),
            test: true,
            buyer_email: buyer_email.to_string(),
            response_url: "https://api.test/payments/response".to_string(),
            confirmation_url: "https://api.test/payments/confirmation".to_string(),
        }
    }
}

/// Stores passwords reversed; good enough to exercise the auth flow.
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        Ok(password.chars().rev().collect())
    }

    fn verify(&self, hash: &str, password: &str) -> Result<bool, DomainError> {
        Ok(hash == password.chars().rev().collect::<String>())
    }
}

/// Tokens are `"<user_id>|<email>|<role>"`.
pub struct FakeTokens;

impl TokenIssuer for FakeTokens {
    fn issue(&self, principal: &Principal) -> Result<IssuedToken, DomainError> {
        Ok(IssuedToken {
            token: format!("{}|{}|{}", principal.user_id, principal.email, principal.role),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    fn validate(&self, token: &str) -> Result<Principal, DomainError> {
        let parts: Vec<&str> = token.split('|').collect();
        match parts.as_slice() {
            [id, email, role] => Ok(Principal {
                user_id: Uuid::parse_str(id)
                    .map_err(|_| DomainError::Unauthorized("bad token".to_string()))?,
                email: email.to_string(),
                role: role.parse()?,
            }),
            _ => Err(DomainError::Unauthorized("bad token".to_string())),
        }
    }
}
