use chrono::Utc;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{subtotal, ItemRef};
use crate::domain::errors::DomainError;
use crate::domain::order::{
    ListResult, OrderFilter, OrderLineView, OrderStatus, OrderView, ShippingAddress,
};
use crate::domain::ports::OrderRepository;
use crate::schema::{cart_items, order_lines, orders};

use super::cart_repo::{cart_id_for, priced_lines};
use super::models::{NewOrderLineRow, NewOrderRow, OrderLineRow, OrderRow};
use super::page_offset;

fn to_view(order: OrderRow, lines: Vec<OrderLineRow>) -> Result<OrderView, DomainError> {
    let shipping_address: ShippingAddress = serde_json::from_value(order.shipping_address)
        .map_err(|e| DomainError::Internal(format!("corrupt shipping address on {}: {e}", order.id)))?;

    let lines = lines
        .into_iter()
        .map(|l| {
            Ok(OrderLineView {
                id: l.id,
                item: ItemRef::from_parts(l.product_id, l.bundle_id)?,
                name: l.name,
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    Ok(OrderView {
        id: order.id,
        user_id: order.user_id,
        status: order.status.parse()?,
        total_amount: order.total_amount,
        shipping_address,
        created_at: order.created_at,
        updated_at: order.updated_at,
        lines,
    })
}

fn with_lines(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<OrderView>, DomainError> {
    let lines: Vec<OrderLineRow> = OrderLineRow::belonging_to(&rows)
        .select(OrderLineRow::as_select())
        .order(order_lines::created_at.asc())
        .load(conn)?;

    lines
        .grouped_by(&rows)
        .into_iter()
        .zip(rows)
        .map(|(lines, order)| to_view(order, lines))
        .collect()
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create_from_cart(&self, user_id: Uuid, shipping: &ShippingAddress) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;
        let shipping_address = serde_json::to_value(shipping)
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Price the cart at current catalog prices
            let cart_id = cart_id_for(conn, user_id)?;
            let lines = priced_lines(conn, cart_id)?;
            if lines.is_empty() {
                return Err(DomainError::EmptyCart);
            }
            if let Some(gone) = lines.iter().find(|l| !l.active) {
                return Err(DomainError::invalid(format!(
                    "'{}' is no longer available",
                    gone.name
                )));
            }

            // 2. Insert the order with the computed total
            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    user_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    total_amount: subtotal(&lines),
                    shipping_address,
                })
                .execute(conn)?;

            // 3. Freeze names and prices into the order lines
            let new_lines: Vec<NewOrderLineRow> = lines
                .iter()
                .map(|l| NewOrderLineRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: l.item.product_id(),
                    bundle_id: l.item.bundle_id(),
                    name: l.name.clone(),
                    quantity: l.quantity,
                    unit_price: l.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_lines::table)
                .values(&new_lines)
                .execute(conn)?;

            // 4. Empty the cart in the same transaction
            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id))).execute(conn)?;

            Ok(order_id)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order: Option<OrderRow> = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        Ok(with_lines(&mut conn, vec![order])?.pop())
    }

    fn list(&self, filter: &OrderFilter, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let filtered = || {
            let mut query: orders::BoxedQuery<'_, Pg> = orders::table.into_boxed();
            if let Some(user_id) = filter.user_id {
                query = query.filter(orders::user_id.eq(user_id));
            }
            if let Some(status) = filter.status {
                query = query.filter(orders::status.eq(status.as_str()));
            }
            query
        };

        let offset = page_offset(page, limit)?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered().count().get_result(conn)?;

            let rows: Vec<OrderRow> = filtered()
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(ListResult {
                items: with_lines(conn, rows)?,
                total,
            })
        })
    }

    fn update_status(&self, id: Uuid, from: OrderStatus, to: OrderStatus) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(orders::table.find(id))
            .filter(orders::status.eq(from.as_str()))
            .set((
                orders::status.eq(to.as_str()),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        if updated > 0 {
            return Ok(());
        }

        let current: Option<String> = orders::table
            .find(id)
            .select(orders::status)
            .first(&mut conn)
            .optional()?;
        match current {
            None => Err(DomainError::not_found("Order")),
            Some(status) => Err(DomainError::Conflict(format!(
                "order is now {status}, expected {from}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::DieselOrderRepository;
    use crate::domain::cart::ItemRef;
    use crate::domain::errors::DomainError;
    use crate::domain::order::{OrderFilter, OrderStatus, ShippingAddress};
    use crate::domain::ports::{CartRepository, OrderRepository};
    use crate::infrastructure::cart_repo::DieselCartRepository;
    use crate::infrastructure::test_db::{
        insert_bundle, insert_product, insert_user, set_product_price, setup_db,
    };

    fn address() -> ShippingAddress {
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

    #[tokio::test]
    async fn create_snapshots_cart_and_empties_it() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let user_id = insert_user(&pool);
        let product = insert_product(&pool, "Whey Protein", "10.00");
        let bundle = insert_bundle(&pool, "Starter stack", "5.00");
        carts.add_item(user_id, ItemRef::Product(product), 2).expect("add");
        carts.add_item(user_id, ItemRef::Bundle(bundle), 1).expect("add");

        let order_id = repo.create_from_cart(user_id, &address()).expect("create failed");

        let order = repo
            .find_by_id(order_id)
            .expect("find failed")
            .expect("order should exist");
        assert_eq!(order.user_id, user_id);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, BigDecimal::from_str("25.00").unwrap());
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.shipping_address, address());
        assert!(carts.get_or_create(user_id).expect("cart").lines.is_empty());
    }

    #[tokio::test]
    async fn order_prices_are_frozen_at_purchase_time() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let user_id = insert_user(&pool);
        let product = insert_product(&pool, "Creatine", "12.50");
        carts.add_item(user_id, ItemRef::Product(product), 1).expect("add");

        let order_id = repo.create_from_cart(user_id, &address()).expect("create failed");
        set_product_price(&pool, product, "99.00");

        let order = repo.find_by_id(order_id).unwrap().unwrap();
        assert_eq!(order.lines[0].unit_price, BigDecimal::from_str("12.50").unwrap());
        assert_eq!(order.total_amount, BigDecimal::from_str("12.50").unwrap());
    }

    #[tokio::test]
    async fn empty_cart_creates_nothing() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let user_id = insert_user(&pool);

        let err = repo.create_from_cart(user_id, &address()).unwrap_err();

        assert!(matches!(err, DomainError::EmptyCart));
        let listed = repo.list(&OrderFilter::default(), 1, 20).expect("list failed");
        assert_eq!(listed.total, 0);
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_unknown_id() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);

        let result = repo
            .find_by_id(uuid::Uuid::new_v4())
            .expect("find should not error");

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let user_id = insert_user(&pool);
        let other = insert_user(&pool);
        let product = insert_product(&pool, "BCAA", "1.00");

        for _ in 0..5 {
            carts.add_item(user_id, ItemRef::Product(product), 1).expect("add");
            repo.create_from_cart(user_id, &address()).expect("create failed");
        }
        carts.add_item(other, ItemRef::Product(product), 1).expect("add");
        let foreign = repo.create_from_cart(other, &address()).expect("create failed");
        repo.update_status(foreign, OrderStatus::Pending, OrderStatus::Processing).expect("update");

        let mine = OrderFilter { user_id: Some(user_id), status: None };
        let page1 = repo.list(&mine, 1, 3).expect("list page 1 failed");
        assert_eq!(page1.total, 5);
        assert_eq!(page1.items.len(), 3);
        assert_eq!(page1.items[0].lines.len(), 1);

        let page2 = repo.list(&mine, 2, 3).expect("list page 2 failed");
        assert_eq!(page2.items.len(), 2);

        let processing = OrderFilter { user_id: None, status: Some(OrderStatus::Processing) };
        let listed = repo.list(&processing, 1, 20).expect("list failed");
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].id, foreign);
    }

    #[tokio::test]
    async fn page_beyond_addressable_offset_is_invalid() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);

        let err = repo.list(&OrderFilter::default(), i64::MAX, 100).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn update_status_only_applies_to_the_expected_status() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let user_id = insert_user(&pool);
        let product = insert_product(&pool, "Glutamine", "8.00");
        carts.add_item(user_id, ItemRef::Product(product), 1).expect("add");
        let order_id = repo.create_from_cart(user_id, &address()).expect("create failed");

        repo.update_status(order_id, OrderStatus::Pending, OrderStatus::Processing)
            .expect("first update");
        let err = repo
            .update_status(order_id, OrderStatus::Pending, OrderStatus::Cancelled)
            .unwrap_err();

        assert!(matches!(err, DomainError::Conflict(_)));
        let order = repo.find_by_id(order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn update_status_of_unknown_order_is_not_found() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);

        let err = repo
            .update_status(uuid::Uuid::new_v4(), OrderStatus::Pending, OrderStatus::Cancelled)
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
