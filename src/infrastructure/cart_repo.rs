use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{CartView, ItemRef, PricedLine, SyncItem};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::{bundles, cart_items, carts, products};

use super::models::{CartItemRow, NewCartItemRow, NewCartRow};

// ── Shared helpers (also used by the order repository) ───────────────────────

/// Returns the user's cart id, creating the cart on first access.
pub(super) fn cart_id_for(conn: &mut PgConnection, user_id: Uuid) -> Result<Uuid, DomainError> {
    diesel::insert_into(carts::table)
        .values(&NewCartRow {
            id: Uuid::new_v4(),
            user_id,
        })
        .on_conflict(carts::user_id)
        .do_nothing()
        .execute(conn)?;

    Ok(carts::table
        .filter(carts::user_id.eq(user_id))
        .select(carts::id)
        .first(conn)?)
}

/// Cart lines joined with the current price of the product or bundle they point at.
pub(super) fn priced_lines(conn: &mut PgConnection, cart_id: Uuid) -> Result<Vec<PricedLine>, DomainError> {
    let rows: Vec<CartItemRow> = cart_items::table
        .filter(cart_items::cart_id.eq(cart_id))
        .order(cart_items::created_at.asc())
        .select(CartItemRow::as_select())
        .load(conn)?;

    let product_ids: Vec<Uuid> = rows.iter().filter_map(|r| r.product_id).collect();
    let bundle_ids: Vec<Uuid> = rows.iter().filter_map(|r| r.bundle_id).collect();

    let product_prices: HashMap<Uuid, (String, BigDecimal, bool)> = products::table
        .filter(products::id.eq_any(&product_ids))
        .select((products::id, products::name, products::price, products::is_active))
        .load::<(Uuid, String, BigDecimal, bool)>(conn)?
        .into_iter()
        .map(|(id, name, price, active)| (id, (name, price, active)))
        .collect();
    let bundle_prices: HashMap<Uuid, (String, BigDecimal, bool)> = bundles::table
        .filter(bundles::id.eq_any(&bundle_ids))
        .select((bundles::id, bundles::name, bundles::price, bundles::is_active))
        .load::<(Uuid, String, BigDecimal, bool)>(conn)?
        .into_iter()
        .map(|(id, name, price, active)| (id, (name, price, active)))
        .collect();

    rows.into_iter()
        .map(|row| {
            let item = ItemRef::from_parts(row.product_id, row.bundle_id)?;
            let (name, unit_price, active) = match item {
                ItemRef::Product(id) => product_prices.get(&id),
                ItemRef::Bundle(id) => bundle_prices.get(&id),
            }
            .cloned()
            .ok_or_else(|| {
                DomainError::Internal(format!("cart item {} points at a missing catalog entry", row.id))
            })?;
            Ok(PricedLine {
                item_id: row.id,
                item,
                name,
                quantity: row.quantity,
                unit_price,
                active,
            })
        })
        .collect()
}

fn is_available(conn: &mut PgConnection, item: ItemRef) -> Result<bool, DomainError> {
    let active = match item {
        ItemRef::Product(id) => products::table
            .find(id)
            .select(products::is_active)
            .first::<bool>(conn)
            .optional()?,
        ItemRef::Bundle(id) => bundles::table
            .find(id)
            .select(bundles::is_active)
            .first::<bool>(conn)
            .optional()?,
    };
    Ok(active.unwrap_or(false))
}

fn find_line(conn: &mut PgConnection, cart_id: Uuid, item: ItemRef) -> Result<Option<(Uuid, i32)>, DomainError> {
    let query = cart_items::table
        .filter(cart_items::cart_id.eq(cart_id))
        .select((cart_items::id, cart_items::quantity));
    let line = match item {
        ItemRef::Product(id) => query
            .filter(cart_items::product_id.eq(id))
            .first::<(Uuid, i32)>(conn)
            .optional()?,
        ItemRef::Bundle(id) => query
            .filter(cart_items::bundle_id.eq(id))
            .first::<(Uuid, i32)>(conn)
            .optional()?,
    };
    Ok(line)
}

fn write_quantity(conn: &mut PgConnection, line_id: Uuid, quantity: i32) -> Result<(), DomainError> {
    diesel::update(cart_items::table.find(line_id))
        .set((
            cart_items::quantity.eq(quantity),
            cart_items::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;
    Ok(())
}

fn insert_line(conn: &mut PgConnection, cart_id: Uuid, item: ItemRef, quantity: i32) -> Result<(), DomainError> {
    diesel::insert_into(cart_items::table)
        .values(&NewCartItemRow {
            id: Uuid::new_v4(),
            cart_id,
            product_id: item.product_id(),
            bundle_id: item.bundle_id(),
            quantity,
        })
        .execute(conn)?;
    Ok(())
}

fn view(conn: &mut PgConnection, cart_id: Uuid, user_id: Uuid) -> Result<CartView, DomainError> {
    Ok(CartView::new(cart_id, user_id, priced_lines(conn, cart_id)?))
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CartRepository for DieselCartRepository {
    fn get_or_create(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;
        let cart_id = cart_id_for(&mut conn, user_id)?;
        view(&mut conn, cart_id, user_id)
    }

    fn add_item(&self, user_id: Uuid, item: ItemRef, quantity: i32) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            if !is_available(conn, item)? {
                return Err(DomainError::not_found("Product or bundle"));
            }
            let cart_id = cart_id_for(conn, user_id)?;
            match find_line(conn, cart_id, item)? {
                Some((line_id, current)) => {
                    let merged = current
                        .checked_add(quantity)
                        .ok_or_else(|| DomainError::invalid("quantity too large"))?;
                    write_quantity(conn, line_id, merged)?
                }
                None => insert_line(conn, cart_id, item, quantity)?,
            }
            view(conn, cart_id, user_id)
        })
    }

    fn set_quantity(&self, user_id: Uuid, item_id: Uuid, quantity: i32) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart_id = cart_id_for(conn, user_id)?;
            let owned = cart_items::table
                .filter(cart_items::id.eq(item_id))
                .filter(cart_items::cart_id.eq(cart_id))
                .count()
                .get_result::<i64>(conn)?;
            if owned == 0 {
                return Err(DomainError::not_found("Cart item"));
            }

            if quantity <= 0 {
                diesel::delete(cart_items::table.find(item_id)).execute(conn)?;
            } else {
                write_quantity(conn, item_id, quantity)?;
            }
            view(conn, cart_id, user_id)
        })
    }

    fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        self.set_quantity(user_id, item_id, 0)
    }

    fn clear(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;
        let cart_id = cart_id_for(&mut conn, user_id)?;
        diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id))).execute(&mut conn)?;
        view(&mut conn, cart_id, user_id)
    }

    fn sync(&self, user_id: Uuid, items: &[SyncItem]) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart_id = cart_id_for(conn, user_id)?;
            for incoming in items {
                if incoming.quantity <= 0 {
                    continue;
                }
                if !is_available(conn, incoming.item)? {
                    log::debug!("Skipping unavailable item {:?} during cart sync", incoming.item);
                    continue;
                }
                match find_line(conn, cart_id, incoming.item)? {
                    Some((line_id, _)) => write_quantity(conn, line_id, incoming.quantity)?,
                    None => insert_line(conn, cart_id, incoming.item, incoming.quantity)?,
                }
            }
            view(conn, cart_id, user_id)
        })
    }
}
