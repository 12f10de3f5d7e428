use std::collections::HashMap;

use bigdecimal::BigDecimal;
use diesel::dsl::{count_star, max, sum};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::OrderStatus;
use crate::domain::ports::ReportRepository;
use crate::domain::report::{DashboardStats, LowStockProduct, TopProduct};
use crate::schema::{order_lines, orders, products, users};

const LOW_STOCK_LIMIT: i64 = 50;

fn revenue_statuses() -> Vec<&'static str> {
    OrderStatus::ALL
        .into_iter()
        .filter(|s| s.counts_as_revenue())
        .map(|s| s.as_str())
        .collect()
}

pub struct DieselReportRepository {
    pool: DbPool,
}

impl DieselReportRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ReportRepository for DieselReportRepository {
    fn dashboard(&self, low_stock_threshold: i32, top_n: i64) -> Result<DashboardStats, DomainError> {
        let mut conn = self.pool.get()?;
        let paid = revenue_statuses();

        conn.build_transaction().read_only().run::<_, DomainError, _>(|conn| {
            // Orders
            let per_status: HashMap<String, i64> = orders::table
                .group_by(orders::status)
                .select((orders::status, count_star()))
                .load::<(String, i64)>(conn)?
                .into_iter()
                .collect();
            let orders_by_status: Vec<(OrderStatus, i64)> = OrderStatus::ALL
                .into_iter()
                .map(|s| (s, per_status.get(s.as_str()).copied().unwrap_or(0)))
                .collect();
            let total_orders: i64 = per_status.values().sum();

            let revenue: Option<BigDecimal> = orders::table
                .filter(orders::status.eq_any(&paid))
                .select(sum(orders::total_amount))
                .first(conn)?;

            // Users and catalog
            let total_users: i64 = users::table.count().get_result(conn)?;
            let active_products: i64 = products::table
                .filter(products::is_active.eq(true))
                .count()
                .get_result(conn)?;
            let low_stock = products::table
                .filter(products::is_active.eq(true))
                .filter(products::stock.le(low_stock_threshold))
                .order((products::stock.asc(), products::name.asc()))
                .limit(LOW_STOCK_LIMIT)
                .select((products::id, products::name, products::stock))
                .load::<(Uuid, String, i32)>(conn)?
                .into_iter()
                .map(|(id, name, stock)| LowStockProduct { id, name, stock })
                .collect();

            // Best sellers across paid orders
            let mut top_products: Vec<TopProduct> = order_lines::table
                .inner_join(orders::table)
                .filter(orders::status.eq_any(&paid))
                .filter(order_lines::product_id.is_not_null())
                .group_by(order_lines::product_id)
                .select((
                    order_lines::product_id,
                    max(order_lines::name),
                    sum(order_lines::quantity),
                ))
                .load::<(Option<Uuid>, Option<String>, Option<i64>)>(conn)?
                .into_iter()
                .filter_map(|(product_id, name, units)| {
                    Some(TopProduct {
                        product_id: product_id?,
                        name: name.unwrap_or_default(),
                        units_sold: units.unwrap_or(0),
                    })
                })
                .collect();
            top_products.sort_by(|a, b| {
                b.units_sold
                    .cmp(&a.units_sold)
                    .then_with(|| a.name.cmp(&b.name))
            });
            top_products.truncate(top_n.max(0) as usize);

            Ok(DashboardStats {
                total_orders,
                orders_by_status,
                revenue: revenue.unwrap_or_else(|| BigDecimal::from(0)),
                total_users,
                active_products,
                low_stock,
                top_products,
            })
        })
    }
}
