use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::order::OrderStatus;

#[derive(Debug, Clone)]
pub struct LowStockProduct {
    pub id: Uuid,
    pub name: String,
    pub stock: i32,
}

#[derive(Debug, Clone)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub units_sold: i64,
}

#[derive(Debug, Clone)]
pub struct DashboardStats {
    pub total_orders: i64,
    pub orders_by_status: Vec<(OrderStatus, i64)>,
    pub revenue: BigDecimal,
    pub total_users: i64,
    pub active_products: i64,
    pub low_stock: Vec<LowStockProduct>,
    pub top_products: Vec<TopProduct>,
}
