use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::report::DashboardStats;
use crate::errors::AppError;
use crate::handlers::extract::AdminUser;
use crate::handlers::{run_blocking, Reports};

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LowStockResponse {
    pub id: Uuid,
    pub name: String,
    pub stock: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProductResponse {
    pub product_id: Uuid,
    pub name: String,
    pub units_sold: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub total_orders: i64,
    pub orders_by_status: Vec<StatusCount>,
    /// Sum of order totals in PROCESSING, SHIPPED and DELIVERED.
    pub revenue: String,
    pub total_users: i64,
    pub active_products: i64,
    pub low_stock: Vec<LowStockResponse>,
    pub top_products: Vec<TopProductResponse>,
}

impl From<DashboardStats> for DashboardResponse {
    fn from(s: DashboardStats) -> Self {
        Self {
            total_orders: s.total_orders,
            orders_by_status: s
                .orders_by_status
                .into_iter()
                .map(|(status, count)| StatusCount {
                    status: status.to_string(),
                    count,
                })
                .collect(),
            revenue: s.revenue.to_string(),
            total_users: s.total_users,
            active_products: s.active_products,
            low_stock: s
                .low_stock
                .into_iter()
                .map(|p| LowStockResponse {
                    id: p.id,
                    name: p.name,
                    stock: p.stock,
                })
                .collect(),
            top_products: s
                .top_products
                .into_iter()
                .map(|p| TopProductResponse {
                    product_id: p.product_id,
                    name: p.name,
                    units_sold: p.units_sold,
                })
                .collect(),
        }
    }
}

/// GET /admin/dashboard
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Store-wide figures", body = DashboardResponse),
        (status = 403, description = "Caller is not an admin"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn dashboard(
    reports: web::Data<Reports>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let stats = run_blocking(move || reports.dashboard()).await?;
    Ok(HttpResponse::Ok().json(DashboardResponse::from(stats)))
}
