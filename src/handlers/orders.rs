use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::order::{ListResult, OrderStatus, OrderView, ShippingAddress};
use crate::errors::AppError;
use crate::handlers::extract::{AdminUser, AuthUser};
use crate::handlers::{run_blocking, Orders, PageParams};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddressDto {
    pub full_name: String,
    pub address_line: String,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub phone: String,
    pub notes: Option<String>,
}

impl From<ShippingAddressDto> for ShippingAddress {
    fn from(a: ShippingAddressDto) -> Self {
        Self {
            full_name: a.full_name,
            address_line: a.address_line,
            city: a.city,
            region: a.region,
            postal_code: a.postal_code,
            phone: a.phone,
            notes: a.notes,
        }
    }
}

impl From<ShippingAddress> for ShippingAddressDto {
    fn from(a: ShippingAddress) -> Self {
        Self {
            full_name: a.full_name,
            address_line: a.address_line,
            city: a.city,
            region: a.region,
            postal_code: a.postal_code,
            phone: a.phone,
            notes: a.notes,
        }
    }
}

/// Lines and prices are taken from the caller's cart, never from the request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub shipping_address: ShippingAddressDto,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// Target status, e.g. `SHIPPED`.
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub bundle_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total_amount: String,
    pub shipping_address: ShippingAddressDto,
    pub created_at: String,
    pub updated_at: String,
    pub lines: Vec<OrderLineResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        Self {
            id: o.id,
            user_id: o.user_id,
            status: o.status.to_string(),
            total_amount: o.total_amount.to_string(),
            shipping_address: o.shipping_address.into(),
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
            lines: o
                .lines
                .into_iter()
                .map(|l| OrderLineResponse {
                    id: l.id,
                    product_id: l.item.product_id(),
                    bundle_id: l.item.bundle_id(),
                    name: l.name,
                    quantity: l.quantity,
                    unit_price: l.unit_price.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl ListOrdersResponse {
    fn new(result: ListResult, page: i64, limit: i64) -> Self {
        Self {
            items: result.items.into_iter().map(Into::into).collect(),
            total: result.total,
            page,
            limit,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminOrderParams {
    /// Only orders in this status, e.g. `PENDING`.
    pub status: Option<String>,
    /// Page number (1-based). Defaults to 1.
    pub page: Option<i64>,
    /// Number of items per page. Defaults to 20, maximum 100.
    pub limit: Option<i64>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Turns the caller's cart into a PENDING order. The order, its lines and
/// the emptied cart are committed in a single database transaction.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = OrderResponse),
        (status = 400, description = "Empty cart, unavailable item or incomplete address"),
        (status = 401, description = "Missing or invalid token"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn create_order(
    orders: web::Data<Orders>,
    user: AuthUser,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let address = ShippingAddress::from(body.into_inner().shipping_address);
    let order = run_blocking(move || orders.place_order(&user.0, address)).await?;
    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
///
/// Returns the order together with its order lines. Only the owner or an
/// admin may read it.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    orders: web::Data<Orders>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = run_blocking(move || orders.get_order(&user.0, id)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Returns a paginated list of the caller's orders, newest first.
/// Use `page` (1-based) and `limit` to control pagination.
#[utoipa::path(
    get,
    path = "/orders",
    params(PageParams),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 500, description = "Internal server error"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    orders: web::Data<Orders>,
    user: AuthUser,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let (page, limit) = query.clamped();
    let result = run_blocking(move || orders.list_for_user(&user.0, page, limit)).await?;
    Ok(HttpResponse::Ok().json(ListOrdersResponse::new(result, page, limit)))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 409, description = "Order can no longer be cancelled"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn cancel_order(
    orders: web::Data<Orders>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = run_blocking(move || orders.cancel(&user.0, id)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /admin/orders
#[utoipa::path(
    get,
    path = "/admin/orders",
    params(AdminOrderParams),
    responses(
        (status = 200, description = "Paginated list of all orders", body = ListOrdersResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 403, description = "Caller is not an admin"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn list_all_orders(
    orders: web::Data<Orders>,
    _admin: AdminUser,
    query: web::Query<AdminOrderParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let status = params
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let result = run_blocking(move || orders.list_all(status, page, limit)).await?;
    Ok(HttpResponse::Ok().json(ListOrdersResponse::new(result, page, limit)))
}

/// PATCH /admin/orders/{id}/status
///
/// Moves an order along its lifecycle; illegal transitions are rejected
/// with 409.
#[utoipa::path(
    patch,
    path = "/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed"),
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn update_order_status(
    orders: web::Data<Orders>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let next: OrderStatus = body.status.parse()?;
    let order = run_blocking(move || orders.update_status(id, next)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
