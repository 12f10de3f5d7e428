use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::cart::{CartView, ItemRef, SyncItem};
use crate::errors::AppError;
use crate::handlers::extract::AuthUser;
use crate::handlers::{run_blocking, Carts};

// ── Request / response DTOs ──────────────────────────────────────────────────

/// Exactly one of `product_id` / `bundle_id` must be set.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Option<Uuid>,
    pub bundle_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    /// Zero or less removes the line.
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SyncCartRequest {
    pub items: Vec<AddItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub bundle_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub line_total: String,
    pub available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub items: Vec<CartLineResponse>,
    pub item_count: i64,
    pub subtotal: String,
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        let item_count = cart.item_count();
        Self {
            id: cart.id,
            items: cart
                .lines
                .into_iter()
                .map(|l| CartLineResponse {
                    line_total: l.line_total().to_string(),
                    id: l.item_id,
                    product_id: l.item.product_id(),
                    bundle_id: l.item.bundle_id(),
                    name: l.name,
                    quantity: l.quantity,
                    unit_price: l.unit_price.to_string(),
                    available: l.active,
                })
                .collect(),
            item_count,
            subtotal: cart.subtotal.to_string(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
///
/// Returns the caller's cart, creating an empty one on first access.
#[utoipa::path(
    get,
    path = "/cart",
    responses((status = 200, description = "Current cart", body = CartResponse)),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn get_cart(carts: web::Data<Carts>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let cart = run_blocking(move || carts.get_cart(&user.0)).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /cart/items
///
/// Adds a product or bundle; an existing line for the same item has its
/// quantity increased.
#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid quantity or item reference"),
        (status = 404, description = "Product or bundle not found"),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn add_item(
    carts: web::Data<Carts>,
    user: AuthUser,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let item = ItemRef::from_parts(body.product_id, body.bundle_id)?;
    let cart = run_blocking(move || carts.add_item(&user.0, item, body.quantity)).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[utoipa::path(
    put,
    path = "/cart/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart line UUID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn update_item(
    carts: web::Data<Carts>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateItemRequest>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let quantity = body.quantity;
    let cart = run_blocking(move || carts.update_quantity(&user.0, item_id, quantity)).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[utoipa::path(
    delete,
    path = "/cart/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart line UUID")),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn remove_item(
    carts: web::Data<Carts>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let cart = run_blocking(move || carts.remove_item(&user.0, item_id)).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[utoipa::path(
    delete,
    path = "/cart",
    responses((status = 200, description = "Emptied cart", body = CartResponse)),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn clear_cart(carts: web::Data<Carts>, user: AuthUser) -> Result<HttpResponse, AppError> {
    let cart = run_blocking(move || carts.clear(&user.0)).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /cart/sync
///
/// Merges a client-held cart into the server cart. The client's quantity
/// wins for items present on both sides; lines only on the server are kept.
#[utoipa::path(
    post,
    path = "/cart/sync",
    request_body = SyncCartRequest,
    responses(
        (status = 200, description = "Merged cart", body = CartResponse),
        (status = 400, description = "A line references neither or both of product and bundle"),
    ),
    security(("bearer" = [])),
    tag = "cart"
)]
pub async fn sync_cart(
    carts: web::Data<Carts>,
    user: AuthUser,
    body: web::Json<SyncCartRequest>,
) -> Result<HttpResponse, AppError> {
    let items = body
        .into_inner()
        .items
        .into_iter()
        .map(|i| {
            Ok(SyncItem {
                item: ItemRef::from_parts(i.product_id, i.bundle_id)?,
                quantity: i.quantity,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    let cart = run_blocking(move || carts.sync(&user.0, items)).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}
