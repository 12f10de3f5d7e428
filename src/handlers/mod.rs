pub mod auth;
pub mod cart;
pub mod catalog;
pub mod extract;
pub mod orders;
pub mod payments;
pub mod reports;
pub mod uploads;

use actix_web::{guard, web};
use serde::Deserialize;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{IntoParams, Modify, OpenApi};

use crate::application::auth_service::AuthService;
use crate::application::cart_service::CartService;
use crate::application::catalog_service::CatalogService;
use crate::application::order_service::OrderService;
use crate::application::payment_service::PaymentService;
use crate::application::report_service::ReportService;
use crate::application::upload_service::UploadService;
use crate::domain::errors::DomainError;
use crate::errors::AppError;
use crate::infrastructure::cart_repo::DieselCartRepository;
use crate::infrastructure::catalog_repo::DieselCatalogRepository;
use crate::infrastructure::image_store::LocalImageStore;
use crate::infrastructure::jwt::JwtTokens;
use crate::infrastructure::order_repo::DieselOrderRepository;
use crate::infrastructure::password::Argon2Hasher;
use crate::infrastructure::payment_repo::DieselPaymentRepository;
use crate::infrastructure::payu::PayuGateway;
use crate::infrastructure::report_repo::DieselReportRepository;
use crate::infrastructure::user_repo::DieselUserRepository;

// ── Concrete service types shared as app data ────────────────────────────────

pub type Auth = AuthService<DieselUserRepository, Argon2Hasher, JwtTokens>;
pub type Carts = CartService<DieselCartRepository>;
pub type Catalog = CatalogService<DieselCatalogRepository>;
pub type Orders = OrderService<DieselOrderRepository>;
pub type Payments = PaymentService<DieselOrderRepository, DieselPaymentRepository, PayuGateway>;
pub type Reports = ReportService<DieselReportRepository>;
pub type Uploads = UploadService<LocalImageStore>;

/// Runs a service call on the blocking pool and flattens both error layers.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    Ok(web::block(f).await??)
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl PageParams {
    pub fn clamped(&self) -> (i64, i64) {
        (self.page.max(1), self.limit.clamp(1, 100))
    }
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

// ── OpenAPI ──────────────────────────────────────────────────────────────────

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::me,
        catalog::list_categories,
        catalog::get_category,
        catalog::create_category,
        catalog::update_category,
        catalog::delete_category,
        catalog::list_brands,
        catalog::get_brand,
        catalog::create_brand,
        catalog::update_brand,
        catalog::delete_brand,
        catalog::list_products,
        catalog::get_product,
        catalog::create_product,
        catalog::update_product,
        catalog::delete_product,
        catalog::list_bundles,
        catalog::get_bundle,
        catalog::create_bundle,
        catalog::update_bundle,
        catalog::delete_bundle,
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        cart::sync_cart,
        orders::create_order,
        orders::get_order,
        orders::list_orders,
        orders::cancel_order,
        orders::list_all_orders,
        orders::update_order_status,
        payments::checkout,
        payments::confirmation,
        payments::browser_return,
        payments::list_order_payments,
        uploads::upload_image,
        uploads::delete_image,
        reports::dashboard,
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration, login and the current user"),
        (name = "catalog", description = "Categories, brands, products and bundles"),
        (name = "cart", description = "The caller's shopping cart"),
        (name = "orders", description = "Checkout and the order lifecycle"),
        (name = "payments", description = "PayU checkout, confirmation webhook and browser return"),
        (name = "admin", description = "Back-office endpoints"),
    )
)]
pub struct ApiDoc;

fn bad_request(err: impl std::fmt::Display) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

/// Registers every route of the API on the given service config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Extractor failures use the same `{"error": ...}` body as everything else.
    cfg.app_data(web::JsonConfig::default().error_handler(|e, _| bad_request(e)))
        .app_data(web::QueryConfig::default().error_handler(|e, _| bad_request(e)))
        .app_data(web::FormConfig::default().error_handler(|e, _| bad_request(e)))
        .app_data(web::PathConfig::default().error_handler(|e, _| bad_request(e)));

    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(auth::register))
            .route("/login", web::post().to(auth::login))
            .route("/me", web::get().to(auth::me)),
    )
    .service(
        web::scope("/categories")
            .route("", web::get().to(catalog::list_categories))
            .route("", web::post().to(catalog::create_category))
            .route("/{id}", web::get().to(catalog::get_category))
            .route("/{id}", web::put().to(catalog::update_category))
            .route("/{id}", web::delete().to(catalog::delete_category)),
    )
    .service(
        web::scope("/brands")
            .route("", web::get().to(catalog::list_brands))
            .route("", web::post().to(catalog::create_brand))
            .route("/{id}", web::get().to(catalog::get_brand))
            .route("/{id}", web::put().to(catalog::update_brand))
            .route("/{id}", web::delete().to(catalog::delete_brand)),
    )
    .service(
        web::scope("/products")
            .route("", web::get().to(catalog::list_products))
            .route("", web::post().to(catalog::create_product))
            .route("/{id}", web::get().to(catalog::get_product))
            .route("/{id}", web::put().to(catalog::update_product))
            .route("/{id}", web::delete().to(catalog::delete_product)),
    )
    .service(
        web::scope("/bundles")
            .route("", web::get().to(catalog::list_bundles))
            .route("", web::post().to(catalog::create_bundle))
            .route("/{id}", web::get().to(catalog::get_bundle))
            .route("/{id}", web::put().to(catalog::update_bundle))
            .route("/{id}", web::delete().to(catalog::delete_bundle)),
    )
    .service(
        web::scope("/cart")
            .route("", web::get().to(cart::get_cart))
            .route("", web::delete().to(cart::clear_cart))
            .route("/items", web::post().to(cart::add_item))
            .route("/items/{item_id}", web::put().to(cart::update_item))
            .route("/items/{item_id}", web::delete().to(cart::remove_item))
            .route("/sync", web::post().to(cart::sync_cart)),
    )
    .service(
        web::scope("/orders")
            .route("", web::post().to(orders::create_order))
            .route("", web::get().to(orders::list_orders))
            .route("/{id}", web::get().to(orders::get_order))
            .route("/{id}/cancel", web::post().to(orders::cancel_order))
            .route("/{id}/payments", web::get().to(payments::list_order_payments)),
    )
    .service(
        web::scope("/payments")
            .route("/checkout/{order_id}", web::get().to(payments::checkout))
            .route("/confirmation", web::post().to(payments::confirmation))
            .route("/response", web::get().to(payments::browser_return)),
    )
    // Guarded so GET requests fall through to the static file service.
    .service(
        web::resource("/uploads")
            .guard(guard::Post())
            .route(web::post().to(uploads::upload_image)),
    )
    .service(
        web::resource("/uploads/{filename}")
            .guard(guard::Delete())
            .route(web::delete().to(uploads::delete_image)),
    )
    .service(
        web::scope("/admin")
            .route("/orders", web::get().to(orders::list_all_orders))
            .route("/orders/{id}/status", web::patch().to(orders::update_order_status))
            .route("/dashboard", web::get().to(reports::dashboard)),
    );
}
