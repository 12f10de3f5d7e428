pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::error::Error;

use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::auth_service::AuthService;
use crate::application::cart_service::CartService;
use crate::application::catalog_service::CatalogService;
use crate::application::order_service::OrderService;
use crate::application::payment_service::PaymentService;
use crate::application::report_service::ReportService;
use crate::application::upload_service::UploadService;
use crate::config::AppConfig;
use crate::domain::errors::DomainError;
use crate::handlers::payments::StorefrontUrl;
use crate::handlers::{ApiDoc, Auth, Carts, Catalog, Orders, Payments, Reports, Uploads};
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

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Public path prefix under which uploaded images are served.
const UPLOADS_PATH: &str = "/uploads";

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Every service the HTTP layer needs, wired to Postgres and the local disk.
#[derive(Clone)]
pub struct Services {
    pub auth: web::Data<Auth>,
    pub carts: web::Data<Carts>,
    pub catalog: web::Data<Catalog>,
    pub orders: web::Data<Orders>,
    pub payments: web::Data<Payments>,
    pub reports: web::Data<Reports>,
    pub uploads: web::Data<Uploads>,
    storefront: web::Data<StorefrontUrl>,
    upload_dir: String,
}

impl Services {
    pub fn new(config: &AppConfig, pool: DbPool) -> Result<Self, DomainError> {
        let images = LocalImageStore::new(&config.upload_dir)?;

        Ok(Self {
            auth: web::Data::new(AuthService::new(
                DieselUserRepository::new(pool.clone()),
                Argon2Hasher::default(),
                JwtTokens::new(&config.jwt_secret, config.jwt_expiration_minutes),
            )),
            carts: web::Data::new(CartService::new(DieselCartRepository::new(pool.clone()))),
            catalog: web::Data::new(CatalogService::new(DieselCatalogRepository::new(
                pool.clone(),
            ))),
            orders: web::Data::new(OrderService::new(DieselOrderRepository::new(pool.clone()))),
            payments: web::Data::new(PaymentService::new(
                DieselOrderRepository::new(pool.clone()),
                DieselPaymentRepository::new(pool.clone()),
                PayuGateway::new(config.payu.clone()),
            )),
            reports: web::Data::new(ReportService::new(
                DieselReportRepository::new(pool),
                config.low_stock_threshold,
            )),
            uploads: web::Data::new(UploadService::new(
                images,
                config.upload_max_bytes,
                UPLOADS_PATH,
            )),
            storefront: web::Data::new(StorefrontUrl(config.storefront_url.clone())),
            upload_dir: config.upload_dir.clone(),
        })
    }

    /// Creates or promotes the configured administrator, if one is configured.
    pub fn bootstrap_admin(&self, config: &AppConfig) -> Result<(), DomainError> {
        if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
            let admin = self.auth.ensure_admin(email, password)?;
            log::info!("Administrator account ready: {}", admin.email);
        }
        Ok(())
    }
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    services: Services,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        let s = services.clone();
        App::new()
            .app_data(s.auth)
            .app_data(s.carts)
            .app_data(s.catalog)
            .app_data(s.orders)
            .app_data(s.payments)
            .app_data(s.reports)
            .app_data(s.uploads)
            .app_data(s.storefront)
            .wrap(Logger::default())
            .configure(handlers::configure)
            .service(Files::new(UPLOADS_PATH, &s.upload_dir))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
