use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::catalog::{
    BrandInput, BrandView, BundleInput, BundleMemberInput, BundleView, CategoryInput,
    CategoryView, ProductInput, ProductQuery, ProductView,
};
use crate::errors::AppError;
use crate::handlers::extract::{AdminUser, AuthUser};
use crate::handlers::{run_blocking, Catalog};

/// Decimal amounts travel as strings to avoid floating-point issues.
fn parse_price(raw: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("invalid price '{raw}'")))
}

/// Inactive items are visible only to admins who ask for them.
fn sees_inactive(user: &Option<AuthUser>, requested: bool) -> bool {
    requested && user.as_ref().is_some_and(|u| u.0.is_admin())
}

fn default_true() -> bool {
    true
}

// ── Categories ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

impl From<CategoryRequest> for CategoryInput {
    fn from(r: CategoryRequest) -> Self {
        Self {
            name: r.name,
            description: r.description,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CategoryView> for CategoryResponse {
    fn from(c: CategoryView) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "All categories", body = [CategoryResponse])),
    tag = "catalog"
)]
pub async fn list_categories(catalog: web::Data<Catalog>) -> Result<HttpResponse, AppError> {
    let items = run_blocking(move || catalog.list_categories()).await?;
    let body: Vec<CategoryResponse> = items.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category UUID")),
    responses(
        (status = 200, description = "Category found", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    ),
    tag = "catalog"
)]
pub async fn get_category(
    catalog: web::Data<Catalog>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let category = run_blocking(move || catalog.get_category(id)).await?;
    Ok(HttpResponse::Ok().json(CategoryResponse::from(category)))
}

#[utoipa::path(
    post,
    path = "/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 409, description = "Name already taken"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn create_category(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    body: web::Json<CategoryRequest>,
) -> Result<HttpResponse, AppError> {
    let input = CategoryInput::from(body.into_inner());
    let category = run_blocking(move || catalog.create_category(input)).await?;
    Ok(HttpResponse::Created().json(CategoryResponse::from(category)))
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category UUID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn update_category(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<CategoryRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = CategoryInput::from(body.into_inner());
    let category = run_blocking(move || catalog.update_category(id, input)).await?;
    Ok(HttpResponse::Ok().json(CategoryResponse::from(category)))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category UUID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn delete_category(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    run_blocking(move || catalog.delete_category(id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ── Brands ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct BrandRequest {
    pub name: String,
    pub logo_url: Option<String>,
}

impl From<BrandRequest> for BrandInput {
    fn from(r: BrandRequest) -> Self {
        Self {
            name: r.name,
            logo_url: r.logo_url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BrandResponse {
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<BrandView> for BrandResponse {
    fn from(b: BrandView) -> Self {
        Self {
            id: b.id,
            name: b.name,
            logo_url: b.logo_url,
            created_at: b.created_at.to_rfc3339(),
            updated_at: b.updated_at.to_rfc3339(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/brands",
    responses((status = 200, description = "All brands", body = [BrandResponse])),
    tag = "catalog"
)]
pub async fn list_brands(catalog: web::Data<Catalog>) -> Result<HttpResponse, AppError> {
    let items = run_blocking(move || catalog.list_brands()).await?;
    let body: Vec<BrandResponse> = items.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    get,
    path = "/brands/{id}",
    params(("id" = Uuid, Path, description = "Brand UUID")),
    responses(
        (status = 200, description = "Brand found", body = BrandResponse),
        (status = 404, description = "Brand not found"),
    ),
    tag = "catalog"
)]
pub async fn get_brand(
    catalog: web::Data<Catalog>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let brand = run_blocking(move || catalog.get_brand(id)).await?;
    Ok(HttpResponse::Ok().json(BrandResponse::from(brand)))
}

#[utoipa::path(
    post,
    path = "/brands",
    request_body = BrandRequest,
    responses(
        (status = 201, description = "Brand created", body = BrandResponse),
        (status = 409, description = "Name already taken"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn create_brand(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    body: web::Json<BrandRequest>,
) -> Result<HttpResponse, AppError> {
    let input = BrandInput::from(body.into_inner());
    let brand = run_blocking(move || catalog.create_brand(input)).await?;
    Ok(HttpResponse::Created().json(BrandResponse::from(brand)))
}

#[utoipa::path(
    put,
    path = "/brands/{id}",
    params(("id" = Uuid, Path, description = "Brand UUID")),
    request_body = BrandRequest,
    responses(
        (status = 200, description = "Brand updated", body = BrandResponse),
        (status = 404, description = "Brand not found"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn update_brand(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<BrandRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = BrandInput::from(body.into_inner());
    let brand = run_blocking(move || catalog.update_brand(id, input)).await?;
    Ok(HttpResponse::Ok().json(BrandResponse::from(brand)))
}

#[utoipa::path(
    delete,
    path = "/brands/{id}",
    params(("id" = Uuid, Path, description = "Brand UUID")),
    responses(
        (status = 204, description = "Brand deleted"),
        (status = 404, description = "Brand not found"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn delete_brand(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    run_blocking(move || catalog.delete_brand(id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ── Products ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Decimal price as a string, e.g. "129900.00".
    pub price: String,
    #[serde(default)]
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl ProductRequest {
    fn into_input(self) -> Result<ProductInput, AppError> {
        Ok(ProductInput {
            price: parse_price(&self.price)?,
            name: self.name,
            description: self.description,
            stock: self.stock,
            image_url: self.image_url,
            category_id: self.category_id,
            brand_id: self.brand_id,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProductView> for ProductResponse {
    fn from(p: ProductView) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price.to_string(),
            stock: p.stock,
            image_url: p.image_url,
            category_id: p.category_id,
            brand_id: p.brand_id,
            is_active: p.is_active,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    /// Honoured for admins only.
    #[serde(default)]
    pub include_inactive: bool,
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListProductsResponse {
    pub items: Vec<ProductResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VisibilityParams {
    /// Honoured for admins only.
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /products
///
/// Paginated, filterable product listing. Only active products are shown
/// unless an admin passes `include_inactive=true`.
#[utoipa::path(
    get,
    path = "/products",
    params(ProductListParams),
    responses((status = 200, description = "Paginated products", body = ListProductsResponse)),
    tag = "catalog"
)]
pub async fn list_products(
    catalog: web::Data<Catalog>,
    user: Option<AuthUser>,
    query: web::Query<ProductListParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);
    let product_query = ProductQuery {
        category_id: params.category_id,
        brand_id: params.brand_id,
        search: params.search.filter(|s| !s.trim().is_empty()),
        include_inactive: sees_inactive(&user, params.include_inactive),
        page,
        limit,
    };

    let result = run_blocking(move || catalog.list_products(product_query)).await?;
    Ok(HttpResponse::Ok().json(ListProductsResponse {
        items: result.items.into_iter().map(Into::into).collect(),
        total: result.total,
        page,
        limit,
    }))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID"), VisibilityParams),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found or inactive"),
    ),
    tag = "catalog"
)]
pub async fn get_product(
    catalog: web::Data<Catalog>,
    user: Option<AuthUser>,
    path: web::Path<Uuid>,
    query: web::Query<VisibilityParams>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let include_inactive = sees_inactive(&user, query.include_inactive);
    let product = run_blocking(move || catalog.get_product(id, include_inactive)).await?;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

#[utoipa::path(
    post,
    path = "/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid price, stock or reference"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn create_product(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let input = body.into_inner().into_input()?;
    let product = run_blocking(move || catalog.create_product(input)).await?;
    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn update_product(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<ProductRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = body.into_inner().into_input()?;
    let product = run_blocking(move || catalog.update_product(id, input)).await?;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn delete_product(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    run_blocking(move || catalog.delete_product(id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ── Bundles ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct BundleMemberRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BundleRequest {
    pub name: String,
    pub description: Option<String>,
    /// Decimal price as a string.
    pub price: String,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Required on create; on update, omitting it keeps the current members.
    pub members: Option<Vec<BundleMemberRequest>>,
}

impl BundleRequest {
    fn into_input(self) -> Result<BundleInput, AppError> {
        Ok(BundleInput {
            price: parse_price(&self.price)?,
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            is_active: self.is_active,
            members: self.members.map(|members| {
                members
                    .into_iter()
                    .map(|m| BundleMemberInput {
                        product_id: m.product_id,
                        quantity: m.quantity,
                    })
                    .collect()
            }),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BundleMemberResponse {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BundleResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub members: Vec<BundleMemberResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<BundleView> for BundleResponse {
    fn from(b: BundleView) -> Self {
        Self {
            id: b.id,
            name: b.name,
            description: b.description,
            price: b.price.to_string(),
            image_url: b.image_url,
            is_active: b.is_active,
            members: b
                .members
                .into_iter()
                .map(|m| BundleMemberResponse {
                    product_id: m.product_id,
                    name: m.name,
                    quantity: m.quantity,
                })
                .collect(),
            created_at: b.created_at.to_rfc3339(),
            updated_at: b.updated_at.to_rfc3339(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/bundles",
    params(VisibilityParams),
    responses((status = 200, description = "Bundles with their products", body = [BundleResponse])),
    tag = "catalog"
)]
pub async fn list_bundles(
    catalog: web::Data<Catalog>,
    user: Option<AuthUser>,
    query: web::Query<VisibilityParams>,
) -> Result<HttpResponse, AppError> {
    let include_inactive = sees_inactive(&user, query.include_inactive);
    let items = run_blocking(move || catalog.list_bundles(include_inactive)).await?;
    let body: Vec<BundleResponse> = items.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    get,
    path = "/bundles/{id}",
    params(("id" = Uuid, Path, description = "Bundle UUID"), VisibilityParams),
    responses(
        (status = 200, description = "Bundle found", body = BundleResponse),
        (status = 404, description = "Bundle not found or inactive"),
    ),
    tag = "catalog"
)]
pub async fn get_bundle(
    catalog: web::Data<Catalog>,
    user: Option<AuthUser>,
    path: web::Path<Uuid>,
    query: web::Query<VisibilityParams>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let include_inactive = sees_inactive(&user, query.include_inactive);
    let bundle = run_blocking(move || catalog.get_bundle(id, include_inactive)).await?;
    Ok(HttpResponse::Ok().json(BundleResponse::from(bundle)))
}

#[utoipa::path(
    post,
    path = "/bundles",
    request_body = BundleRequest,
    responses(
        (status = 201, description = "Bundle created", body = BundleResponse),
        (status = 400, description = "Missing, duplicate or unknown member products"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn create_bundle(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    body: web::Json<BundleRequest>,
) -> Result<HttpResponse, AppError> {
    let input = body.into_inner().into_input()?;
    let bundle = run_blocking(move || catalog.create_bundle(input)).await?;
    Ok(HttpResponse::Created().json(BundleResponse::from(bundle)))
}

#[utoipa::path(
    put,
    path = "/bundles/{id}",
    params(("id" = Uuid, Path, description = "Bundle UUID")),
    request_body = BundleRequest,
    responses(
        (status = 200, description = "Bundle updated", body = BundleResponse),
        (status = 404, description = "Bundle not found"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn update_bundle(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<BundleRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = body.into_inner().into_input()?;
    let bundle = run_blocking(move || catalog.update_bundle(id, input)).await?;
    Ok(HttpResponse::Ok().json(BundleResponse::from(bundle)))
}

#[utoipa::path(
    delete,
    path = "/bundles/{id}",
    params(("id" = Uuid, Path, description = "Bundle UUID")),
    responses(
        (status = 204, description = "Bundle deleted"),
        (status = 404, description = "Bundle not found"),
    ),
    security(("bearer" = [])),
    tag = "catalog"
)]
pub async fn delete_bundle(
    catalog: web::Data<Catalog>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    run_blocking(move || catalog.delete_bundle(id)).await?;
    Ok(HttpResponse::NoContent().finish())
}
