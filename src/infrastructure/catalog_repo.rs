use std::collections::HashMap;

use chrono::Utc;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{
    BrandInput, BrandView, BundleInput, BundleMember, BundleMemberInput, BundleView,
    CategoryInput, CategoryView, ProductInput, ProductPage, ProductQuery, ProductView,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::schema::{brands, bundle_items, bundles, categories, products};

use super::models::{
    BrandChanges, BrandRow, BundleChanges, BundleItemRow, BundleRow, CategoryChanges, CategoryRow,
    ProductChanges, ProductRow,
};
use super::page_offset;

// ── Row → view mapping ───────────────────────────────────────────────────────

impl From<CategoryRow> for CategoryView {
    fn from(r: CategoryRow) -> Self {
        CategoryView {
            id: r.id,
            name: r.name,
            description: r.description,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<BrandRow> for BrandView {
    fn from(r: BrandRow) -> Self {
        BrandView {
            id: r.id,
            name: r.name,
            logo_url: r.logo_url,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

impl From<ProductRow> for ProductView {
    fn from(r: ProductRow) -> Self {
        ProductView {
            id: r.id,
            name: r.name,
            description: r.description,
            price: r.price,
            stock: r.stock,
            image_url: r.image_url,
            category_id: r.category_id,
            brand_id: r.brand_id,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn category_changes(input: &CategoryInput) -> CategoryChanges<'_> {
    CategoryChanges {
        name: input.name.trim(),
        description: input.description.as_deref(),
    }
}

fn brand_changes(input: &BrandInput) -> BrandChanges<'_> {
    BrandChanges {
        name: input.name.trim(),
        logo_url: input.logo_url.as_deref(),
    }
}

fn product_changes(input: &ProductInput) -> ProductChanges<'_> {
    ProductChanges {
        name: input.name.trim(),
        description: input.description.as_deref(),
        price: &input.price,
        stock: input.stock,
        image_url: input.image_url.as_deref(),
        category_id: input.category_id,
        brand_id: input.brand_id,
        is_active: input.is_active,
    }
}

fn bundle_changes(input: &BundleInput) -> BundleChanges<'_> {
    BundleChanges {
        name: input.name.trim(),
        description: input.description.as_deref(),
        price: &input.price,
        image_url: input.image_url.as_deref(),
        is_active: input.is_active,
    }
}

/// Escapes `%`, `_` and `\` so user search text matches literally.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// ── Bundle helpers ───────────────────────────────────────────────────────────

fn bundle_views(conn: &mut PgConnection, rows: Vec<BundleRow>) -> Result<Vec<BundleView>, DomainError> {
    let ids: Vec<Uuid> = rows.iter().map(|b| b.id).collect();
    let members: Vec<(Uuid, Uuid, String, i32)> = bundle_items::table
        .inner_join(products::table)
        .filter(bundle_items::bundle_id.eq_any(&ids))
        .order(products::name.asc())
        .select((
            bundle_items::bundle_id,
            bundle_items::product_id,
            products::name,
            bundle_items::quantity,
        ))
        .load(conn)?;

    let mut by_bundle: HashMap<Uuid, Vec<BundleMember>> = HashMap::new();
    for (bundle_id, product_id, name, quantity) in members {
        by_bundle.entry(bundle_id).or_default().push(BundleMember {
            product_id,
            name,
            quantity,
        });
    }

    Ok(rows
        .into_iter()
        .map(|b| BundleView {
            members: by_bundle.remove(&b.id).unwrap_or_default(),
            id: b.id,
            name: b.name,
            description: b.description,
            price: b.price,
            image_url: b.image_url,
            is_active: b.is_active,
            created_at: b.created_at,
            updated_at: b.updated_at,
        })
        .collect())
}

fn load_bundle(conn: &mut PgConnection, id: Uuid) -> Result<Option<BundleView>, DomainError> {
    let row: Option<BundleRow> = bundles::table
        .find(id)
        .select(BundleRow::as_select())
        .first(conn)
        .optional()?;
    match row {
        Some(row) => Ok(bundle_views(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

fn replace_members(conn: &mut PgConnection, bundle_id: Uuid, members: &[BundleMemberInput]) -> Result<(), DomainError> {
    let ids: Vec<Uuid> = members.iter().map(|m| m.product_id).collect();
    let found: i64 = products::table
        .filter(products::id.eq_any(&ids))
        .count()
        .get_result(conn)?;
    if found != ids.len() as i64 {
        return Err(DomainError::invalid("every bundle member must be an existing product"));
    }

    diesel::delete(bundle_items::table.filter(bundle_items::bundle_id.eq(bundle_id))).execute(conn)?;
    let rows: Vec<BundleItemRow> = members
        .iter()
        .map(|m| BundleItemRow {
            bundle_id,
            product_id: m.product_id,
            quantity: m.quantity,
        })
        .collect();
    diesel::insert_into(bundle_items::table).values(&rows).execute(conn)?;
    Ok(())
}

fn deleted(rows: usize, what: &str) -> Result<(), DomainError> {
    if rows == 0 {
        return Err(DomainError::not_found(what));
    }
    Ok(())
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for DieselCatalogRepository {
    fn list_categories(&self) -> Result<Vec<CategoryView>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows: Vec<CategoryRow> = categories::table
            .order(categories::name.asc())
            .select(CategoryRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn find_category(&self, id: Uuid) -> Result<Option<CategoryView>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(categories::table
            .find(id)
            .select(CategoryRow::as_select())
            .first::<CategoryRow>(&mut conn)
            .optional()?
            .map(Into::into))
    }

    fn create_category(&self, input: &CategoryInput) -> Result<CategoryView, DomainError> {
        let mut conn = self.pool.get()?;
        let row: CategoryRow = diesel::insert_into(categories::table)
            .values(&category_changes(input))
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update_category(&self, id: Uuid, input: &CategoryInput) -> Result<CategoryView, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<CategoryRow> = diesel::update(categories::table.find(id))
            .set((&category_changes(input), categories::updated_at.eq(Utc::now())))
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        row.map(Into::into).ok_or_else(|| DomainError::not_found("Category"))
    }

    fn delete_category(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let rows = diesel::delete(categories::table.find(id)).execute(&mut conn)?;
        deleted(rows, "Category")
    }

    fn list_brands(&self) -> Result<Vec<BrandView>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows: Vec<BrandRow> = brands::table
            .order(brands::name.asc())
            .select(BrandRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn find_brand(&self, id: Uuid) -> Result<Option<BrandView>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(brands::table
            .find(id)
            .select(BrandRow::as_select())
            .first::<BrandRow>(&mut conn)
            .optional()?
            .map(Into::into))
    }

    fn create_brand(&self, input: &BrandInput) -> Result<BrandView, DomainError> {
        let mut conn = self.pool.get()?;
        let row: BrandRow = diesel::insert_into(brands::table)
            .values(&brand_changes(input))
            .returning(BrandRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn update_brand(&self, id: Uuid, input: &BrandInput) -> Result<BrandView, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<BrandRow> = diesel::update(brands::table.find(id))
            .set((&brand_changes(input), brands::updated_at.eq(Utc::now())))
            .returning(BrandRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        row.map(Into::into).ok_or_else(|| DomainError::not_found("Brand"))
    }

    fn delete_brand(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let rows = diesel::delete(brands::table.find(id)).execute(&mut conn)?;
        deleted(rows, "Brand")
    }

    fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, DomainError> {
        let mut conn = self.pool.get()?;

        let filtered = || {
            let mut q: products::BoxedQuery<'_, Pg> = products::table.into_boxed();
            if !query.include_inactive {
                q = q.filter(products::is_active.eq(true));
            }
            if let Some(category_id) = query.category_id {
                q = q.filter(products::category_id.eq(category_id));
            }
            if let Some(brand_id) = query.brand_id {
                q = q.filter(products::brand_id.eq(brand_id));
            }
            if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
                q = q.filter(products::name.ilike(like_pattern(search)));
            }
            q
        };

        let page = query.page.max(1);
        let limit = query.limit.clamp(1, 100);
        let offset = page_offset(page, limit)?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered().count().get_result(conn)?;
            let rows: Vec<ProductRow> = filtered()
                .select(ProductRow::as_select())
                .order((products::name.asc(), products::id.asc()))
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(ProductPage {
                items: rows.into_iter().map(Into::into).collect(),
                total,
            })
        })
    }

    fn find_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(products::table
            .find(id)
            .select(ProductRow::as_select())
            .first::<ProductRow>(&mut conn)
            .optional()?
            .map(Into::into))
    }

    fn create_product(&self, input: &ProductInput) -> Result<ProductView, DomainError> {
        let mut conn = self.pool.get()?;
        let row: ProductRow = diesel::insert_into(products::table)
            .values(&product_changes(input))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;
        log::info!("Created product {} ({})", row.id, row.name);
        Ok(row.into())
    }

    fn update_product(&self, id: Uuid, input: &ProductInput) -> Result<ProductView, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<ProductRow> = diesel::update(products::table.find(id))
            .set((&product_changes(input), products::updated_at.eq(Utc::now())))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        row.map(Into::into).ok_or_else(|| DomainError::not_found("Product"))
    }

    fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let rows = diesel::delete(products::table.find(id)).execute(&mut conn)?;
        deleted(rows, "Product")
    }

    fn list_bundles(&self, include_inactive: bool) -> Result<Vec<BundleView>, DomainError> {
        let mut conn = self.pool.get()?;
        let mut query: bundles::BoxedQuery<'_, Pg> = bundles::table.into_boxed();
        if !include_inactive {
            query = query.filter(bundles::is_active.eq(true));
        }
        let rows: Vec<BundleRow> = query
            .order(bundles::name.asc())
            .select(BundleRow::as_select())
            .load(&mut conn)?;
        bundle_views(&mut conn, rows)
    }

    fn find_bundle(&self, id: Uuid) -> Result<Option<BundleView>, DomainError> {
        let mut conn = self.pool.get()?;
        load_bundle(&mut conn, id)
    }

    fn create_bundle(&self, input: &BundleInput) -> Result<BundleView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row: BundleRow = diesel::insert_into(bundles::table)
                .values(&bundle_changes(input))
                .returning(BundleRow::as_returning())
                .get_result(conn)?;
            replace_members(conn, row.id, input.members.as_deref().unwrap_or_default())?;
            load_bundle(conn, row.id)?.ok_or_else(|| DomainError::not_found("Bundle"))
        })
    }

    fn update_bundle(&self, id: Uuid, input: &BundleInput) -> Result<BundleView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(bundles::table.find(id))
                .set((&bundle_changes(input), bundles::updated_at.eq(Utc::now())))
                .execute(conn)?;
            if updated == 0 {
                return Err(DomainError::not_found("Bundle"));
            }
            if let Some(members) = &input.members {
                replace_members(conn, id, members)?;
            }
            load_bundle(conn, id)?.ok_or_else(|| DomainError::not_found("Bundle"))
        })
    }

    fn delete_bundle(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let rows = diesel::delete(bundles::table.find(id)).execute(&mut conn)?;
        deleted(rows, "Bundle")
    }
}
