use uuid::Uuid;

use crate::domain::catalog::{
    BrandInput, BrandView, BundleInput, BundleView, CategoryInput, CategoryView, ProductInput,
    ProductPage, ProductQuery, ProductView,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;

/// Public reads and admin writes over categories, brands, products and bundles.
pub struct CatalogService<R> {
    repo: R,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list_categories(&self) -> Result<Vec<CategoryView>, DomainError> {
        self.repo.list_categories()
    }

    pub fn get_category(&self, id: Uuid) -> Result<CategoryView, DomainError> {
        self.repo
            .find_category(id)?
            .ok_or_else(|| DomainError::not_found("Category"))
    }

    pub fn create_category(&self, input: CategoryInput) -> Result<CategoryView, DomainError> {
        input.validate()?;
        self.repo.create_category(&input)
    }

    pub fn update_category(&self, id: Uuid, input: CategoryInput) -> Result<CategoryView, DomainError> {
        input.validate()?;
        self.repo.update_category(id, &input)
    }

    pub fn delete_category(&self, id: Uuid) -> Result<(), DomainError> {
        self.repo.delete_category(id)
    }

    pub fn list_brands(&self) -> Result<Vec<BrandView>, DomainError> {
        self.repo.list_brands()
    }

    pub fn get_brand(&self, id: Uuid) -> Result<BrandView, DomainError> {
        self.repo
            .find_brand(id)?
            .ok_or_else(|| DomainError::not_found("Brand"))
    }

    pub fn create_brand(&self, input: BrandInput) -> Result<BrandView, DomainError> {
        input.validate()?;
        self.repo.create_brand(&input)
    }

    pub fn update_brand(&self, id: Uuid, input: BrandInput) -> Result<BrandView, DomainError> {
        input.validate()?;
        self.repo.update_brand(id, &input)
    }

    pub fn delete_brand(&self, id: Uuid) -> Result<(), DomainError> {
        self.repo.delete_brand(id)
    }

    pub fn list_products(&self, query: ProductQuery) -> Result<ProductPage, DomainError> {
        self.repo.list_products(&query)
    }

    /// Inactive products are hidden from the storefront but visible to admins.
    pub fn get_product(&self, id: Uuid, include_inactive: bool) -> Result<ProductView, DomainError> {
        self.repo
            .find_product(id)?
            .filter(|p| p.is_active || include_inactive)
            .ok_or_else(|| DomainError::not_found("Product"))
    }

    pub fn create_product(&self, input: ProductInput) -> Result<ProductView, DomainError> {
        input.validate()?;
        self.ensure_references(&input)?;
        self.repo.create_product(&input)
    }

    pub fn update_product(&self, id: Uuid, input: ProductInput) -> Result<ProductView, DomainError> {
        input.validate()?;
        self.ensure_references(&input)?;
        self.repo.update_product(id, &input)
    }

    pub fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        self.repo.delete_product(id)
    }

    pub fn list_bundles(&self, include_inactive: bool) -> Result<Vec<BundleView>, DomainError> {
        self.repo.list_bundles(include_inactive)
    }

    pub fn get_bundle(&self, id: Uuid, include_inactive: bool) -> Result<BundleView, DomainError> {
        self.repo
            .find_bundle(id)?
            .filter(|b| b.is_active || include_inactive)
            .ok_or_else(|| DomainError::not_found("Bundle"))
    }

    pub fn create_bundle(&self, input: BundleInput) -> Result<BundleView, DomainError> {
        input.validate(true)?;
        self.repo.create_bundle(&input)
    }

    pub fn update_bundle(&self, id: Uuid, input: BundleInput) -> Result<BundleView, DomainError> {
        input.validate(false)?;
        self.repo.update_bundle(id, &input)
    }

    pub fn delete_bundle(&self, id: Uuid) -> Result<(), DomainError> {
        self.repo.delete_bundle(id)
    }

    fn ensure_references(&self, input: &ProductInput) -> Result<(), DomainError> {
        if let Some(category_id) = input.category_id {
            if self.repo.find_category(category_id)?.is_none() {
                return Err(DomainError::invalid(format!("category {category_id} does not exist")));
            }
        }
        if let Some(brand_id) = input.brand_id {
            if self.repo.find_brand(brand_id)?.is_none() {
                return Err(DomainError::invalid(format!("brand {brand_id} does not exist")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::{Arc, Mutex};

    use bigdecimal::BigDecimal;
    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    struct Tables {
        categories: Vec<CategoryView>,
        products: Vec<ProductView>,
        bundles: Vec<BundleView>,
    }

    /// Just enough of a catalog to exercise the service rules.
    #[derive(Clone, Default)]
    struct MemoryCatalog(Arc<Mutex<Tables>>);

    impl MemoryCatalog {
        fn product_count(&self) -> usize {
            self.0.lock().unwrap().products.len()
        }
    }

    fn unsupported<T>() -> Result<T, DomainError> {
        Err(DomainError::Internal("not used in these tests".to_string()))
    }

    impl CatalogRepository for MemoryCatalog {
        fn list_categories(&self) -> Result<Vec<CategoryView>, DomainError> {
            Ok(self.0.lock().unwrap().categories.clone())
        }

        fn find_category(&self, id: Uuid) -> Result<Option<CategoryView>, DomainError> {
            Ok(self.0.lock().unwrap().categories.iter().find(|c| c.id == id).cloned())
        }

        fn create_category(&self, input: &CategoryInput) -> Result<CategoryView, DomainError> {
            let view = CategoryView {
                id: Uuid::new_v4(),
                name: input.name.clone(),
                description: input.description.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.0.lock().unwrap().categories.push(view.clone());
            Ok(view)
        }

        fn update_category(&self, _id: Uuid, _input: &CategoryInput) -> Result<CategoryView, DomainError> {
            unsupported()
        }

        fn delete_category(&self, _id: Uuid) -> Result<(), DomainError> {
            unsupported()
        }

        fn list_brands(&self) -> Result<Vec<BrandView>, DomainError> {
            Ok(vec![])
        }

        fn find_brand(&self, _id: Uuid) -> Result<Option<BrandView>, DomainError> {
            Ok(None)
        }

        fn create_brand(&self, _input: &BrandInput) -> Result<BrandView, DomainError> {
            unsupported()
        }

        fn update_brand(&self, _id: Uuid, _input: &BrandInput) -> Result<BrandView, DomainError> {
            unsupported()
        }

        fn delete_brand(&self, _id: Uuid) -> Result<(), DomainError> {
            unsupported()
        }

        fn list_products(&self, _query: &ProductQuery) -> Result<ProductPage, DomainError> {
            let items = self.0.lock().unwrap().products.clone();
            let total = items.len() as i64;
            Ok(ProductPage { items, total })
        }

        fn find_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError> {
            Ok(self.0.lock().unwrap().products.iter().find(|p| p.id == id).cloned())
        }

        fn create_product(&self, input: &ProductInput) -> Result<ProductView, DomainError> {
            let view = ProductView {
                id: Uuid::new_v4(),
                name: input.name.clone(),
                description: input.description.clone(),
                price: input.price.clone(),
                stock: input.stock,
                image_url: input.image_url.clone(),
                category_id: input.category_id,
                brand_id: input.brand_id,
                is_active: input.is_active,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.0.lock().unwrap().products.push(view.clone());
            Ok(view)
        }

        fn update_product(&self, _id: Uuid, _input: &ProductInput) -> Result<ProductView, DomainError> {
            unsupported()
        }

        fn delete_product(&self, _id: Uuid) -> Result<(), DomainError> {
            unsupported()
        }

        fn list_bundles(&self, _include_inactive: bool) -> Result<Vec<BundleView>, DomainError> {
            Ok(self.0.lock().unwrap().bundles.clone())
        }

        fn find_bundle(&self, id: Uuid) -> Result<Option<BundleView>, DomainError> {
            Ok(self.0.lock().unwrap().bundles.iter().find(|b| b.id == id).cloned())
        }

        fn create_bundle(&self, _input: &BundleInput) -> Result<BundleView, DomainError> {
            unsupported()
        }

        fn update_bundle(&self, _id: Uuid, _input: &BundleInput) -> Result<BundleView, DomainError> {
            unsupported()
        }

        fn delete_bundle(&self, _id: Uuid) -> Result<(), DomainError> {
            unsupported()
        }
    }

    fn product(price: &str, category_id: Option<Uuid>, is_active: bool) -> ProductInput {
        ProductInput {
            name: "Pre-Workout 30 servings".to_string(),
            description: None,
            price: BigDecimal::from_str(price).unwrap(),
            stock: 8,
            image_url: None,
            category_id,
            brand_id: None,
            is_active,
        }
    }

    #[test]
    fn invalid_product_is_not_written() {
        let repo = MemoryCatalog::default();
        let svc = CatalogService::new(repo.clone());

        let err = svc.create_product(product("-1.00", None, true)).unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert_eq!(repo.product_count(), 0);
    }

    #[test]
    fn product_must_reference_an_existing_category() {
        let repo = MemoryCatalog::default();
        let svc = CatalogService::new(repo.clone());

        let err = svc
            .create_product(product("49.90", Some(Uuid::new_v4()), true))
            .unwrap_err();
        assert!(err.to_string().contains("category"));

        let category = svc
            .create_category(CategoryInput {
                name: "Proteins".to_string(),
                description: None,
            })
            .unwrap();
        let created = svc
            .create_product(product("49.90", Some(category.id), true))
            .unwrap();
        assert_eq!(created.category_id, Some(category.id));
        assert_eq!(repo.product_count(), 1);
    }

    #[test]
    fn inactive_products_are_hidden_unless_requested() {
        let svc = CatalogService::new(MemoryCatalog::default());
        let hidden = svc.create_product(product("12.00", None, false)).unwrap();

        assert!(matches!(
            svc.get_product(hidden.id, false),
            Err(DomainError::NotFound(_))
        ));
        assert_eq!(svc.get_product(hidden.id, true).unwrap().id, hidden.id);
    }

    #[test]
    fn bundle_without_members_is_rejected_before_the_repository() {
        let svc = CatalogService::new(MemoryCatalog::default());
        let err = svc
            .create_bundle(BundleInput {
                name: "Starter stack".to_string(),
                description: None,
                price: BigDecimal::from_str("80.00").unwrap(),
                image_url: None,
                is_active: true,
                members: None,
            })
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn unknown_category_is_not_found() {
        let svc = CatalogService::new(MemoryCatalog::default());
        let err = svc.get_category(Uuid::new_v4()).unwrap_err();
        assert_eq!(err.to_string(), "Category not found");
    }
}
