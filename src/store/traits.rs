use crate::logic::{Catalog, CatalogResult};
use crate::model::{Id, ProductFilter, ProductInstance};
use anyhow::Result;

/// Persistence of the schema side: attributes, categories, families and
/// family variants, always read and written as one consistent catalog
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// A point-in-time copy of the catalog
    async fn snapshot(&self) -> Result<Catalog>;

    /// Apply `change` to the current catalog and persist the outcome.
    /// Mutations are serialized; a failed change leaves the catalog untouched.
    async fn mutate<T, F>(&self, change: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut Catalog) -> CatalogResult<T> + Send;
}

/// Persistence of product models, products and variants
#[async_trait::async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_product(&self, id: &Id) -> Result<Option<ProductInstance>>;
    async fn find_product_by_code(&self, code: &str) -> Result<Option<ProductInstance>>;
    /// Instances matching `filter`, oldest first
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductInstance>>;
    async fn upsert_product(&self, instance: ProductInstance) -> Result<()>;
    async fn delete_product(&self, id: &Id) -> Result<bool>;
    /// Direct children of `parent_id`, oldest first
    async fn children_of(&self, parent_id: &Id) -> Result<Vec<ProductInstance>>;
}

pub trait Store: CatalogStore + ProductStore + Send + Sync {}
