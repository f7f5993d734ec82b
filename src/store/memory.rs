use anyhow::Result;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::logic::{Catalog, CatalogResult};
use crate::model::{Id, ProductFilter, ProductInstance};
use crate::store::traits::{CatalogStore, ProductStore, Store};

/// Process-local store. The catalog sits behind a single lock; writers work
/// on a copy and swap it in once the change succeeded.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    catalog: RwLock<Catalog>,
    products: RwLock<HashMap<Id, ProductInstance>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            products: RwLock::new(HashMap::new()),
        }
    }

    fn sorted(mut instances: Vec<ProductInstance>) -> Vec<ProductInstance> {
        instances.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.code.cmp(&b.code)));
        instances
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryStore {
    async fn snapshot(&self) -> Result<Catalog> {
        Ok(self.catalog.read().clone())
    }

    async fn mutate<T, F>(&self, change: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut Catalog) -> CatalogResult<T> + Send,
    {
        let mut catalog = self.catalog.write();
        let mut draft = catalog.clone();
        let outcome = change(&mut draft)?;
        *catalog = draft;
        debug!("Catalog mutation applied in memory");
        Ok(outcome)
    }
}

#[async_trait::async_trait]
impl ProductStore for InMemoryStore {
    async fn get_product(&self, id: &Id) -> Result<Option<ProductInstance>> {
        Ok(self.products.read().get(id).cloned())
    }

    async fn find_product_by_code(&self, code: &str) -> Result<Option<ProductInstance>> {
        Ok(self
            .products
            .read()
            .values()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductInstance>> {
        let matching = self
            .products
            .read()
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        Ok(Self::sorted(matching))
    }

    async fn upsert_product(&self, instance: ProductInstance) -> Result<()> {
        self.products.write().insert(instance.id.clone(), instance);
        Ok(())
    }

    async fn delete_product(&self, id: &Id) -> Result<bool> {
        Ok(self.products.write().remove(id).is_some())
    }

    async fn children_of(&self, parent_id: &Id) -> Result<Vec<ProductInstance>> {
        let children = self
            .products
            .read()
            .values()
            .filter(|p| p.parent_id.as_ref() == Some(parent_id))
            .cloned()
            .collect();
        Ok(Self::sorted(children))
    }
}

impl Store for InMemoryStore {}
