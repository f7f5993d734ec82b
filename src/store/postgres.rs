use anyhow::{Context, Result};
use log::{debug, info};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;

use crate::logic::{Catalog, CatalogResult, DocumentKind};
use crate::model::{Attribute, Category, Family, FamilyVariant, Id, ProductFilter, ProductInstance};
use crate::store::traits::{CatalogStore, ProductStore, Store};

/// Advisory lock key serializing catalog writers across processes
const CATALOG_LOCK_KEY: i64 = 0x5049_4d43_4154;

/// Stored documents keyed by kind and id, with their depth-first position
type DocumentMap = HashMap<(DocumentKind, Id), (i32, serde_json::Value)>;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        info!("Database migrations applied");
        Ok(())
    }

    async fn load_documents(tx: &mut Transaction<'_, Postgres>) -> Result<DocumentMap> {
        let rows = sqlx::query("SELECT kind, id, position, body FROM catalog_documents")
            .fetch_all(&mut **tx)
            .await
            .context("Failed to load catalog documents")?;

        let mut documents = HashMap::new();
        for row in rows {
            let kind: String = row.get("kind");
            let kind = DocumentKind::parse(&kind)
                .with_context(|| format!("Unknown catalog document kind '{}'", kind))?;
            documents.insert((kind, row.get("id")), (row.get("position"), row.get("body")));
        }
        Ok(documents)
    }

    fn catalog_from_documents(documents: &DocumentMap) -> Result<Catalog> {
        let mut attributes = Vec::new();
        let mut categories = Vec::new();
        let mut families = Vec::new();
        let mut variants = Vec::new();

        // Sibling order of categories follows the stored position
        let mut ordered: Vec<_> = documents.iter().collect();
        ordered.sort_by_key(|(_, (position, _))| *position);

        for ((kind, id), (_, body)) in ordered {
            let context = || format!("Failed to deserialize {} '{}'", kind.as_str(), id);
            match kind {
                DocumentKind::Attribute => attributes
                    .push(serde_json::from_value::<Attribute>(body.clone()).with_context(context)?),
                DocumentKind::Category => categories
                    .push(serde_json::from_value::<Category>(body.clone()).with_context(context)?),
                DocumentKind::Family => families
                    .push(serde_json::from_value::<Family>(body.clone()).with_context(context)?),
                DocumentKind::FamilyVariant => variants.push(
                    serde_json::from_value::<FamilyVariant>(body.clone()).with_context(context)?,
                ),
            }
        }

        Catalog::from_parts(attributes, categories, families, variants)
            .context("Stored catalog violates its own invariants")
    }

    fn document_map(catalog: &Catalog) -> Result<DocumentMap> {
        Ok(catalog
            .documents()
            .context("Failed to serialize catalog")?
            .into_iter()
            .enumerate()
            .map(|(position, (kind, id, body))| ((kind, id), (position as i32, body)))
            .collect())
    }

    fn row_to_instance(row: &sqlx::postgres::PgRow) -> Result<ProductInstance> {
        let body: serde_json::Value = row.get("body");
        serde_json::from_value(body).context("Failed to deserialize product instance")
    }
}

#[async_trait::async_trait]
impl CatalogStore for PostgresStore {
    async fn snapshot(&self) -> Result<Catalog> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let documents = Self::load_documents(&mut tx).await?;
        tx.commit().await.context("Failed to commit transaction")?;
        Self::catalog_from_documents(&documents)
    }

    async fn mutate<T, F>(&self, change: F) -> Result<T>
    where
        T: Send,
        F: FnOnce(&mut Catalog) -> CatalogResult<T> + Send,
    {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CATALOG_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .context("Failed to acquire catalog lock")?;

        let before = Self::load_documents(&mut tx).await?;
        let mut catalog = Self::catalog_from_documents(&before)?;
        // Dropping `tx` on error rolls back and releases the lock
        let outcome = change(&mut catalog)?;
        let after = Self::document_map(&catalog)?;

        let mut written = 0;
        for ((kind, id), document) in &after {
            if before.get(&(*kind, id.clone())) == Some(document) {
                continue;
            }
            let (position, body) = document;
            sqlx::query(
                r#"
                INSERT INTO catalog_documents (kind, id, position, body, updated_at)
                VALUES ($1, $2, $3, $4, NOW())
                ON CONFLICT (kind, id) DO UPDATE SET
                    position = EXCLUDED.position,
                    body = EXCLUDED.body,
                    updated_at = NOW()
                "#,
            )
            .bind(kind.as_str())
            .bind(id)
            .bind(position)
            .bind(body)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to write {} '{}'", kind.as_str(), id))?;
            written += 1;
        }
        for (kind, id) in before.keys().filter(|key| !after.contains_key(*key)) {
            sqlx::query("DELETE FROM catalog_documents WHERE kind = $1 AND id = $2")
                .bind(kind.as_str())
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to delete {} '{}'", kind.as_str(), id))?;
            written += 1;
        }

        tx.commit().await.context("Failed to commit catalog mutation")?;
        debug!("Catalog mutation persisted ({} documents changed)", written);
        Ok(outcome)
    }
}

#[async_trait::async_trait]
impl ProductStore for PostgresStore {
    async fn get_product(&self, id: &Id) -> Result<Option<ProductInstance>> {
        let row = sqlx::query("SELECT body FROM product_instances WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product instance")?;

        row.as_ref().map(Self::row_to_instance).transpose()
    }

    async fn find_product_by_code(&self, code: &str) -> Result<Option<ProductInstance>> {
        let row = sqlx::query("SELECT body FROM product_instances WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch product instance by code")?;

        row.as_ref().map(Self::row_to_instance).transpose()
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductInstance>> {
        let rows = sqlx::query(
            r#"
            SELECT body FROM product_instances
            WHERE ($1::text IS NULL OR code ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR family_variant_id = $2)
              AND ($3::text IS NULL OR parent_id = $3)
            ORDER BY created_at, code
            "#,
        )
        .bind(filter.search.as_deref())
        .bind(filter.family_variant_id.as_deref())
        .bind(filter.parent_id.as_deref())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list product instances")?;

        rows.iter().map(Self::row_to_instance).collect()
    }

    async fn upsert_product(&self, instance: ProductInstance) -> Result<()> {
        let body = serde_json::to_value(&instance).context("Failed to serialize product instance")?;
        sqlx::query(
            r#"
            INSERT INTO product_instances (id, code, parent_id, family_variant_id, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                code = EXCLUDED.code,
                parent_id = EXCLUDED.parent_id,
                family_variant_id = EXCLUDED.family_variant_id,
                body = EXCLUDED.body,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&instance.id)
        .bind(&instance.code)
        .bind(&instance.parent_id)
        .bind(&instance.family_variant_id)
        .bind(body)
        .bind(instance.created_at)
        .bind(instance.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert product instance")?;

        Ok(())
    }

    async fn delete_product(&self, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM product_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete product instance")?;

        Ok(result.rows_affected() > 0)
    }

    async fn children_of(&self, parent_id: &Id) -> Result<Vec<ProductInstance>> {
        let rows = sqlx::query(
            "SELECT body FROM product_instances WHERE parent_id = $1 ORDER BY created_at, code",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list child instances")?;

        rows.iter().map(Self::row_to_instance).collect()
    }
}

impl Store for PostgresStore {}
