use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::logic::{Catalog, CatalogError, ErrorKind, VariantContext, Verdict};
use crate::model::{
    Attribute, AttributeOption, AttributeUpdate, Category, CategoryUpdate, ChannelLocales,
    DeletePolicy, Family, FamilyAttribute, FamilyUpdate, FamilyVariant, Id, MoveCategory,
    NewAttribute, NewCategory, NewFamily, NewFamilyVariant, NewProductInstance, Page,
    ProductFilter, ProductInstance, ProductInstanceUpdate, ProductValue,
};
use crate::store::traits::Store;

/// Shared state of every handler: the store plus the tenant's channel and
/// locale settings
#[derive(Debug)]
pub struct ApiState<S> {
    pub store: S,
    pub settings: ChannelLocales,
    pub app_name: String,
}

impl<S> ApiState<S> {
    pub fn new(store: S, settings: ChannelLocales, app_name: impl Into<String>) -> Self {
        Self {
            store,
            settings,
            app_name: app_name.into(),
        }
    }
}

pub type AppState<S> = Arc<ApiState<S>>;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Longest parent chain followed when collecting a product's ancestors
const MAX_HIERARCHY_DEPTH: usize = 32;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub app: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Present when a write was rejected because the instance is invalid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
            kind: None,
            verdict: None,
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Duplicate | ErrorKind::ReferentialIntegrity => StatusCode::CONFLICT,
        ErrorKind::StructuralViolation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
    }
}

fn catalog_error(err: &CatalogError) -> ApiError {
    let kind = err.kind();
    (
        status_for(kind),
        Json(ErrorResponse {
            error: err.to_string(),
            kind: Some(kind),
            verdict: None,
        }),
    )
}

fn store_error(err: anyhow::Error) -> ApiError {
    if let Some(catalog_err) = err.downcast_ref::<CatalogError>() {
        warn!("Rejected: {}", catalog_err);
        return catalog_error(catalog_err);
    }
    error!("Store failure: {:#}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(&format!("{:#}", err))),
    )
}

fn invalid_input(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
            kind: Some(ErrorKind::InvalidInput),
            verdict: None,
        }),
    )
}

fn rejected(verdict: Verdict) -> ApiError {
    warn!("Rejected invalid instance: {} violations", verdict.reasons().len());
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorResponse {
            error: "Instance does not conform to its family".to_string(),
            kind: Some(ErrorKind::StructuralViolation),
            verdict: Some(verdict),
        }),
    )
}

fn message(text: String) -> Json<MessageResponse> {
    Json(MessageResponse { message: text })
}

async fn snapshot<S: Store>(store: &S) -> Result<Catalog, ApiError> {
    store.snapshot().await.map_err(store_error)
}

pub async fn root<S: Store>(State(state): State<AppState<S>>) -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: format!("Welcome to {}", state.app_name),
    })
}

pub async fn health_check<S: Store>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        app: state.app_name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// Attributes

pub async fn list_attributes<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<ListResponse<Attribute>>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let attributes = catalog.attributes().list().into_iter().cloned().collect();
    Ok(Json(ListResponse::new(attributes)))
}

pub async fn create_attribute<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(new_attribute): RequestJson<NewAttribute>,
) -> Result<Json<Attribute>, ApiError> {
    let attribute = Attribute::from_new(new_attribute);
    state
        .store
        .mutate(move |c| c.define_attribute(attribute).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn get_attribute<S: Store>(
    State(state): State<AppState<S>>,
    Path(attribute_id): Path<Id>,
) -> Result<Json<Attribute>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let attribute = catalog.attributes().get(&attribute_id).map_err(|e| catalog_error(&e))?;
    Ok(Json(attribute.clone()))
}

pub async fn update_attribute<S: Store>(
    State(state): State<AppState<S>>,
    Path(attribute_id): Path<Id>,
    RequestJson(update): RequestJson<AttributeUpdate>,
) -> Result<Json<Attribute>, ApiError> {
    state
        .store
        .mutate(move |c| c.update_attribute(&attribute_id, update).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn delete_attribute<S: Store>(
    State(state): State<AppState<S>>,
    Path(attribute_id): Path<Id>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .store
        .mutate(move |c| c.delete_attribute(&attribute_id))
        .await
        .map_err(store_error)?;
    Ok(message(format!("Attribute {} deleted successfully", deleted.id)))
}

// Attribute options

#[derive(Debug, Deserialize)]
pub struct ReorderOptions {
    pub codes: Vec<String>,
}

pub async fn list_attribute_options<S: Store>(
    State(state): State<AppState<S>>,
    Path(attribute_id): Path<Id>,
) -> Result<Json<Vec<AttributeOption>>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let attribute = catalog.attributes().get(&attribute_id).map_err(|e| catalog_error(&e))?;
    let mut options = attribute.options.clone();
    // Unordered options go last, in insertion order
    options.sort_by_key(|o| o.sort_order.unwrap_or(u32::MAX));
    Ok(Json(options))
}

pub async fn add_attribute_option<S: Store>(
    State(state): State<AppState<S>>,
    Path(attribute_id): Path<Id>,
    RequestJson(option): RequestJson<AttributeOption>,
) -> Result<Json<Attribute>, ApiError> {
    state
        .store
        .mutate(move |c| c.add_attribute_option(&attribute_id, option).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn get_attribute_option<S: Store>(
    State(state): State<AppState<S>>,
    Path((attribute_id, code)): Path<(Id, String)>,
) -> Result<Json<AttributeOption>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let attribute = catalog.attributes().get(&attribute_id).map_err(|e| catalog_error(&e))?;
    attribute
        .options
        .iter()
        .find(|o| o.code == code)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            catalog_error(&CatalogError::OptionNotFound {
                attribute: attribute_id.clone(),
                option: code.clone(),
            })
        })
}

pub async fn update_attribute_option<S: Store>(
    State(state): State<AppState<S>>,
    Path((attribute_id, code)): Path<(Id, String)>,
    RequestJson(option): RequestJson<AttributeOption>,
) -> Result<Json<Attribute>, ApiError> {
    state
        .store
        .mutate(move |c| c.update_attribute_option(&attribute_id, &code, option).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn delete_attribute_option<S: Store>(
    State(state): State<AppState<S>>,
    Path((attribute_id, code)): Path<(Id, String)>,
) -> Result<Json<Attribute>, ApiError> {
    state
        .store
        .mutate(move |c| c.remove_attribute_option(&attribute_id, &code).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn reorder_attribute_options<S: Store>(
    State(state): State<AppState<S>>,
    Path(attribute_id): Path<Id>,
    RequestJson(order): RequestJson<ReorderOptions>,
) -> Result<Json<Attribute>, ApiError> {
    state
        .store
        .mutate(move |c| c.reorder_attribute_options(&attribute_id, &order.codes).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

// Categories

#[derive(Debug, Default, Deserialize)]
pub struct CategoryListQuery {
    /// Only top-level categories
    pub roots: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCategoryQuery {
    pub policy: DeletePolicy,
}

#[derive(Debug, Serialize)]
pub struct DeletedCategories {
    pub deleted: Vec<Id>,
}

fn resolve_categories(catalog: &Catalog, ids: &[Id]) -> Vec<Category> {
    ids.iter()
        .filter_map(|id| catalog.categories().get(id).ok())
        .cloned()
        .collect()
}

pub async fn list_categories<S: Store>(
    State(state): State<AppState<S>>,
    Query(query): Query<CategoryListQuery>,
) -> Result<Json<ListResponse<Category>>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let categories = if query.roots.unwrap_or(false) {
        catalog.categories().roots()
    } else {
        catalog.categories().list()
    };
    Ok(Json(ListResponse::new(categories.into_iter().cloned().collect())))
}

pub async fn create_category<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(new_category): RequestJson<NewCategory>,
) -> Result<Json<Category>, ApiError> {
    let (category, parent_id) = new_category.into_category();
    state
        .store
        .mutate(move |c| c.insert_category(category, parent_id.as_deref()).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn get_category<S: Store>(
    State(state): State<AppState<S>>,
    Path(category_id): Path<Id>,
) -> Result<Json<Category>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let category = catalog.categories().get(&category_id).map_err(|e| catalog_error(&e))?;
    Ok(Json(category.clone()))
}

pub async fn update_category<S: Store>(
    State(state): State<AppState<S>>,
    Path(category_id): Path<Id>,
    RequestJson(update): RequestJson<CategoryUpdate>,
) -> Result<Json<Category>, ApiError> {
    state
        .store
        .mutate(move |c| c.update_category(&category_id, update).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn move_category<S: Store>(
    State(state): State<AppState<S>>,
    Path(category_id): Path<Id>,
    RequestJson(target): RequestJson<MoveCategory>,
) -> Result<Json<Category>, ApiError> {
    state
        .store
        .mutate(move |c| c.move_category(&category_id, target.parent_id.as_deref()).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn delete_category<S: Store>(
    State(state): State<AppState<S>>,
    Path(category_id): Path<Id>,
    Query(query): Query<DeleteCategoryQuery>,
) -> Result<Json<DeletedCategories>, ApiError> {
    let deleted = state
        .store
        .mutate(move |c| c.delete_category(&category_id, query.policy))
        .await
        .map_err(store_error)?;
    Ok(Json(DeletedCategories { deleted }))
}

pub async fn category_ancestors<S: Store>(
    State(state): State<AppState<S>>,
    Path(category_id): Path<Id>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let ids = catalog
        .categories()
        .ancestors_of(&category_id)
        .map_err(|e| catalog_error(&e))?;
    Ok(Json(resolve_categories(&catalog, &ids)))
}

pub async fn category_descendants<S: Store>(
    State(state): State<AppState<S>>,
    Path(category_id): Path<Id>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let ids = catalog
        .categories()
        .descendants_of(&category_id)
        .map_err(|e| catalog_error(&e))?;
    Ok(Json(resolve_categories(&catalog, &ids)))
}

pub async fn category_children<S: Store>(
    State(state): State<AppState<S>>,
    Path(category_id): Path<Id>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let children = catalog
        .categories()
        .children_of(&category_id)
        .map_err(|e| catalog_error(&e))?;
    Ok(Json(children.into_iter().cloned().collect()))
}

// Families

pub async fn list_families<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<ListResponse<Family>>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let families = catalog.families().list().into_iter().cloned().collect();
    Ok(Json(ListResponse::new(families)))
}

pub async fn create_family<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(new_family): RequestJson<NewFamily>,
) -> Result<Json<Family>, ApiError> {
    let family = Family::from_new(new_family);
    state
        .store
        .mutate(move |c| c.define_family(family).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn get_family<S: Store>(
    State(state): State<AppState<S>>,
    Path(family_id): Path<Id>,
) -> Result<Json<Family>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let family = catalog.families().get(&family_id).map_err(|e| catalog_error(&e))?;
    Ok(Json(family.clone()))
}

pub async fn update_family<S: Store>(
    State(state): State<AppState<S>>,
    Path(family_id): Path<Id>,
    RequestJson(update): RequestJson<FamilyUpdate>,
) -> Result<Json<Family>, ApiError> {
    state
        .store
        .mutate(move |c| c.update_family(&family_id, update).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn delete_family<S: Store>(
    State(state): State<AppState<S>>,
    Path(family_id): Path<Id>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .store
        .mutate(move |c| c.delete_family(&family_id))
        .await
        .map_err(store_error)?;
    Ok(message(format!("Family {} deleted successfully", deleted.id)))
}

pub async fn family_required_attributes<S: Store>(
    State(state): State<AppState<S>>,
    Path(family_id): Path<Id>,
) -> Result<Json<Vec<FamilyAttribute>>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let required = catalog
        .families()
        .required_attributes(&family_id)
        .map_err(|e| catalog_error(&e))?;
    Ok(Json(required.into_iter().cloned().collect()))
}

// Family variants

#[derive(Debug, Deserialize)]
pub struct LevelQuery {
    #[serde(default)]
    pub level: usize,
}

#[derive(Debug, Serialize)]
pub struct LevelAttributes {
    pub family_variant_id: Id,
    pub level: usize,
    pub attributes: Vec<Id>,
}

pub async fn list_family_variants<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<ListResponse<FamilyVariant>>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let variants = catalog.family_variants().list().into_iter().cloned().collect();
    Ok(Json(ListResponse::new(variants)))
}

pub async fn create_family_variant<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(new_variant): RequestJson<NewFamilyVariant>,
) -> Result<Json<FamilyVariant>, ApiError> {
    let variant = FamilyVariant::from_new(new_variant);
    state
        .store
        .mutate(move |c| c.define_family_variant(variant).cloned())
        .await
        .map(Json)
        .map_err(store_error)
}

pub async fn get_family_variant<S: Store>(
    State(state): State<AppState<S>>,
    Path(variant_id): Path<Id>,
) -> Result<Json<FamilyVariant>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let variant = catalog
        .family_variants()
        .get(&variant_id)
        .map_err(|e| catalog_error(&e))?;
    Ok(Json(variant.clone()))
}

pub async fn delete_family_variant<S: Store>(
    State(state): State<AppState<S>>,
    Path(variant_id): Path<Id>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state
        .store
        .mutate(move |c| c.delete_family_variant(&variant_id))
        .await
        .map_err(store_error)?;
    Ok(message(format!("Family variant {} deleted successfully", deleted.id)))
}

pub async fn family_variant_attributes<S: Store>(
    State(state): State<AppState<S>>,
    Path(variant_id): Path<Id>,
    Query(query): Query<LevelQuery>,
) -> Result<Json<LevelAttributes>, ApiError> {
    let catalog = snapshot(&state.store).await?;
    let attributes = catalog
        .attributes_at_or_above_level(&variant_id, query.level)
        .map_err(|e| catalog_error(&e))?;
    Ok(Json(LevelAttributes {
        family_variant_id: variant_id,
        level: query.level,
        attributes,
    }))
}

// Product models

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub page: Option<usize>,
    pub size: Option<usize>,
    pub search: Option<String>,
    pub family_variant_id: Option<Id>,
    pub parent_id: Option<Id>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub instance: NewProductInstance,
    /// Overrides the configured channels for this request
    pub channels: Option<Vec<String>>,
    /// Overrides the configured locales for this request
    pub locales: Option<Vec<String>>,
}

fn page_bounds(page: Option<usize>, size: Option<usize>) -> Result<(usize, usize), ApiError> {
    let page = page.unwrap_or(1);
    let size = size.unwrap_or(20);
    if page == 0 {
        return Err(invalid_input("page must be at least 1"));
    }
    if size == 0 || size > MAX_PAGE_SIZE {
        return Err(invalid_input(&format!(
            "size must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok((page, size))
}

/// Ancestors (parent first) and siblings of `instance` as currently stored
async fn hierarchy_of<S: Store>(
    store: &S,
    instance: &ProductInstance,
) -> anyhow::Result<(Vec<ProductInstance>, Vec<ProductInstance>)> {
    let mut ancestors: Vec<ProductInstance> = Vec::new();
    let mut seen = HashSet::from([instance.id.clone()]);
    let mut next = instance.parent_id.clone();
    while let Some(parent_id) = next {
        if ancestors.len() >= MAX_HIERARCHY_DEPTH || !seen.insert(parent_id.clone()) {
            break;
        }
        match store.get_product(&parent_id).await? {
            Some(parent) => {
                next = parent.parent_id.clone();
                ancestors.push(parent);
            }
            None => break,
        }
    }

    let siblings = match &instance.parent_id {
        Some(parent_id) => store
            .children_of(parent_id)
            .await?
            .into_iter()
            .filter(|s| s.id != instance.id)
            .collect(),
        None => Vec::new(),
    };
    Ok((ancestors, siblings))
}

async fn verdict_for<S: Store>(
    store: &S,
    instance: &ProductInstance,
    settings: &ChannelLocales,
) -> Result<Verdict, ApiError> {
    let catalog = snapshot(store).await?;
    let (ancestors, siblings) = hierarchy_of(store, instance).await.map_err(store_error)?;
    Ok(catalog.validate(
        instance,
        &VariantContext::new(&ancestors, &siblings),
        settings,
    ))
}

/// Structural checks shared by create and update before validation runs
async fn check_references<S: Store>(store: &S, instance: &ProductInstance) -> Result<(), ApiError> {
    if let Some(existing) = store
        .find_product_by_code(&instance.code)
        .await
        .map_err(store_error)?
    {
        if existing.id != instance.id {
            return Err(catalog_error(&CatalogError::DuplicateProduct(
                instance.code.clone(),
            )));
        }
    }
    match &instance.parent_id {
        Some(parent_id) => {
            if parent_id == &instance.id {
                return Err(invalid_input("an instance cannot be its own parent"));
            }
            let parent = store
                .get_product(parent_id)
                .await
                .map_err(store_error)?
                .ok_or_else(|| catalog_error(&CatalogError::ProductNotFound(parent_id.clone())))?;
            check_parent(instance, &parent)
        }
        None if instance.level > 0 => Err(invalid_input("a variant needs a parent_id")),
        None => Ok(()),
    }
}

/// A variant at level n hangs below an instance of its own family variant
/// at level n - 1
fn check_parent(instance: &ProductInstance, parent: &ProductInstance) -> Result<(), ApiError> {
    if instance.level == 0 {
        return Ok(());
    }
    let reason = if parent.family_variant_id != instance.family_variant_id {
        Some("the parent belongs to another family variant".to_string())
    } else if parent.level + 1 != instance.level {
        Some(format!("the parent is at level {}", parent.level))
    } else {
        None
    };
    match reason {
        Some(reason) => Err(catalog_error(&CatalogError::InvalidParent {
            product: instance.id.clone(),
            parent: parent.id.clone(),
            level: instance.level,
            reason,
        })),
        None => Ok(()),
    }
}

/// Each (attribute, scope, locale) key may carry one value
fn check_value_keys(values: &[ProductValue]) -> Result<(), ApiError> {
    match ProductValue::first_repeated(values) {
        Some(value) => Err(invalid_input(&format!(
            "attribute '{}' has more than one value for scope {:?} and locale {:?}",
            value.attribute, value.scope, value.locale
        ))),
        None => Ok(()),
    }
}

pub async fn list_product_models<S: Store>(
    State(state): State<AppState<S>>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Page<ProductInstance>>, ApiError> {
    let (page, size) = page_bounds(query.page, query.size)?;
    let filter = ProductFilter {
        search: query.search,
        family_variant_id: query.family_variant_id,
        parent_id: query.parent_id,
    };
    let instances = state
        .store
        .list_products(&filter)
        .await
        .map_err(store_error)?;
    Ok(Json(Page::paginate(instances, page, size)))
}

pub async fn create_product_model<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(new_instance): RequestJson<NewProductInstance>,
) -> Result<Json<ProductInstance>, ApiError> {
    check_value_keys(&new_instance.values)?;
    let instance = ProductInstance::from_new(new_instance);
    if state
        .store
        .get_product(&instance.id)
        .await
        .map_err(store_error)?
        .is_some()
    {
        return Err(catalog_error(&CatalogError::DuplicateProduct(
            instance.id.clone(),
        )));
    }
    check_references(&state.store, &instance).await?;

    let verdict = verdict_for(&state.store, &instance, &state.settings).await?;
    if !verdict.is_valid() {
        return Err(rejected(verdict));
    }

    state
        .store
        .upsert_product(instance.clone())
        .await
        .map_err(store_error)?;
    Ok(Json(instance))
}

pub async fn get_product_model<S: Store>(
    State(state): State<AppState<S>>,
    Path(instance_id): Path<Id>,
) -> Result<Json<ProductInstance>, ApiError> {
    state
        .store
        .get_product(&instance_id)
        .await
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| catalog_error(&CatalogError::ProductNotFound(instance_id)))
}

pub async fn update_product_model<S: Store>(
    State(state): State<AppState<S>>,
    Path(instance_id): Path<Id>,
    RequestJson(update): RequestJson<ProductInstanceUpdate>,
) -> Result<Json<ProductInstance>, ApiError> {
    if let Some(values) = &update.values {
        check_value_keys(values)?;
    }
    let mut instance = state
        .store
        .get_product(&instance_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| catalog_error(&CatalogError::ProductNotFound(instance_id.clone())))?;
    instance.apply_update(update);
    check_references(&state.store, &instance).await?;

    let verdict = verdict_for(&state.store, &instance, &state.settings).await?;
    if !verdict.is_valid() {
        return Err(rejected(verdict));
    }

    state
        .store
        .upsert_product(instance.clone())
        .await
        .map_err(store_error)?;
    Ok(Json(instance))
}

pub async fn delete_product_model<S: Store>(
    State(state): State<AppState<S>>,
    Path(instance_id): Path<Id>,
) -> Result<Json<MessageResponse>, ApiError> {
    let children = state
        .store
        .children_of(&instance_id)
        .await
        .map_err(store_error)?;
    if !children.is_empty() {
        return Err(catalog_error(&CatalogError::ProductHasChildren {
            product: instance_id,
            children: children.len(),
        }));
    }
    if !state
        .store
        .delete_product(&instance_id)
        .await
        .map_err(store_error)?
    {
        return Err(catalog_error(&CatalogError::ProductNotFound(instance_id)));
    }
    Ok(message(format!(
        "Product model {} deleted successfully",
        instance_id
    )))
}

pub async fn product_model_children<S: Store>(
    State(state): State<AppState<S>>,
    Path(instance_id): Path<Id>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<ProductInstance>>, ApiError> {
    let (page, size) = page_bounds(query.page, query.size)?;
    if state
        .store
        .get_product(&instance_id)
        .await
        .map_err(store_error)?
        .is_none()
    {
        return Err(catalog_error(&CatalogError::ProductNotFound(instance_id)));
    }
    let children = state
        .store
        .children_of(&instance_id)
        .await
        .map_err(store_error)?;
    Ok(Json(Page::paginate(children, page, size)))
}

pub async fn validate_product_model<S: Store>(
    State(state): State<AppState<S>>,
    Path(instance_id): Path<Id>,
) -> Result<Json<Verdict>, ApiError> {
    let instance = state
        .store
        .get_product(&instance_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| catalog_error(&CatalogError::ProductNotFound(instance_id.clone())))?;
    verdict_for(&state.store, &instance, &state.settings)
        .await
        .map(Json)
}

pub async fn validate_instance<S: Store>(
    State(state): State<AppState<S>>,
    RequestJson(request): RequestJson<ValidateRequest>,
) -> Result<Json<Verdict>, ApiError> {
    if request.channels.as_ref().is_some_and(Vec::is_empty) {
        return Err(invalid_input("channels must not be empty"));
    }
    if request.locales.as_ref().is_some_and(Vec::is_empty) {
        return Err(invalid_input("locales must not be empty"));
    }
    check_value_keys(&request.instance.values)?;
    let instance = ProductInstance::from_new(request.instance);
    let settings = ChannelLocales {
        channels: request
            .channels
            .unwrap_or_else(|| state.settings.channels.clone()),
        locales: request
            .locales
            .unwrap_or_else(|| state.settings.locales.clone()),
    };
    verdict_for(&state.store, &instance, &settings)
        .await
        .map(Json)
}
