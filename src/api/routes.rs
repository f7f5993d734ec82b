use axum::{
    routing::{get, post, put},
    Router,
};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(handlers::root::<S>))
        .route("/health", get(handlers::health_check::<S>))
        .nest("/api/v1", api_routes::<S>())
}

fn api_routes<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(handlers::health_check::<S>))
        // Attributes and their options
        .route(
            "/attributes",
            get(handlers::list_attributes::<S>).post(handlers::create_attribute::<S>),
        )
        .route(
            "/attributes/:attribute_id",
            get(handlers::get_attribute::<S>)
                .patch(handlers::update_attribute::<S>)
                .delete(handlers::delete_attribute::<S>),
        )
        .route(
            "/attributes/:attribute_id/options",
            get(handlers::list_attribute_options::<S>).post(handlers::add_attribute_option::<S>),
        )
        .route(
            "/attributes/:attribute_id/options/reorder",
            put(handlers::reorder_attribute_options::<S>),
        )
        .route(
            "/attributes/:attribute_id/options/:code",
            get(handlers::get_attribute_option::<S>)
                .put(handlers::update_attribute_option::<S>)
                .delete(handlers::delete_attribute_option::<S>),
        )
        // Category tree
        .route(
            "/categories",
            get(handlers::list_categories::<S>).post(handlers::create_category::<S>),
        )
        .route(
            "/categories/:category_id",
            get(handlers::get_category::<S>)
                .patch(handlers::update_category::<S>)
                .delete(handlers::delete_category::<S>),
        )
        .route("/categories/:category_id/move", post(handlers::move_category::<S>))
        .route(
            "/categories/:category_id/ancestors",
            get(handlers::category_ancestors::<S>),
        )
        .route(
            "/categories/:category_id/descendants",
            get(handlers::category_descendants::<S>),
        )
        .route(
            "/categories/:category_id/children",
            get(handlers::category_children::<S>),
        )
        // Families
        .route(
            "/families",
            get(handlers::list_families::<S>).post(handlers::create_family::<S>),
        )
        .route(
            "/families/:family_id",
            get(handlers::get_family::<S>)
                .put(handlers::update_family::<S>)
                .delete(handlers::delete_family::<S>),
        )
        .route(
            "/families/:family_id/required-attributes",
            get(handlers::family_required_attributes::<S>),
        )
        // Family variants
        .route(
            "/family-variants",
            get(handlers::list_family_variants::<S>).post(handlers::create_family_variant::<S>),
        )
        .route(
            "/family-variants/:variant_id",
            get(handlers::get_family_variant::<S>).delete(handlers::delete_family_variant::<S>),
        )
        .route(
            "/family-variants/:variant_id/attributes",
            get(handlers::family_variant_attributes::<S>),
        )
        // Product models, products and variants
        .route(
            "/product-models",
            get(handlers::list_product_models::<S>).post(handlers::create_product_model::<S>),
        )
        .route(
            "/product-models/:instance_id",
            get(handlers::get_product_model::<S>)
                .put(handlers::update_product_model::<S>)
                .delete(handlers::delete_product_model::<S>),
        )
        .route(
            "/product-models/:instance_id/children",
            get(handlers::product_model_children::<S>),
        )
        .route(
            "/product-models/:instance_id/validate",
            get(handlers::validate_product_model::<S>),
        )
        .route("/validate", post(handlers::validate_instance::<S>))
}
