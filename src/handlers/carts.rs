use crate::handlers::common::{no_content_response, success_response, validate_input};
use crate::{
    errors::ServiceError,
    services::carts::{AddItemInput, CartOwner},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(add_item))
        .route("/items/:product_id", put(update_item))
        .route("/items/:product_id", delete(remove_item))
        .route("/clear", post(clear_cart))
        .route("/count", get(item_count))
        .route("/validate", get(validate_cart))
        .route("/migrate", post(migrate_cart))
}

/// Cart identity carried on read requests. Exactly one of the two fields
/// addresses the cart; `customer_id` wins when both are sent.
#[derive(Debug, Deserialize, IntoParams)]
pub struct OwnerQuery {
    pub customer_id: Option<Uuid>,
    pub session_id: Option<String>,
}

impl OwnerQuery {
    fn owner(self) -> Result<CartOwner, ServiceError> {
        CartOwner::resolve(self.customer_id, self.session_id)
    }
}

/// Get the owner's cart with its items
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    params(OwnerQuery),
    responses(
        (status = 200, description = "Cart with items, or an empty shape when no cart exists"),
        (status = 400, description = "Neither customer_id nor session_id given", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let owner = query.owner()?;
    match state.services.carts.fetch(&owner).await? {
        Some(cart) => Ok(success_response(cart)),
        None => Ok(success_response(serde_json::json!({
            "cart": null,
            "items": []
        }))),
    }
}

/// Add a product to the cart, creating the cart on first use
#[utoipa::path(
    post,
    path = "/api/v1/cart/items",
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart"),
        (status = 422, description = "Product inactive, missing or understocked", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let owner = CartOwner::resolve(payload.customer_id, payload.session_id)?;

    let cart = state
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: payload.product_id,
                quantity: payload.quantity,
            },
        )
        .await?;

    Ok(success_response(cart))
}

/// Set a line's quantity; zero removes the line
#[utoipa::path(
    put,
    path = "/api/v1/cart/items/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id of the line")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Updated cart, or cart_deleted when the last line was removed"),
        (status = 404, description = "No cart for this owner", body = crate::errors::ErrorResponse)
    ),
    tag = "carts"
)]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let owner = CartOwner::resolve(payload.customer_id, payload.session_id)?;

    match state
        .services
        .carts
        .update_item(&owner, product_id, payload.quantity)
        .await?
    {
        Some(cart) => Ok(success_response(cart)),
        None => Ok(success_response(
            serde_json::json!({ "cart_deleted": true }),
        )),
    }
}

/// Remove a line from the cart. Idempotent.
#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product id of the line"),
        OwnerQuery
    ),
    responses((status = 204, description = "Line removed or already absent")),
    tag = "carts"
)]
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<OwnerQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let owner = query.owner()?;
    state.services.carts.remove_item(&owner, product_id).await?;
    Ok(no_content_response())
}

/// Remove every line and delete the cart
#[utoipa::path(
    post,
    path = "/api/v1/cart/clear",
    request_body = ClearCartRequest,
    responses((status = 200, description = "Cart cleared")),
    tag = "carts"
)]
pub async fn clear_cart(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ClearCartRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let owner = CartOwner::resolve(payload.customer_id, payload.session_id)?;
    state.services.carts.clear(&owner).await?;
    Ok(success_response(serde_json::json!({
        "message": "Cart cleared"
    })))
}

/// Total units across the cart, for the header badge
#[utoipa::path(
    get,
    path = "/api/v1/cart/count",
    params(OwnerQuery),
    responses((status = 200, description = "Unit count, zero when no cart exists")),
    tag = "carts"
)]
pub async fn item_count(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let owner = query.owner()?;
    let count = state.services.carts.item_count(&owner).await?;
    Ok(success_response(serde_json::json!({ "count": count })))
}

/// Validate the cart against the live catalog
#[utoipa::path(
    get,
    path = "/api/v1/cart/validate",
    params(OwnerQuery),
    responses((status = 200, description = "Validation verdict", body = crate::services::carts::CartValidation)),
    tag = "carts"
)]
pub async fn validate_cart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let owner = query.owner()?;
    let validation = state.services.carts.validate(&owner).await?;
    Ok(success_response(validation))
}

/// Move a guest cart to a signed-in customer, merging when both exist
#[utoipa::path(
    post,
    path = "/api/v1/cart/migrate",
    request_body = MigrateRequest,
    responses((status = 200, description = "Migration outcome", body = crate::services::carts::MigrationOutcome)),
    tag = "carts"
)]
pub async fn migrate_cart(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MigrateRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let outcome = state
        .services
        .carts
        .migrate_guest_cart(&payload.session_id, payload.customer_id)
        .await?;
    Ok(success_response(outcome))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub customer_id: Option<Uuid>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub quantity: i32,
    pub customer_id: Option<Uuid>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClearCartRequest {
    pub customer_id: Option<Uuid>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MigrateRequest {
    #[validate(length(min = 1))]
    pub session_id: String,
    pub customer_id: Uuid,
}
