use crate::handlers::common::{created_response, validate_input};
use crate::{
    errors::ServiceError,
    services::carts::CartOwner,
    services::checkout::CheckoutInput,
    AppState,
};
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for checkout
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(complete_checkout))
}

/// Materialize the owner's cart into an order
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created; the cart is consumed"),
        (status = 400, description = "Cart failed validation", body = crate::errors::ErrorResponse),
        (status = 404, description = "No cart for this owner", body = crate::errors::ErrorResponse)
    ),
    tag = "checkout"
)]
pub async fn complete_checkout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let owner = CartOwner::resolve(payload.customer_id, payload.session_id)?;

    let order = state
        .services
        .checkout
        .complete_checkout(
            &owner,
            CheckoutInput {
                email: payload.email,
                name: payload.name,
                address: payload.address,
                comuna: payload.comuna,
                region: payload.region,
                phone: payload.phone,
            },
        )
        .await?;

    Ok(created_response(order))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    pub customer_id: Option<Uuid>,
    pub session_id: Option<String>,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1))]
    pub comuna: String,
    #[validate(length(min = 1))]
    pub region: String,
    pub phone: Option<String>,
}
