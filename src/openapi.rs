use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Despensa API",
        version = "0.1.0",
        description = r#"
# Despensa Storefront API

Cart and order core for a Chilean grocery storefront. All monetary amounts
are integer Chilean pesos (CLP has no cents); IVA at 19% is derived from the
cart subtotal and rounded half away from zero.

## Cart identity

Carts belong either to a signed-in customer (`customer_id`) or to an
anonymous browser session (`session_id`). When a request carries both, the
customer id wins. Guest carts expire seven days after their last change.

## Error Handling

Errors use a consistent envelope with appropriate HTTP status codes:

```json
{
  "error": "Not Found",
  "message": "Cart not found",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "carts", description = "Cart ledger endpoints"),
        (name = "checkout", description = "Cart to order materialization"),
        (name = "orders", description = "Order history reads"),
        (name = "products", description = "Catalog endpoints")
    ),
    paths(
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_item,
        crate::handlers::carts::update_item,
        crate::handlers::carts::remove_item,
        crate::handlers::carts::clear_cart,
        crate::handlers::carts::item_count,
        crate::handlers::carts::validate_cart,
        crate::handlers::carts::migrate_cart,

        crate::handlers::checkout::complete_checkout,

        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,

        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
    ),
    components(
        schemas(
            crate::handlers::carts::AddItemRequest,
            crate::handlers::carts::UpdateItemRequest,
            crate::handlers::carts::ClearCartRequest,
            crate::handlers::carts::MigrateRequest,
            crate::handlers::checkout::CheckoutRequest,
            crate::services::products::CreateProductInput,
            crate::services::carts::CartValidation,
            crate::services::carts::CartSnapshot,
            crate::services::carts::MigrationOutcome,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
