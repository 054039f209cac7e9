mod common;

use common::TestApp;
use despensa_api::{
    entities::{OrderStatus, Product},
    errors::ServiceError,
    services::carts::{AddItemInput, CartOwner},
    services::checkout::CheckoutInput,
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

fn shipping_details() -> CheckoutInput {
    CheckoutInput {
        email: "ana@example.cl".to_string(),
        name: "Ana Rojas".to_string(),
        address: "Av. Italia 1439".to_string(),
        comuna: "Providencia".to_string(),
        region: "Metropolitana".to_string(),
        phone: Some("+56912345678".to_string()),
    }
}

#[tokio::test]
async fn checkout_materializes_the_cart_into_an_order() {
    let app = TestApp::new().await;
    let product = app.seed_product("Caja Mixta Verduras", dec!(20000)).await;
    let owner = CartOwner::Guest("sess_checkout".to_string());

    app.state
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: product.id,
                quantity: 2,
            },
        )
        .await
        .expect("add");

    let order = app
        .state
        .services
        .checkout
        .complete_checkout(&owner, shipping_details())
        .await
        .expect("checkout");

    assert!(order.order_number.starts_with("DSP-"));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.currency, "CLP");
    assert_eq!(order.subtotal, dec!(40000));
    assert_eq!(order.tax_total, dec!(7600));
    // At or above the free-shipping threshold
    assert_eq!(order.shipping_total, dec!(0));
    assert_eq!(order.total, dec!(47600));
    assert_eq!(order.customer_email, "ana@example.cl");

    // The cart is consumed
    assert!(app
        .state
        .services
        .carts
        .fetch(&owner)
        .await
        .expect("fetch")
        .is_none());

    // Line snapshots survive on the order
    let fetched = app
        .state
        .services
        .orders
        .get_order(order.id)
        .await
        .expect("get order");
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].product_name, "Caja Mixta Verduras");
    assert_eq!(fetched.items[0].quantity, 2);
    assert_eq!(fetched.items[0].unit_price, dec!(20000));
}

#[tokio::test]
async fn small_orders_pay_flat_shipping() {
    let app = TestApp::new().await;
    let product = app.seed_product("Leche Entera 1L", dec!(1000)).await;
    let owner = CartOwner::Guest("sess_small".to_string());

    app.state
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: product.id,
                quantity: 2,
            },
        )
        .await
        .expect("add");

    let order = app
        .state
        .services
        .checkout
        .complete_checkout(&owner, shipping_details())
        .await
        .expect("checkout");

    assert_eq!(order.subtotal, dec!(2000));
    assert_eq!(order.tax_total, dec!(380));
    assert_eq!(order.shipping_total, dec!(3990));
    assert_eq!(order.total, dec!(6370));
}

#[tokio::test]
async fn checkout_decrements_tracked_inventory() {
    let app = TestApp::new().await;
    let product = app
        .seed_tracked_product("Palta Hass kg", dec!(5990), 5)
        .await;
    let owner = CartOwner::Guest("sess_stock".to_string());

    app.state
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: product.id,
                quantity: 2,
            },
        )
        .await
        .expect("add");

    app.state
        .services
        .checkout
        .complete_checkout(&owner, shipping_details())
        .await
        .expect("checkout");

    let remaining = Product::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .expect("query")
        .expect("product exists");
    assert_eq!(remaining.inventory_quantity, 3);
}

#[tokio::test]
async fn checkout_without_a_cart_fails_validation() {
    let app = TestApp::new().await;
    let owner = CartOwner::Guest("sess_nocart".to_string());

    let err = app
        .state
        .services
        .checkout
        .complete_checkout(&owner, shipping_details())
        .await
        .expect_err("must fail");

    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn stale_cart_blocks_checkout_and_survives() {
    let app = TestApp::new().await;
    let product = app.seed_product("Cafe Molido 250g", dec!(4990)).await;
    let owner = CartOwner::Guest("sess_stale".to_string());

    app.state
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: product.id,
                quantity: 1,
            },
        )
        .await
        .expect("add");

    let mut active: despensa_api::entities::product::ActiveModel = product.clone().into();
    active.price = Set(dec!(5490));
    active.update(&*app.state.db).await.expect("reprice");

    let err = app
        .state
        .services
        .checkout
        .complete_checkout(&owner, shipping_details())
        .await
        .expect_err("stale cart must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // The cart is not consumed on a failed checkout
    assert!(app
        .state
        .services
        .carts
        .fetch(&owner)
        .await
        .expect("fetch")
        .is_some());
}

#[tokio::test]
async fn invalid_shipping_details_are_rejected_before_touching_the_cart() {
    let app = TestApp::new().await;
    let owner = CartOwner::Guest("sess_badinput".to_string());

    let mut details = shipping_details();
    details.email = "not-an-email".to_string();

    let err = app
        .state
        .services
        .checkout
        .complete_checkout(&owner, details)
        .await
        .expect_err("must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn order_history_lists_customer_orders() {
    let app = TestApp::new().await;
    let product = app.seed_product("Pan Integral", dec!(2590)).await;
    let customer_id = Uuid::new_v4();
    let owner = CartOwner::Customer(customer_id);

    app.state
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: product.id,
                quantity: 1,
            },
        )
        .await
        .expect("add");

    let order = app
        .state
        .services
        .checkout
        .complete_checkout(&owner, shipping_details())
        .await
        .expect("checkout");

    let (orders, total) = app
        .state
        .services
        .orders
        .list_for_customer(customer_id, 1, 20)
        .await
        .expect("list");

    assert_eq!(total, 1);
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, order.id);
    assert_eq!(orders[0].customer_id, Some(customer_id));
}
