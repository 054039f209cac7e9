mod common;

use common::TestApp;
use std::sync::Arc;

use despensa_api::{
    entities::product,
    errors::ServiceError,
    events::EventSender,
    services::carts::{AddItemInput, CartOwner, CartService},
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

fn guest(session: &str) -> CartOwner {
    CartOwner::Guest(session.to_string())
}

#[tokio::test]
async fn adding_first_item_creates_cart_with_derived_totals() {
    let app = TestApp::new().await;
    let product = app.seed_product("Leche Entera 1L", dec!(1000)).await;

    let cart = app
        .state
        .services
        .carts
        .add_item(
            &guest("sess_totals"),
            AddItemInput {
                product_id: product.id,
                quantity: 2,
            },
        )
        .await
        .expect("add item");

    assert_eq!(cart.subtotal, dec!(2000));
    assert_eq!(cart.tax_total, dec!(380));
    assert_eq!(cart.total, dec!(2380));
    assert_eq!(cart.currency, "CLP");
    assert_eq!(cart.session_id.as_deref(), Some("sess_totals"));
    assert!(cart.customer_id.is_none());
    assert!(cart.expires_at.is_some(), "guest carts must carry an expiry");
}

#[tokio::test]
async fn customer_cart_never_expires() {
    let app = TestApp::new().await;
    let product = app.seed_product("Pan de Molde", dec!(2190)).await;
    let customer_id = Uuid::new_v4();

    let cart = app
        .state
        .services
        .carts
        .add_item(
            &CartOwner::Customer(customer_id),
            AddItemInput {
                product_id: product.id,
                quantity: 1,
            },
        )
        .await
        .expect("add item");

    assert_eq!(cart.customer_id, Some(customer_id));
    assert!(cart.session_id.is_none());
    assert!(cart.expires_at.is_none());
}

#[tokio::test]
async fn adding_same_product_increments_and_keeps_price_snapshot() {
    let app = TestApp::new().await;
    let product = app.seed_product("Aceite Vegetal 900ml", dec!(3490)).await;
    let owner = guest("sess_increment");

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
        .expect("first add");

    // Catalog price moves between the two adds
    let mut active: product::ActiveModel = product.clone().into();
    active.price = Set(dec!(3990));
    active.update(&*app.state.db).await.expect("reprice product");

    let cart = app
        .state
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
        .expect("second add");

    let with_items = app
        .state
        .services
        .carts
        .fetch(&owner)
        .await
        .expect("fetch")
        .expect("cart exists");

    assert_eq!(with_items.items.len(), 1);
    let line = &with_items.items[0].item;
    assert_eq!(line.quantity, 3);
    // The stored snapshot wins; the cart does not silently reprice
    assert_eq!(line.unit_price, dec!(3490));
    assert_eq!(line.line_total, dec!(10470));
    assert_eq!(cart.subtotal, dec!(10470));
}

#[tokio::test]
async fn adding_unknown_product_fails() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .carts
        .add_item(
            &guest("sess_unknown"),
            AddItemInput {
                product_id: Uuid::new_v4(),
                quantity: 1,
            },
        )
        .await
        .expect_err("must fail");

    assert!(matches!(err, ServiceError::ProductUnavailable(_)));
}

#[tokio::test]
async fn adding_inactive_product_fails() {
    let app = TestApp::new().await;
    let product = app.seed_inactive_product("Descontinuado", dec!(990)).await;

    let err = app
        .state
        .services
        .carts
        .add_item(
            &guest("sess_inactive"),
            AddItemInput {
                product_id: product.id,
                quantity: 1,
            },
        )
        .await
        .expect_err("must fail");

    assert!(matches!(err, ServiceError::ProductUnavailable(_)));
}

#[tokio::test]
async fn understocked_add_fails_and_leaves_cart_untouched() {
    let app = TestApp::new().await;
    let plenty = app.seed_product("Arroz Grado 1", dec!(1590)).await;
    let scarce = app
        .seed_tracked_product("Palta Hass kg", dec!(5990), 2)
        .await;
    let owner = guest("sess_stock");

    let before = app
        .state
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: plenty.id,
                quantity: 1,
            },
        )
        .await
        .expect("seed cart");

    let err = app
        .state
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: scarce.id,
                quantity: 5,
            },
        )
        .await
        .expect_err("understocked add must fail");
    assert!(matches!(err, ServiceError::ProductUnavailable(_)));

    let after = app
        .state
        .services
        .carts
        .fetch(&owner)
        .await
        .expect("fetch")
        .expect("cart exists");
    assert_eq!(after.items.len(), 1);
    assert_eq!(after.cart.subtotal, before.subtotal);
}

#[tokio::test]
async fn updating_quantity_recomputes_totals() {
    let app = TestApp::new().await;
    let product = app.seed_product("Fideos Spaghetti", dec!(1190)).await;
    let owner = guest("sess_update");

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

    let cart = app
        .state
        .services
        .carts
        .update_item(&owner, product.id, 4)
        .await
        .expect("update")
        .expect("cart still exists");

    assert_eq!(cart.subtotal, dec!(4760));
    let (_, tax, total) = despensa_api::services::carts::cart_totals(vec![(dec!(1190), 4)]);
    assert_eq!(cart.tax_total, tax);
    assert_eq!(cart.total, total);
}

#[tokio::test]
async fn updating_last_line_to_zero_deletes_the_cart() {
    let app = TestApp::new().await;
    let product = app.seed_product("Azucar 1kg", dec!(1290)).await;
    let owner = guest("sess_zero");

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

    let outcome = app
        .state
        .services
        .carts
        .update_item(&owner, product.id, 0)
        .await
        .expect("update to zero");
    assert!(outcome.is_none(), "cart should be gone");

    let fetched = app.state.services.carts.fetch(&owner).await.expect("fetch");
    assert!(fetched.is_none());
}

#[tokio::test]
async fn updating_an_absent_line_to_zero_is_a_silent_noop() {
    let app = TestApp::new().await;
    let product = app.seed_product("Fideos Spaghetti", dec!(1190)).await;
    let owner = guest("sess_zero_noop");

    // A service wired to a channel we hold, so emitted events are observable
    let (tx, mut rx) = mpsc::channel(8);
    let carts = CartService::new(
        app.state.db.clone(),
        Arc::new(EventSender::new(tx)),
    );

    carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: product.id,
                quantity: 2,
            },
        )
        .await
        .expect("add");
    while rx.try_recv().is_ok() {}

    let outcome = carts
        .update_item(&owner, Uuid::new_v4(), 0)
        .await
        .expect("update to zero");

    let cart = outcome.expect("cart survives");
    assert_eq!(cart.subtotal, dec!(2380));
    assert!(
        rx.try_recv().is_err(),
        "no removal event for a line that was never there"
    );
}

#[tokio::test]
async fn updating_without_a_cart_fails() {
    let app = TestApp::new().await;

    let err = app
        .state
        .services
        .carts
        .update_item(&guest("sess_nocart"), Uuid::new_v4(), 1)
        .await
        .expect_err("must fail");

    assert!(matches!(err, ServiceError::CartNotFound(_)));
}

#[tokio::test]
async fn removing_is_idempotent() {
    let app = TestApp::new().await;
    let keep = app.seed_product("Harina 1kg", dec!(1090)).await;
    let extra = app.seed_product("Levadura", dec!(450)).await;
    let owner = guest("sess_remove");

    for p in [&keep, &extra] {
        app.state
            .services
            .carts
            .add_item(
                &owner,
                AddItemInput {
                    product_id: p.id,
                    quantity: 1,
                },
            )
            .await
            .expect("add");
    }

    let outcome = app
        .state
        .services
        .carts
        .remove_item(&owner, extra.id)
        .await
        .expect("remove");
    assert!(!outcome.cart_deleted);
    assert_eq!(outcome.cart.as_ref().map(|c| c.subtotal), Some(dec!(1090)));

    // Second removal of the same line is a no-op
    let outcome = app
        .state
        .services
        .carts
        .remove_item(&owner, extra.id)
        .await
        .expect("remove again");
    assert!(!outcome.cart_deleted);

    // Removing the last line deletes the cart
    let outcome = app
        .state
        .services
        .carts
        .remove_item(&owner, keep.id)
        .await
        .expect("remove last");
    assert!(outcome.cart_deleted);

    // And removing against a missing cart is still fine
    let outcome = app
        .state
        .services
        .carts
        .remove_item(&owner, keep.id)
        .await
        .expect("remove with no cart");
    assert!(!outcome.cart_deleted);
    assert!(outcome.cart.is_none());
}

#[tokio::test]
async fn clearing_a_missing_cart_is_a_noop() {
    let app = TestApp::new().await;

    app.state
        .services
        .carts
        .clear(&guest("sess_clear_none"))
        .await
        .expect("clear without cart");
}

#[tokio::test]
async fn clear_deletes_cart_and_items() {
    let app = TestApp::new().await;
    let product = app.seed_product("Detergente 3L", dec!(6990)).await;
    let owner = guest("sess_clear");

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

    app.state.services.carts.clear(&owner).await.expect("clear");

    assert!(app
        .state
        .services
        .carts
        .fetch(&owner)
        .await
        .expect("fetch")
        .is_none());
    assert_eq!(
        app.state
            .services
            .carts
            .item_count(&owner)
            .await
            .expect("count"),
        0
    );
}

#[tokio::test]
async fn item_count_sums_quantities() {
    let app = TestApp::new().await;
    let a = app.seed_product("Tomates kg", dec!(1990)).await;
    let b = app.seed_product("Cebollas kg", dec!(1190)).await;
    let owner = guest("sess_count");

    app.state
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: a.id,
                quantity: 3,
            },
        )
        .await
        .expect("add a");
    app.state
        .services
        .carts
        .add_item(
            &owner,
            AddItemInput {
                product_id: b.id,
                quantity: 2,
            },
        )
        .await
        .expect("add b");

    let count = app
        .state
        .services
        .carts
        .item_count(&owner)
        .await
        .expect("count");
    assert_eq!(count, 5);
}

#[tokio::test]
async fn validating_a_missing_or_empty_cart_reports_empty() {
    let app = TestApp::new().await;

    let validation = app
        .state
        .services
        .carts
        .validate(&guest("sess_validate_none"))
        .await
        .expect("validate");

    assert!(!validation.valid);
    assert_eq!(validation.errors, vec!["Cart is empty".to_string()]);
    assert!(validation.updated_cart.is_none());
}

#[tokio::test]
async fn validation_reports_price_drift_with_corrected_snapshot() {
    let app = TestApp::new().await;
    let product = app.seed_product("Cafe Molido 250g", dec!(4990)).await;
    let owner = guest("sess_drift");

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

    let mut active: product::ActiveModel = product.clone().into();
    active.price = Set(dec!(5490));
    active.update(&*app.state.db).await.expect("reprice");

    let validation = app
        .state
        .services
        .carts
        .validate(&owner)
        .await
        .expect("validate");

    assert!(!validation.valid);
    assert_eq!(validation.errors.len(), 1);
    let snapshot = validation.updated_cart.expect("repaired snapshot");
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].unit_price, dec!(5490));
    assert_eq!(snapshot.subtotal, dec!(10980));

    // The stored cart itself is untouched by the read
    let stored = app
        .state
        .services
        .carts
        .fetch(&owner)
        .await
        .expect("fetch")
        .expect("cart exists");
    assert_eq!(stored.items[0].item.unit_price, dec!(4990));
}

#[tokio::test]
async fn validation_drops_unavailable_products_from_the_snapshot() {
    let app = TestApp::new().await;
    let good = app.seed_product("Te Ceylan", dec!(2290)).await;
    let doomed = app.seed_product("Producto Retirado", dec!(1590)).await;
    let owner = guest("sess_dropped");

    for p in [&good, &doomed] {
        app.state
            .services
            .carts
            .add_item(
                &owner,
                AddItemInput {
                    product_id: p.id,
                    quantity: 1,
                },
            )
            .await
            .expect("add");
    }

    let mut active: product::ActiveModel = doomed.clone().into();
    active.is_active = Set(false);
    active.update(&*app.state.db).await.expect("deactivate");

    let validation = app
        .state
        .services
        .carts
        .validate(&owner)
        .await
        .expect("validate");

    assert!(!validation.valid);
    let snapshot = validation.updated_cart.expect("repaired snapshot");
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].product_id, good.id);
    assert_eq!(snapshot.subtotal, dec!(2290));
}

#[tokio::test]
async fn validation_drops_understocked_products_from_the_snapshot() {
    let app = TestApp::new().await;
    let good = app.seed_product("Azucar 1kg", dec!(1390)).await;
    let scarce = app
        .seed_tracked_product("Palta Hass 1kg", dec!(5990), 4)
        .await;
    let owner = guest("sess_understocked");

    for (p, qty) in [(&good, 1), (&scarce, 3)] {
        app.state
            .services
            .carts
            .add_item(
                &owner,
                AddItemInput {
                    product_id: p.id,
                    quantity: qty,
                },
            )
            .await
            .expect("add");
    }

    // Stock sold down elsewhere after the add
    let mut active: product::ActiveModel = scarce.clone().into();
    active.inventory_quantity = Set(2);
    active.update(&*app.state.db).await.expect("sell down");

    let validation = app
        .state
        .services
        .carts
        .validate(&owner)
        .await
        .expect("validate");

    assert!(!validation.valid);
    assert_eq!(
        validation.errors,
        vec!["Only 2 units of Palta Hass 1kg available".to_string()]
    );
    let snapshot = validation.updated_cart.expect("repaired snapshot");
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].product_id, good.id);
    assert_eq!(snapshot.subtotal, dec!(1390));

    // The stored cart keeps both lines; validate never persists
    let stored = app
        .state
        .services
        .carts
        .fetch(&owner)
        .await
        .expect("fetch")
        .expect("cart exists");
    assert_eq!(stored.items.len(), 2);
}

#[tokio::test]
async fn valid_cart_has_no_snapshot() {
    let app = TestApp::new().await;
    let product = app.seed_product("Mantequilla 250g", dec!(2790)).await;
    let owner = guest("sess_valid");

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

    let validation = app
        .state
        .services
        .carts
        .validate(&owner)
        .await
        .expect("validate");

    assert!(validation.valid);
    assert!(validation.errors.is_empty());
    assert!(validation.updated_cart.is_none());
}

#[tokio::test]
async fn migrating_without_a_guest_cart_is_a_noop() {
    let app = TestApp::new().await;

    let outcome = app
        .state
        .services
        .carts
        .migrate_guest_cart("sess_ghost", Uuid::new_v4())
        .await
        .expect("migrate");

    assert!(!outcome.merged);
    assert!(!outcome.converted);
}

#[tokio::test]
async fn migration_converts_guest_cart_when_customer_has_none() {
    let app = TestApp::new().await;
    let product = app.seed_product("Queso Gauda kg", dec!(8990)).await;
    let owner = guest("sess_convert");
    let customer_id = Uuid::new_v4();

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

    let outcome = app
        .state
        .services
        .carts
        .migrate_guest_cart("sess_convert", customer_id)
        .await
        .expect("migrate");

    assert!(outcome.converted);
    assert!(!outcome.merged);

    // The guest identity no longer addresses a cart
    assert!(app
        .state
        .services
        .carts
        .fetch(&owner)
        .await
        .expect("fetch guest")
        .is_none());

    let converted = app
        .state
        .services
        .carts
        .fetch(&CartOwner::Customer(customer_id))
        .await
        .expect("fetch customer")
        .expect("customer cart exists");
    assert!(converted.cart.session_id.is_none());
    assert!(converted.cart.expires_at.is_none(), "conversion makes the cart permanent");
    assert_eq!(converted.items.len(), 1);
}

#[tokio::test]
async fn migration_merges_into_existing_customer_cart() {
    let app = TestApp::new().await;
    let a = app.seed_product("Producto A", dec!(1000)).await;
    let b = app.seed_product("Producto B", dec!(2000)).await;
    let c = app.seed_product("Producto C", dec!(3000)).await;
    let customer_id = Uuid::new_v4();
    let customer = CartOwner::Customer(customer_id);
    let session = guest("sess_merge");

    // Guest cart: A x2, B x1
    for (p, qty) in [(&a, 2), (&b, 1)] {
        app.state
            .services
            .carts
            .add_item(
                &session,
                AddItemInput {
                    product_id: p.id,
                    quantity: qty,
                },
            )
            .await
            .expect("guest add");
    }

    // Customer cart: B x3, C x1
    for (p, qty) in [(&b, 3), (&c, 1)] {
        app.state
            .services
            .carts
            .add_item(
                &customer,
                AddItemInput {
                    product_id: p.id,
                    quantity: qty,
                },
            )
            .await
            .expect("customer add");
    }

    let outcome = app
        .state
        .services
        .carts
        .migrate_guest_cart("sess_merge", customer_id)
        .await
        .expect("migrate");

    assert!(outcome.merged);
    assert!(!outcome.converted);

    let merged = app
        .state
        .services
        .carts
        .fetch(&customer)
        .await
        .expect("fetch")
        .expect("customer cart exists");

    assert_eq!(merged.items.len(), 3);
    let qty_of = |id: Uuid| {
        merged
            .items
            .iter()
            .find(|l| l.item.product_id == id)
            .map(|l| l.item.quantity)
    };
    assert_eq!(qty_of(a.id), Some(2));
    assert_eq!(qty_of(b.id), Some(4), "conflicting quantities sum");
    assert_eq!(qty_of(c.id), Some(1));

    // A(2x1000) + B(4x2000) + C(1x3000) = 13000
    assert_eq!(merged.cart.subtotal, dec!(13000));

    assert!(app
        .state
        .services
        .carts
        .fetch(&session)
        .await
        .expect("fetch guest")
        .is_none());
}
