use crate::{
    config::AppConfig,
    entities::{cart_item, order, order_item, CartItem, OrderModel, OrderStatus, Product},
    errors::ServiceError,
    events::{Event, EventSender},
    services::carts::{CartOwner, CartService},
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Checkout service: materializes a validated cart into an immutable order.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    carts: Arc<CartService>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
        carts: Arc<CartService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
            carts,
        }
    }

    /// Converts the owner's cart into an order.
    ///
    /// Re-validates the cart against the live catalog first and fails with
    /// the per-item problems when it is stale; the client repairs the cart
    /// and retries. On success the order and its line snapshots are
    /// inserted, tracked inventory is decremented and the cart deleted, all
    /// in one transaction. Note the validation read and the order write are
    /// two separate calls to the store: stock or prices can still move in
    /// between, in which case the availability re-check inside the
    /// transaction wins.
    #[instrument(skip(self, input))]
    pub async fn complete_checkout(
        &self,
        owner: &CartOwner,
        input: CheckoutInput,
    ) -> Result<OrderModel, ServiceError> {
        input.validate()?;

        let validation = self.carts.validate(owner).await?;
        if !validation.valid {
            return Err(ServiceError::ValidationError(validation.errors.join("; ")));
        }

        let txn = self.db.begin().await?;

        let cart = match owner {
            CartOwner::Customer(id) => {
                crate::entities::Cart::find()
                    .filter(crate::entities::cart::Column::CustomerId.eq(*id))
                    .one(&txn)
                    .await?
            }
            CartOwner::Guest(sid) => {
                crate::entities::Cart::find()
                    .filter(crate::entities::cart::Column::SessionId.eq(sid.as_str()))
                    .one(&txn)
                    .await?
            }
        }
        .ok_or_else(|| ServiceError::CartNotFound(format!("no cart for {:?}", owner)))?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::AddedAt)
            .all(&txn)
            .await?;

        if items.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }

        let shipping_total = shipping_for(&self.config, cart.subtotal);
        let total = cart.total + shipping_total;

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(format!(
                "DSP-{}",
                order_id.simple().to_string()[..8].to_uppercase()
            )),
            customer_id: Set(cart.customer_id),
            session_id: Set(cart.session_id.clone()),
            status: Set(OrderStatus::Pending),
            currency: Set(cart.currency.clone()),
            subtotal: Set(cart.subtotal),
            tax_total: Set(cart.tax_total),
            shipping_total: Set(shipping_total),
            total: Set(total),
            customer_email: Set(input.email),
            customer_name: Set(input.name),
            shipping_address: Set(input.address),
            shipping_comuna: Set(input.comuna),
            shipping_region: Set(input.region),
            phone: Set(input.phone),
            created_at: Set(now),
        };
        let order = order.insert(&txn).await?;

        for item in &items {
            let product = Product::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::ProductUnavailable(format!(
                        "Product {} not found",
                        item.product_id
                    ))
                })?;

            let order_item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                product_name: Set(product.name.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                line_total: Set(item.line_total),
                created_at: Set(now),
            };
            order_item.insert(&txn).await?;

            if product.track_inventory {
                if product.inventory_quantity < item.quantity {
                    return Err(ServiceError::ProductUnavailable(format!(
                        "Only {} units of {} available",
                        product.inventory_quantity, product.name
                    )));
                }
                let remaining = product.inventory_quantity - item.quantity;
                let mut active: crate::entities::product::ActiveModel = product.into();
                active.inventory_quantity = Set(remaining);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
        }

        // The cart is consumed by checkout
        let cart_id = cart.id;
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(&txn)
            .await?;
        crate::entities::Cart::delete_by_id(cart_id).exec(&txn).await?;

        txn.commit().await?;

        counter!("despensa_checkout_completed_total", 1);
        self.event_sender.send_or_log(Event::OrderCreated(order_id)).await;

        info!(
            "Order {} created from cart {}: total {} {}",
            order.order_number, cart_id, order.total, order.currency
        );
        Ok(order)
    }

}

/// Free shipping at or above the configured CLP threshold, flat rate below
/// it.
pub fn shipping_for(config: &AppConfig, subtotal: Decimal) -> Decimal {
    if subtotal >= Decimal::from(config.free_shipping_threshold_clp) {
        Decimal::ZERO
    } else if subtotal > Decimal::ZERO {
        Decimal::from(config.shipping_flat_rate_clp)
    } else {
        Decimal::ZERO
    }
}

/// Customer and shipping details captured at checkout
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CheckoutInput {
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
