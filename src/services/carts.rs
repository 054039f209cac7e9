use crate::{
    entities::{cart, cart_item, Cart, CartItem, CartModel, Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Chilean IVA, fixed for this domain.
pub const IVA_RATE: Decimal = dec!(0.19);

/// The only currency the storefront deals in. Zero decimal places.
pub const CURRENCY: &str = "CLP";

/// Guest carts expire this many days after creation or last update.
pub const GUEST_CART_TTL_DAYS: i64 = 7;

/// Identity a cart belongs to. A cart is either customer-owned (permanent)
/// or guest-owned (ephemeral session), never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    Customer(Uuid),
    Guest(String),
}

impl CartOwner {
    /// Resolves the cart owner from request identity. An authenticated
    /// customer id always wins over a guest session id when both are sent.
    pub fn resolve(
        customer_id: Option<Uuid>,
        session_id: Option<String>,
    ) -> Result<Self, ServiceError> {
        match (customer_id, session_id) {
            (Some(id), _) => Ok(CartOwner::Customer(id)),
            (None, Some(sid)) if !sid.trim().is_empty() => Ok(CartOwner::Guest(sid)),
            _ => Err(ServiceError::InvalidInput(
                "a customer_id or session_id is required to address a cart".to_string(),
            )),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, CartOwner::Guest(_))
    }

    fn select(&self) -> Select<Cart> {
        match self {
            CartOwner::Customer(id) => Cart::find().filter(cart::Column::CustomerId.eq(*id)),
            CartOwner::Guest(sid) => Cart::find().filter(cart::Column::SessionId.eq(sid.as_str())),
        }
    }
}

/// Computes `(subtotal, tax, total)` over `(unit_price, quantity)` lines.
///
/// Subtotal is the sum of price x quantity; IVA is 19% of the subtotal
/// rounded half-up to whole pesos; total is their sum.
pub fn cart_totals<I>(lines: I) -> (Decimal, Decimal, Decimal)
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    let subtotal: Decimal = lines
        .into_iter()
        .map(|(price, qty)| price * Decimal::from(qty))
        .sum();
    let tax = (subtotal * IVA_RATE).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    (subtotal, tax, subtotal + tax)
}

/// Shopping cart service: the single writer for cart documents.
///
/// Every mutation runs in one database transaction that re-establishes the
/// derived-totals invariant before committing, so a concurrent reader never
/// observes an item list and totals that disagree. Across independent calls
/// the service is last-write-wins: two rapid mutations for the same owner
/// that read the same prior state can lose one increment. That limitation is
/// inherited from the original storefront and accepted here.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Retrieves the owner's cart with each line item joined to its current
    /// product record, or `None` when no cart exists.
    ///
    /// Read-only: stored line prices are surfaced as-is even when the live
    /// catalog price has moved. Staleness is reported by `validate`, never
    /// silently corrected here.
    #[instrument(skip(self))]
    pub async fn fetch(&self, owner: &CartOwner) -> Result<Option<CartWithItems>, ServiceError> {
        let Some(cart) = owner.select().one(&*self.db).await? else {
            return Ok(None);
        };

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::AddedAt)
            .find_also_related(Product)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|(item, product)| CartLine { item, product })
            .collect();

        Ok(Some(CartWithItems { cart, items }))
    }

    /// Adds a product to the owner's cart, creating the cart on first add.
    ///
    /// The product must exist, be active and have sufficient tracked stock,
    /// otherwise `ProductUnavailable`. If the product is already in the cart
    /// its quantity is incremented and `added_at` refreshed; the stored
    /// price snapshot is kept (a cart never silently reprices).
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        input: AddItemInput,
    ) -> Result<CartModel, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let product = available_product(&txn, input.product_id, input.quantity).await?;

        let cart = match owner.select().one(&txn).await? {
            Some(cart) => cart,
            None => self.create_cart(&txn, owner).await?,
        };

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .one(&txn)
            .await?;

        if let Some(item) = existing {
            let quantity = item.quantity + input.quantity;
            let unit_price = item.unit_price;
            let mut item: cart_item::ActiveModel = item.into();
            item.quantity = Set(quantity);
            item.line_total = Set(unit_price * Decimal::from(quantity));
            item.added_at = Set(Utc::now());
            item.update(&txn).await?;
        } else {
            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(input.product_id),
                quantity: Set(input.quantity),
                unit_price: Set(product.price),
                line_total: Set(product.price * Decimal::from(input.quantity)),
                added_at: Set(Utc::now()),
            };
            item.insert(&txn).await?;
        }

        let updated = self.recalculate_cart_totals(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: updated.id,
                product_id: input.product_id,
            })
            .await;

        info!(
            "Added {} x{} to cart {}",
            input.product_id, input.quantity, updated.id
        );
        Ok(updated)
    }

    /// Sets the quantity of a line item.
    ///
    /// A quantity of zero or less removes the line (and the cart itself when
    /// it was the last line, in which case `None` is returned). A positive
    /// quantity re-checks product availability and overwrites the quantity;
    /// the stored price snapshot is deliberately kept, matching `add_item`.
    /// Fails with `CartNotFound` when the owner has no cart.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        owner: &CartOwner,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Option<CartModel>, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = owner
            .select()
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::CartNotFound(format!("no cart for {:?}", owner)))?;

        if quantity <= 0 {
            let outcome = self.remove_line(&txn, cart, product_id).await?;
            txn.commit().await?;
            if outcome.removed > 0 {
                self.event_sender
                    .send_or_log(Event::CartItemRemoved {
                        cart_id: outcome.cart_id,
                        product_id,
                    })
                    .await;
            }
            return Ok(outcome.cart);
        }

        available_product(&txn, product_id, quantity).await?;

        let item = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("product {} is not in the cart", product_id))
            })?;

        let unit_price = item.unit_price;
        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.line_total = Set(unit_price * Decimal::from(quantity));
        item.update(&txn).await?;

        let updated = self.recalculate_cart_totals(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id: updated.id,
                product_id,
            })
            .await;

        Ok(Some(updated))
    }

    /// Removes a line item if present. Idempotent in both directions: a
    /// missing line and a missing cart are equally "nothing to remove".
    /// Removing the last line deletes the cart document entirely.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        owner: &CartOwner,
        product_id: Uuid,
    ) -> Result<RemoveItemOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        let Some(cart) = owner.select().one(&txn).await? else {
            return Ok(RemoveItemOutcome {
                cart_deleted: false,
                cart: None,
            });
        };

        let cart_id = cart.id;
        let removed = CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?
            .rows_affected;

        if removed == 0 {
            return Ok(RemoveItemOutcome {
                cart_deleted: false,
                cart: Some(cart),
            });
        }

        let remaining = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .one(&txn)
            .await?;

        let outcome = if remaining.is_none() {
            Cart::delete_by_id(cart_id).exec(&txn).await?;
            RemoveItemOutcome {
                cart_deleted: true,
                cart: None,
            }
        } else {
            let updated = self.recalculate_cart_totals(&txn, cart).await?;
            RemoveItemOutcome {
                cart_deleted: false,
                cart: Some(updated),
            }
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id,
                product_id,
            })
            .await;

        Ok(outcome)
    }

    /// Unconditionally deletes the owner's cart. No-op when absent.
    #[instrument(skip(self))]
    pub async fn clear(&self, owner: &CartOwner) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let Some(cart) = owner.select().one(&txn).await? else {
            return Ok(());
        };

        let cart_id = cart.id;
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(&txn)
            .await?;
        Cart::delete_by_id(cart_id).exec(&txn).await?;

        txn.commit().await?;

        self.event_sender.send_or_log(Event::CartCleared(cart_id)).await;
        info!("Cleared cart {}", cart_id);
        Ok(())
    }

    /// Sum of all line-item quantities; 0 when no cart exists.
    pub async fn item_count(&self, owner: &CartOwner) -> Result<i64, ServiceError> {
        let Some(cart) = owner.select().one(&*self.db).await? else {
            return Ok(0);
        };

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(&*self.db)
            .await?;

        Ok(items.iter().map(|item| item.quantity as i64).sum())
    }

    /// Pre-checkout consistency check against the live catalog.
    ///
    /// Unavailable or under-stocked products are dropped from the repaired
    /// candidate set; price drift is reported and the item retained at the
    /// current price. When the cart is repairable, the corrected snapshot is
    /// returned for the caller to show and re-submit. This is a read path:
    /// it never persists the correction.
    #[instrument(skip(self))]
    pub async fn validate(&self, owner: &CartOwner) -> Result<CartValidation, ServiceError> {
        let Some(cart) = owner.select().one(&*self.db).await? else {
            return Ok(CartValidation::empty_cart());
        };

        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::AddedAt)
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        if rows.is_empty() {
            return Ok(CartValidation::empty_cart());
        }

        let mut errors = Vec::new();
        let mut kept = Vec::new();

        for (item, product) in rows {
            let product = match product.filter(|p| p.is_active) {
                Some(p) => p,
                None => {
                    errors.push(format!(
                        "Product {} is no longer available",
                        item.product_id
                    ));
                    continue;
                }
            };

            if product.track_inventory && product.inventory_quantity < item.quantity {
                errors.push(format!(
                    "Only {} units of {} available",
                    product.inventory_quantity, product.name
                ));
                continue;
            }

            if product.price != item.unit_price {
                errors.push(format!(
                    "Price of {} changed from {} to {}",
                    product.name, item.unit_price, product.price
                ));
                kept.push(SnapshotLine {
                    product_id: item.product_id,
                    product_name: product.name,
                    quantity: item.quantity,
                    unit_price: product.price,
                    line_total: product.price * Decimal::from(item.quantity),
                });
                continue;
            }

            kept.push(SnapshotLine {
                product_id: item.product_id,
                product_name: product.name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total,
            });
        }

        let valid = errors.is_empty();
        let updated_cart = if !valid && !kept.is_empty() {
            let (subtotal, tax_total, total) =
                cart_totals(kept.iter().map(|l| (l.unit_price, l.quantity)));
            Some(CartSnapshot {
                items: kept,
                subtotal,
                tax_total,
                total,
                currency: CURRENCY.to_string(),
            })
        } else {
            None
        };

        Ok(CartValidation {
            valid,
            errors,
            updated_cart,
        })
    }

    /// Reconciles a guest cart into a customer cart after sign-in.
    ///
    /// Runs as a single transaction, so a concurrent reader of the customer
    /// cart never observes a half-merged state. On a product conflict the
    /// customer cart's price snapshot wins and quantities are summed.
    #[instrument(skip(self))]
    pub async fn migrate_guest_cart(
        &self,
        session_id: &str,
        customer_id: Uuid,
    ) -> Result<MigrationOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        let guest_owner = CartOwner::Guest(session_id.to_string());
        let Some(guest_cart) = guest_owner.select().one(&txn).await? else {
            return Ok(MigrationOutcome {
                merged: false,
                converted: false,
            });
        };

        let customer_owner = CartOwner::Customer(customer_id);
        let outcome = match customer_owner.select().one(&txn).await? {
            None => {
                // Convert in place: reassign the owner and make it permanent.
                let mut active: cart::ActiveModel = guest_cart.into();
                active.session_id = Set(None);
                active.customer_id = Set(Some(customer_id));
                active.expires_at = Set(None);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;

                MigrationOutcome {
                    merged: false,
                    converted: true,
                }
            }
            Some(customer_cart) => {
                let guest_items = CartItem::find()
                    .filter(cart_item::Column::CartId.eq(guest_cart.id))
                    .order_by_asc(cart_item::Column::AddedAt)
                    .all(&txn)
                    .await?;

                for guest_item in guest_items {
                    let existing = CartItem::find()
                        .filter(cart_item::Column::CartId.eq(customer_cart.id))
                        .filter(cart_item::Column::ProductId.eq(guest_item.product_id))
                        .one(&txn)
                        .await?;

                    match existing {
                        Some(item) => {
                            // Quantities sum; the customer cart's price wins.
                            let quantity = item.quantity + guest_item.quantity;
                            let unit_price = item.unit_price;
                            let mut item: cart_item::ActiveModel = item.into();
                            item.quantity = Set(quantity);
                            item.line_total = Set(unit_price * Decimal::from(quantity));
                            item.update(&txn).await?;
                        }
                        None => {
                            let item = cart_item::ActiveModel {
                                id: Set(Uuid::new_v4()),
                                cart_id: Set(customer_cart.id),
                                product_id: Set(guest_item.product_id),
                                quantity: Set(guest_item.quantity),
                                unit_price: Set(guest_item.unit_price),
                                line_total: Set(guest_item.line_total),
                                added_at: Set(guest_item.added_at),
                            };
                            item.insert(&txn).await?;
                        }
                    }
                }

                let guest_cart_id = guest_cart.id;
                CartItem::delete_many()
                    .filter(cart_item::Column::CartId.eq(guest_cart_id))
                    .exec(&txn)
                    .await?;
                Cart::delete_by_id(guest_cart_id).exec(&txn).await?;

                self.recalculate_cart_totals(&txn, customer_cart).await?;

                MigrationOutcome {
                    merged: true,
                    converted: false,
                }
            }
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartMigrated {
                customer_id,
                merged: outcome.merged,
            })
            .await;

        info!(
            "Migrated guest cart for session into customer {}: merged={}, converted={}",
            customer_id, outcome.merged, outcome.converted
        );
        Ok(outcome)
    }

    async fn create_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        owner: &CartOwner,
    ) -> Result<CartModel, ServiceError> {
        let cart_id = Uuid::new_v4();
        let now = Utc::now();

        let (session_id, customer_id, expires_at) = match owner {
            CartOwner::Customer(id) => (None, Some(*id), None),
            CartOwner::Guest(sid) => (
                Some(sid.clone()),
                None,
                Some(now + Duration::days(GUEST_CART_TTL_DAYS)),
            ),
        };

        let cart = cart::ActiveModel {
            id: Set(cart_id),
            session_id: Set(session_id),
            customer_id: Set(customer_id),
            currency: Set(CURRENCY.to_string()),
            subtotal: Set(Decimal::ZERO),
            tax_total: Set(Decimal::ZERO),
            total: Set(Decimal::ZERO),
            expires_at: Set(expires_at),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let cart = cart.insert(conn).await?;
        self.event_sender.send_or_log(Event::CartCreated(cart_id)).await;
        Ok(cart)
    }

    /// Re-establishes the derived-totals invariant from the current item
    /// rows. Guest carts also get their expiry pushed out, since any
    /// mutation counts as activity.
    async fn recalculate_cart_totals<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart: CartModel,
    ) -> Result<CartModel, ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .all(conn)
            .await?;

        let (subtotal, tax_total, total) =
            cart_totals(items.iter().map(|item| (item.unit_price, item.quantity)));

        let is_guest = cart.is_guest();
        let mut active: cart::ActiveModel = cart.into();
        active.subtotal = Set(subtotal);
        active.tax_total = Set(tax_total);
        active.total = Set(total);
        if is_guest {
            active.expires_at = Set(Some(Utc::now() + Duration::days(GUEST_CART_TTL_DAYS)));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(conn).await?)
    }

    async fn remove_line<C: ConnectionTrait>(
        &self,
        conn: &C,
        cart: CartModel,
        product_id: Uuid,
    ) -> Result<RemoveLineOutcome, ServiceError> {
        let cart_id = cart.id;
        let removed = CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(conn)
            .await?
            .rows_affected;

        if removed == 0 {
            return Ok(RemoveLineOutcome {
                cart_id,
                removed,
                cart: Some(cart),
            });
        }

        let remaining = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .one(conn)
            .await?;

        if remaining.is_none() {
            Cart::delete_by_id(cart_id).exec(conn).await?;
            Ok(RemoveLineOutcome {
                cart_id,
                removed,
                cart: None,
            })
        } else {
            let updated = self.recalculate_cart_totals(conn, cart).await?;
            Ok(RemoveLineOutcome {
                cart_id,
                removed,
                cart: Some(updated),
            })
        }
    }
}

/// Checks that a product exists, is active and has sufficient tracked
/// stock for the requested quantity.
async fn available_product<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> Result<ProductModel, ServiceError> {
    let product = Product::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::ProductUnavailable(format!("Product {} not found", product_id))
        })?;

    if !product.is_active {
        return Err(ServiceError::ProductUnavailable(format!(
            "{} is no longer available",
            product.name
        )));
    }

    if product.track_inventory && product.inventory_quantity < quantity {
        return Err(ServiceError::ProductUnavailable(format!(
            "Only {} units of {} available",
            product.inventory_quantity, product.name
        )));
    }

    Ok(product)
}

struct RemoveLineOutcome {
    cart_id: Uuid,
    removed: u64,
    cart: Option<CartModel>,
}

/// Input for adding a product to a cart
#[derive(Debug, Deserialize)]
pub struct AddItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Cart with its line items joined to the live product records
#[derive(Debug, Serialize)]
pub struct CartWithItems {
    pub cart: CartModel,
    pub items: Vec<CartLine>,
}

#[derive(Debug, Serialize)]
pub struct CartLine {
    pub item: cart_item::Model,
    /// `None` when the product was removed from the catalog after being
    /// added to the cart.
    pub product: Option<ProductModel>,
}

/// Result of `remove_item`
#[derive(Debug, Serialize, ToSchema)]
pub struct RemoveItemOutcome {
    pub cart_deleted: bool,
    #[serde(skip)]
    pub cart: Option<CartModel>,
}

/// Result of `migrate_guest_cart`
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct MigrationOutcome {
    pub merged: bool,
    pub converted: bool,
}

/// Result of the pre-checkout validation read
#[derive(Debug, Serialize, ToSchema)]
pub struct CartValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    /// Repaired snapshot for the client to show and re-submit; present
    /// exactly when the cart is invalid but repairable.
    pub updated_cart: Option<CartSnapshot>,
}

impl CartValidation {
    fn empty_cart() -> Self {
        Self {
            valid: false,
            errors: vec!["Cart is empty".to_string()],
            updated_cart: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartSnapshot {
    pub items: Vec<SnapshotLine>,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
    pub currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}
