use crate::{
    entities::{cart, cart_item, Cart, CartItem},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Deletes every guest cart whose expiry has passed and returns the count.
///
/// Customer carts never carry `expires_at` and are untouched. The whole
/// sweep is one set-based delete inside a transaction rather than a
/// per-document loop, so a partially applied sweep is never visible.
pub async fn purge_expired(db: &DatabaseConnection) -> Result<u64, ServiceError> {
    let txn = db.begin().await?;

    let expired: Vec<Uuid> = Cart::find()
        .filter(cart::Column::ExpiresAt.lt(Utc::now()))
        .all(&txn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    if expired.is_empty() {
        return Ok(0);
    }

    CartItem::delete_many()
        .filter(cart_item::Column::CartId.is_in(expired.clone()))
        .exec(&txn)
        .await?;

    let deleted = Cart::delete_many()
        .filter(cart::Column::Id.is_in(expired))
        .exec(&txn)
        .await?
        .rows_affected;

    txn.commit().await?;

    counter!("despensa_carts_expired_total", deleted);
    Ok(deleted)
}

/// Spawns the periodic sweep. A failed run is logged and the loop keeps
/// going; the next tick retries.
pub fn spawn(
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match purge_expired(&db).await {
                Ok(0) => {}
                Ok(deleted) => {
                    info!(deleted, "expired guest carts purged");
                    event_sender
                        .send_or_log(Event::CartsExpired { deleted })
                        .await;
                }
                Err(err) => warn!("guest cart sweep failed: {}", err),
            }
        }
    })
}
