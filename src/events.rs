use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the cart and checkout services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartCreated(Uuid),
    CartItemAdded { cart_id: Uuid, product_id: Uuid },
    CartItemUpdated { cart_id: Uuid, product_id: Uuid },
    CartItemRemoved { cart_id: Uuid, product_id: Uuid },
    CartCleared(Uuid),
    CartMigrated { customer_id: Uuid, merged: bool },
    CartsExpired { deleted: u64 },

    // Order events
    OrderCreated(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    /// Event delivery is best-effort; it never aborts the surrounding mutation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(err) = self.send(event).await {
            warn!("Event not delivered: {}", err);
        }
    }
}

/// Consumes events from the channel and logs them. Runs for the lifetime of
/// the server; downstream integrations (mail, analytics) would hang off this
/// loop.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::CartCreated(cart_id) => info!(%cart_id, "cart created"),
            Event::CartItemAdded {
                cart_id,
                product_id,
            } => info!(%cart_id, %product_id, "cart item added"),
            Event::CartItemUpdated {
                cart_id,
                product_id,
            } => info!(%cart_id, %product_id, "cart item updated"),
            Event::CartItemRemoved {
                cart_id,
                product_id,
            } => info!(%cart_id, %product_id, "cart item removed"),
            Event::CartCleared(cart_id) => info!(%cart_id, "cart cleared"),
            Event::CartMigrated {
                customer_id,
                merged,
            } => info!(%customer_id, merged, "guest cart migrated"),
            Event::CartsExpired { deleted } => info!(deleted, "expired guest carts purged"),
            Event::OrderCreated(order_id) => info!(%order_id, "order created"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let cart_id = Uuid::new_v4();

        sender.send(Event::CartCreated(cart_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::CartCreated(id)) => assert_eq!(id, cart_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or error out
        sender.send_or_log(Event::CartsExpired { deleted: 3 }).await;
    }
}
