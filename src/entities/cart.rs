use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shopping cart entity.
///
/// Exactly one of `customer_id` (permanent, authenticated) or `session_id`
/// (ephemeral guest) is set. `subtotal`, `tax_total` and `total` are derived
/// from the cart items and re-persisted inside the same transaction as every
/// item mutation; they are never left stale. `expires_at` is present only
/// for guest carts.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(nullable)]
    pub session_id: Option<String>,
    #[sea_orm(nullable)]
    pub customer_id: Option<Uuid>,
    /// Always "CLP".
    pub currency: String,
    #[sea_orm(column_type = "Decimal(Some((19, 0)))")]
    pub subtotal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 0)))")]
    pub tax_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 0)))")]
    pub total: Decimal,
    #[sea_orm(nullable)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A cart is guest-owned when it is keyed by a session id.
    pub fn is_guest(&self) -> bool {
        self.session_id.is_some()
    }
}
