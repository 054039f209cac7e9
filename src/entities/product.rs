use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Grocery catalog product.
///
/// The cart and checkout services treat this record as read-only and
/// authoritative for price and availability checks; line items keep their
/// own price snapshot taken at add time.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(nullable)]
    pub brand: Option<String>,
    /// Display unit, e.g. "kg", "un", "pack 6".
    pub unit_label: String,
    /// Price in CLP, no fractional units.
    #[sea_orm(column_type = "Decimal(Some((19, 0)))")]
    pub price: Decimal,
    pub is_active: bool,
    pub track_inventory: bool,
    pub inventory_quantity: i32,
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
