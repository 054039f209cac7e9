use crate::{
    entities::{product, Product, ProductModel},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Catalog service. The cart core only reads from it; writes exist for
/// populating and maintaining the catalog.
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        if input.price < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "price must not be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            brand: Set(input.brand),
            unit_label: Set(input.unit_label.unwrap_or_else(|| "un".to_string())),
            price: Set(input.price),
            is_active: Set(input.is_active.unwrap_or(true)),
            track_inventory: Set(input.track_inventory.unwrap_or(false)),
            inventory_quantity: Set(input.inventory_quantity.unwrap_or(0)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let product = product.insert(&*self.db).await?;
        info!("Created product {}: {}", product.id, product.name);
        Ok(product)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Lists active products, newest first.
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let paginator = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((data, total))
    }
}

/// Input for creating a catalog product
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductInput {
    pub name: String,
    pub brand: Option<String>,
    /// Display unit, defaults to "un"
    pub unit_label: Option<String>,
    /// Price in CLP
    pub price: Decimal,
    pub is_active: Option<bool>,
    pub track_inventory: Option<bool>,
    pub inventory_quantity: Option<i32>,
}
