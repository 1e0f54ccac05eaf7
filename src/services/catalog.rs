use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
};

/// Price and category of a product as the catalog currently lists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub price: Decimal,
    pub category_id: Uuid,
    pub stock: i32,
    pub is_active: bool,
}

impl From<product::Model> for CatalogProduct {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            price: model.price,
            category_id: model.category_id,
            stock: model.stock,
            is_active: model.is_active,
        }
    }
}

/// Read-only access to the product catalog.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Looks up every id at once. Unknown ids are absent from the map.
    async fn products(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, CatalogProduct>, ServiceError>;
}

#[derive(Clone)]
pub struct SeaOrmCatalog {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmCatalog {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogReader for SeaOrmCatalog {
    async fn products(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, CatalogProduct>, ServiceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = ProductEntity::find()
            .filter(product::Column::Id.is_in(ids.iter().copied()))
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.id, CatalogProduct::from(row)))
            .collect())
    }
}
