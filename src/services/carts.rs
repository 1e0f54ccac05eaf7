use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::debug;
use uuid::Uuid;

use crate::{
    entities::cart_item::{self, Entity as CartItemEntity},
    errors::ServiceError,
};

/// Persisted cart of a signed-in user.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct SeaOrmCartStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmCartStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CartStore for SeaOrmCartStore {
    async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let result = CartItemEntity::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;
        debug!(user_id = %user_id, removed = result.rows_affected, "cart cleared");
        Ok(())
    }
}
