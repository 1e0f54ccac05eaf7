use migrations::ORDER_SEQUENCE_NAME;
use sea_orm::{sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::{
    entities::order_sequence::{self, Entity as OrderSequenceEntity},
    errors::ServiceError,
};

/// Hands out human-readable order numbers from a database counter.
///
/// Must be called inside the settlement transaction so a rollback also
/// returns the number.
#[derive(Debug, Clone)]
pub struct OrderNumberAllocator {
    prefix: String,
    width: usize,
}

impl Default for OrderNumberAllocator {
    fn default() -> Self {
        Self::new("ORD-", 6)
    }
}

impl OrderNumberAllocator {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
        }
    }

    pub async fn next<C: ConnectionTrait>(&self, conn: &C) -> Result<String, ServiceError> {
        let bumped = OrderSequenceEntity::update_many()
            .col_expr(
                order_sequence::Column::CurrentValue,
                Expr::col(order_sequence::Column::CurrentValue).add(1),
            )
            .filter(order_sequence::Column::Name.eq(ORDER_SEQUENCE_NAME))
            .exec(conn)
            .await?;

        if bumped.rows_affected == 0 {
            return Err(ServiceError::InternalError(format!(
                "order sequence '{}' is not initialised",
                ORDER_SEQUENCE_NAME
            )));
        }

        let row = OrderSequenceEntity::find_by_id(ORDER_SEQUENCE_NAME.to_string())
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("order sequence row disappeared".to_string())
            })?;

        Ok(self.format(row.current_value))
    }

    pub fn format(&self, value: i64) -> String {
        format!("{}{:0width$}", self.prefix, value, width = self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_is_zero_padded() {
        let allocator = OrderNumberAllocator::default();
        assert_eq!(allocator.format(1), "ORD-000001");
        assert_eq!(allocator.format(123456), "ORD-123456");
    }

    #[test]
    fn values_wider_than_the_padding_are_not_truncated() {
        let allocator = OrderNumberAllocator::new("SW", 3);
        assert_eq!(allocator.format(12345), "SW12345");
    }
}
