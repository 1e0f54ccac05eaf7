use sea_orm_migration::prelude::*;

use super::m20250601_000004_create_orders_table::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderStatusHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderStatusHistory::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderStatusHistory::OrderId).uuid().not_null())
                    .col(
                        ColumnDef::new(OrderStatusHistory::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OrderStatusHistory::Note).text().null())
                    .col(
                        ColumnDef::new(OrderStatusHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_status_history_order_id")
                            .from(OrderStatusHistory::Table, OrderStatusHistory::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_status_history_order_id")
                    .table(OrderStatusHistory::Table)
                    .col(OrderStatusHistory::OrderId)
                    .col(OrderStatusHistory::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderStatusHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrderStatusHistory {
    Table,
    Id,
    OrderId,
    Status,
    Note,
    CreatedAt,
}
