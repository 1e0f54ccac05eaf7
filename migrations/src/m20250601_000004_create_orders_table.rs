use sea_orm_migration::prelude::*;

use super::m20250601_000003_create_coupons_table::Coupons;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::OrderNumber).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::UserId).uuid().null())
                    .col(ColumnDef::new(Orders::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::Subtotal).decimal_len(12, 2).not_null())
                    .col(
                        ColumnDef::new(Orders::DiscountAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Orders::Total).decimal_len(12, 2).not_null())
                    .col(ColumnDef::new(Orders::CouponId).uuid().null())
                    .col(ColumnDef::new(Orders::CouponCode).string_len(64).null())
                    .col(ColumnDef::new(Orders::CustomerName).string_len(255).null())
                    .col(ColumnDef::new(Orders::Phone).string_len(32).not_null())
                    .col(ColumnDef::new(Orders::Address).text().not_null())
                    .col(ColumnDef::new(Orders::Email).string_len(255).null())
                    .col(ColumnDef::new(Orders::Notes).text().null())
                    .col(ColumnDef::new(Orders::StoreId).uuid().null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    // Historical orders outlive the coupon definition; the code snapshot stays.
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_orders_coupon_id")
                            .from(Orders::Table, Orders::CouponId)
                            .to(Coupons::Table, Coupons::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_order_number")
                    .table(Orders::Table)
                    .col(Orders::OrderNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Per-user coupon usage lookups
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_user_coupon")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .col(Orders::CouponId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_coupon_id")
                    .table(Orders::Table)
                    .col(Orders::CouponId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Orders {
    Table,
    Id,
    OrderNumber,
    UserId,
    Status,
    Subtotal,
    DiscountAmount,
    Total,
    CouponId,
    CouponCode,
    CustomerName,
    Phone,
    Address,
    Email,
    Notes,
    StoreId,
    CreatedAt,
    UpdatedAt,
}
