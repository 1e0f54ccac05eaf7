use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Coupons::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Coupons::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Coupons::Description).text().null())
                    .col(ColumnDef::new(Coupons::DiscountType).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Coupons::DiscountValue)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::MinCartValue)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Coupons::MaxDiscountCap)
                            .decimal_len(12, 2)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::StartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::ExpiryDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Coupons::UsageLimit).integer().null())
                    .col(
                        ColumnDef::new(Coupons::UsedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Coupons::UserLimit)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Coupons::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Coupons::ApplicableProducts).json().not_null())
                    .col(ColumnDef::new(Coupons::ApplicableCategories).json().not_null())
                    .col(ColumnDef::new(Coupons::EligibleUsers).json().not_null())
                    .col(
                        ColumnDef::new(Coupons::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Coupons::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Coupons {
    Table,
    Id,
    Code,
    Description,
    DiscountType,
    DiscountValue,
    MinCartValue,
    MaxDiscountCap,
    StartDate,
    ExpiryDate,
    UsageLimit,
    UsedCount,
    UserLimit,
    IsActive,
    ApplicableProducts,
    ApplicableCategories,
    EligibleUsers,
    CreatedAt,
    UpdatedAt,
}
