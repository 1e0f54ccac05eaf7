use sea_orm_migration::prelude::*;

/// Name of the counter row backing human-readable order numbers.
pub const ORDER_SEQUENCE_NAME: &str = "orders";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderSequences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderSequences::Name)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OrderSequences::CurrentValue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        let seed = Query::insert()
            .into_table(OrderSequences::Table)
            .columns([OrderSequences::Name, OrderSequences::CurrentValue])
            .values_panic([ORDER_SEQUENCE_NAME.into(), 0i64.into()])
            .to_owned();

        manager.exec_stmt(seed).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderSequences::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OrderSequences {
    Table,
    Name,
    CurrentValue,
}
