use sea_orm_migration::prelude::*;

use crate::m20260110_100000_groups::Groups;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    GroupId,
    PayerId,
    PayeeId,
    AmountMinor,
    Currency,
    Note,
    OccurredAt,
    CreatedBy,
    DeletedAt,
    DeletedBy,
    IdempotencyKey,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::GroupId).string().not_null())
                    .col(ColumnDef::new(Payments::PayerId).string().not_null())
                    .col(ColumnDef::new(Payments::PayeeId).string().not_null())
                    .col(
                        ColumnDef::new(Payments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Currency).string().not_null())
                    .col(ColumnDef::new(Payments::Note).string())
                    .col(ColumnDef::new(Payments::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Payments::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Payments::DeletedAt).timestamp())
                    .col(ColumnDef::new(Payments::DeletedBy).string())
                    .col(ColumnDef::new(Payments::IdempotencyKey).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-group_id")
                            .from(Payments::Table, Payments::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-group_id-occurred_at")
                    .table(Payments::Table)
                    .col(Payments::GroupId)
                    .col(Payments::OccurredAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await
    }
}
