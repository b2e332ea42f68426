use sea_orm_migration::prelude::*;

use crate::m20260110_100000_groups::Groups;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Expenses {
    Table,
    Id,
    GroupId,
    PayerId,
    AmountMinor,
    Currency,
    Description,
    OccurredAt,
    CreatedBy,
    DeletedAt,
    DeletedBy,
    IdempotencyKey,
}

#[derive(Iden)]
enum ExpenseShares {
    Table,
    Id,
    ExpenseId,
    UserId,
    AmountMinor,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::GroupId).string().not_null())
                    .col(ColumnDef::new(Expenses::PayerId).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::Currency).string().not_null())
                    .col(ColumnDef::new(Expenses::Description).string())
                    .col(ColumnDef::new(Expenses::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Expenses::DeletedAt).timestamp())
                    .col(ColumnDef::new(Expenses::DeletedBy).string())
                    .col(ColumnDef::new(Expenses::IdempotencyKey).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-group_id")
                            .from(Expenses::Table, Expenses::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-group_id-occurred_at")
                    .table(Expenses::Table)
                    .col(Expenses::GroupId)
                    .col(Expenses::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpenseShares::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseShares::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExpenseShares::ExpenseId).string().not_null())
                    .col(ColumnDef::new(ExpenseShares::UserId).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseShares::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_shares-expense_id")
                            .from(ExpenseShares::Table, ExpenseShares::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_shares-expense_id")
                    .table(ExpenseShares::Table)
                    .col(ExpenseShares::ExpenseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExpenseShares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        Ok(())
    }
}
