use sea_orm_migration::prelude::*;

use crate::m20260110_100000_groups::Groups;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum NetBalances {
    Table,
    GroupId,
    UserId,
    BalanceMinor,
    Revision,
}

#[derive(Iden)]
enum PairBalances {
    Table,
    Id,
    GroupId,
    DebtorId,
    CreditorId,
    AmountMinor,
    Revision,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NetBalances::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(NetBalances::GroupId).string().not_null())
                    .col(ColumnDef::new(NetBalances::UserId).string().not_null())
                    .col(
                        ColumnDef::new(NetBalances::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NetBalances::Revision)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(NetBalances::GroupId)
                            .col(NetBalances::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-net_balances-group_id")
                            .from(NetBalances::Table, NetBalances::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PairBalances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PairBalances::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PairBalances::GroupId).string().not_null())
                    .col(ColumnDef::new(PairBalances::DebtorId).string().not_null())
                    .col(ColumnDef::new(PairBalances::CreditorId).string().not_null())
                    .col(
                        ColumnDef::new(PairBalances::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PairBalances::Revision)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-pair_balances-group_id")
                            .from(PairBalances::Table, PairBalances::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per unordered pair is an application invariant; the index
        // at least pins the oriented pair down to a single row.
        manager
            .create_index(
                Index::create()
                    .name("idx-pair_balances-group-debtor-creditor")
                    .table(PairBalances::Table)
                    .col(PairBalances::GroupId)
                    .col(PairBalances::DebtorId)
                    .col(PairBalances::CreditorId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PairBalances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NetBalances::Table).to_owned())
            .await?;
        Ok(())
    }
}
