use sea_orm_migration::prelude::*;

use crate::m20260110_100000_groups::Groups;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum AuditEntries {
    Table,
    Id,
    GroupId,
    Actor,
    RecordedAt,
    Action,
    Detail,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditEntries::GroupId).string().not_null())
                    .col(ColumnDef::new(AuditEntries::Actor).string().not_null())
                    .col(
                        ColumnDef::new(AuditEntries::RecordedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AuditEntries::Action).string().not_null())
                    .col(ColumnDef::new(AuditEntries::Detail).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-audit_entries-group_id")
                            .from(AuditEntries::Table, AuditEntries::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-audit_entries-group_id-recorded_at")
                    .table(AuditEntries::Table)
                    .col(AuditEntries::GroupId)
                    .col(AuditEntries::RecordedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditEntries::Table).to_owned())
            .await
    }
}
