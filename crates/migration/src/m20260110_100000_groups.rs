use sea_orm_migration::prelude::*;

use crate::m20260110_090000_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Groups {
    Table,
    Id,
    Name,
    CreatedBy,
    Currency,
}

#[derive(Iden)]
enum GroupMemberships {
    Table,
    GroupId,
    UserId,
    Status,
    JoinedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Groups::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Groups::Name).string().not_null())
                    .col(ColumnDef::new(Groups::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Groups::Currency).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-groups-created_by")
                            .from(Groups::Table, Groups::CreatedBy)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMemberships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMemberships::GroupId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupMemberships::UserId).string().not_null())
                    .col(ColumnDef::new(GroupMemberships::Status).string().not_null())
                    .col(
                        ColumnDef::new(GroupMemberships::JoinedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(GroupMemberships::GroupId)
                            .col(GroupMemberships::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_memberships-group_id")
                            .from(GroupMemberships::Table, GroupMemberships::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-group_memberships-user_id")
                            .from(GroupMemberships::Table, GroupMemberships::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-group_memberships-user_id")
                    .table(GroupMemberships::Table)
                    .col(GroupMemberships::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupMemberships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        Ok(())
    }
}
