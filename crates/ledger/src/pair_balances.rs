//! Cached pairwise balances.
//!
//! At most one row per unordered pair of members, always oriented
//! debtor → creditor with a positive amount. A settled (or negligible,
//! ≤ 1 cent) balance is represented by row absence, never by a zero row.
//! The reverse-direction row must never coexist; the cache writer enforces
//! this by rewriting both orientations of a pair in one pass.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "pair_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub debtor_id: String,
    pub creditor_id: String,
    pub amount_minor: i64,
    pub revision: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
