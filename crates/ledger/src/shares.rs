//! Participant shares.
//!
//! A [`Share`] is one participant's slice of an expense: how much of the
//! total that user owes the payer. Shares are stored amounts, never
//! recomputed fractions, so the reducers sum exact cents.
//!
//! Invariant: the shares of a live expense sum to its total within one cent,
//! and every share is non-negative.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{LedgerError, MoneyCents};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub user_id: String,
    pub amount: MoneyCents,
}

impl Share {
    pub fn new(expense_id: Uuid, user_id: String, amount: MoneyCents) -> Self {
        Self {
            id: Uuid::new_v4(),
            expense_id,
            user_id,
            amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "expense_shares")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub user_id: String,
    pub amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Share> for ActiveModel {
    fn from(share: &Share) -> Self {
        Self {
            id: ActiveValue::Set(share.id.to_string()),
            expense_id: ActiveValue::Set(share.expense_id.to_string()),
            user_id: ActiveValue::Set(share.user_id.clone()),
            amount_minor: ActiveValue::Set(share.amount.cents()),
        }
    }
}

impl TryFrom<Model> for Share {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::InvalidId("invalid share id".to_string()))?,
            expense_id: Uuid::parse_str(&model.expense_id)
                .map_err(|_| LedgerError::InvalidId("invalid expense id".to_string()))?,
            user_id: model.user_id,
            amount: MoneyCents::new(model.amount_minor),
        })
    }
}
