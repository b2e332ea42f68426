//! Expense primitives.
//!
//! An `Expense` records that one member (the payer) covered a cost on behalf
//! of a set of participants; each participant's slice lives in an
//! [`Share`](crate::Share) row. Deleting an expense is a soft delete: the row
//! keeps its attribution and the reducers simply skip it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError, MoneyCents, ResultLedger, shares};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: String,
    pub payer_id: String,
    pub amount: MoneyCents,
    pub currency: Currency,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_by: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub idempotency_key: Option<String>,
    pub shares: Vec<shares::Share>,
}

impl Expense {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        group_id: String,
        payer_id: String,
        amount: MoneyCents,
        currency: Currency,
        description: Option<String>,
        occurred_at: DateTime<Utc>,
        created_by: String,
        idempotency_key: Option<String>,
    ) -> ResultLedger<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "expense amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            payer_id,
            amount,
            currency,
            description,
            occurred_at,
            created_by,
            deleted_at: None,
            deleted_by: None,
            idempotency_key,
            shares: Vec::new(),
        })
    }

    /// The payer's own slice of the expense, zero when they are not a
    /// participant.
    #[must_use]
    pub fn payer_share(&self) -> MoneyCents {
        self.shares
            .iter()
            .find(|s| s.user_id == self.payer_id)
            .map(|s| s.amount)
            .unwrap_or(MoneyCents::ZERO)
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub payer_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub description: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub created_by: String,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<String>,
    pub idempotency_key: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shares::Entity")]
    Shares,
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Groups,
}

impl Related<super::shares::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            payer_id: ActiveValue::Set(expense.payer_id.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            currency: ActiveValue::Set(expense.currency.code().to_string()),
            description: ActiveValue::Set(expense.description.clone()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            created_by: ActiveValue::Set(expense.created_by.clone()),
            deleted_at: ActiveValue::Set(expense.deleted_at),
            deleted_by: ActiveValue::Set(expense.deleted_by.clone()),
            idempotency_key: ActiveValue::Set(expense.idempotency_key.clone()),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::InvalidId("invalid expense id".to_string()))?,
            group_id: model.group_id,
            payer_id: model.payer_id,
            amount: MoneyCents::new(model.amount_minor),
            currency: Currency::try_from(model.currency.as_str())?,
            description: model.description,
            occurred_at: model.occurred_at,
            created_by: model.created_by,
            deleted_at: model.deleted_at,
            deleted_by: model.deleted_by,
            idempotency_key: model.idempotency_key,
            shares: Vec::new(),
        })
    }
}
