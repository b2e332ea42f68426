//! Payment primitives.
//!
//! A `Payment` transfers settlement credit directly from one member to
//! another; it is never split. Deleting a payment is a soft delete, like
//! expenses.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, LedgerError, MoneyCents, ResultLedger};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub group_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount: MoneyCents,
    pub currency: Currency,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_by: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub idempotency_key: Option<String>,
}

impl Payment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        group_id: String,
        payer_id: String,
        payee_id: String,
        amount: MoneyCents,
        currency: Currency,
        note: Option<String>,
        occurred_at: DateTime<Utc>,
        created_by: String,
        idempotency_key: Option<String>,
    ) -> ResultLedger<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "payment amount must be > 0".to_string(),
            ));
        }
        if payer_id == payee_id {
            return Err(LedgerError::Validation(
                "payer and payee must differ".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            group_id,
            payer_id,
            payee_id,
            amount,
            currency,
            note,
            occurred_at,
            created_by,
            deleted_at: None,
            deleted_by: None,
            idempotency_key,
        })
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub note: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub created_by: String,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<String>,
    pub idempotency_key: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(payment: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            group_id: ActiveValue::Set(payment.group_id.clone()),
            payer_id: ActiveValue::Set(payment.payer_id.clone()),
            payee_id: ActiveValue::Set(payment.payee_id.clone()),
            amount_minor: ActiveValue::Set(payment.amount.cents()),
            currency: ActiveValue::Set(payment.currency.code().to_string()),
            note: ActiveValue::Set(payment.note.clone()),
            occurred_at: ActiveValue::Set(payment.occurred_at),
            created_by: ActiveValue::Set(payment.created_by.clone()),
            deleted_at: ActiveValue::Set(payment.deleted_at),
            deleted_by: ActiveValue::Set(payment.deleted_by.clone()),
            idempotency_key: ActiveValue::Set(payment.idempotency_key.clone()),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::InvalidId("invalid payment id".to_string()))?,
            group_id: model.group_id,
            payer_id: model.payer_id,
            payee_id: model.payee_id,
            amount: MoneyCents::new(model.amount_minor),
            currency: Currency::try_from(model.currency.as_str())?,
            note: model.note,
            occurred_at: model.occurred_at,
            created_by: model.created_by,
            deleted_at: model.deleted_at,
            deleted_by: model.deleted_by,
            idempotency_key: model.idempotency_key,
        })
    }
}
