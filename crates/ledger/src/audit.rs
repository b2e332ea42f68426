//! Append-only audit trail.
//!
//! Every mutation and every reconciliation repair appends one entry in the
//! same database transaction, with the actor, a timestamp and a structured
//! JSON detail. Entries are never updated or deleted: they are what lets a
//! human (or the reconciler) explain *why* a balance is what it is.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LedgerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ExpenseCreated,
    ExpenseUpdated,
    ExpenseDeleted,
    PaymentCreated,
    PaymentUpdated,
    PaymentDeleted,
    MemberAdded,
    MemberArchived,
    BalanceRepaired,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExpenseCreated => "expense_created",
            Self::ExpenseUpdated => "expense_updated",
            Self::ExpenseDeleted => "expense_deleted",
            Self::PaymentCreated => "payment_created",
            Self::PaymentUpdated => "payment_updated",
            Self::PaymentDeleted => "payment_deleted",
            Self::MemberAdded => "member_added",
            Self::MemberArchived => "member_archived",
            Self::BalanceRepaired => "balance_repaired",
        }
    }
}

impl TryFrom<&str> for AuditAction {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "expense_created" => Ok(Self::ExpenseCreated),
            "expense_updated" => Ok(Self::ExpenseUpdated),
            "expense_deleted" => Ok(Self::ExpenseDeleted),
            "payment_created" => Ok(Self::PaymentCreated),
            "payment_updated" => Ok(Self::PaymentUpdated),
            "payment_deleted" => Ok(Self::PaymentDeleted),
            "member_added" => Ok(Self::MemberAdded),
            "member_archived" => Ok(Self::MemberArchived),
            "balance_repaired" => Ok(Self::BalanceRepaired),
            other => Err(LedgerError::Validation(format!(
                "invalid audit action: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub group_id: String,
    pub actor: String,
    pub recorded_at: DateTime<Utc>,
    pub action: AuditAction,
    pub detail: serde_json::Value,
}

impl AuditEntry {
    pub fn new(
        group_id: String,
        actor: String,
        recorded_at: DateTime<Utc>,
        action: AuditAction,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id,
            actor,
            recorded_at,
            action,
            detail,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "audit_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub actor: String,
    pub recorded_at: DateTimeUtc,
    pub action: String,
    pub detail: String,
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

impl From<&AuditEntry> for ActiveModel {
    fn from(entry: &AuditEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            group_id: ActiveValue::Set(entry.group_id.clone()),
            actor: ActiveValue::Set(entry.actor.clone()),
            recorded_at: ActiveValue::Set(entry.recorded_at),
            action: ActiveValue::Set(entry.action.as_str().to_string()),
            detail: ActiveValue::Set(entry.detail.to_string()),
        }
    }
}

impl TryFrom<Model> for AuditEntry {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| LedgerError::InvalidId("invalid audit entry id".to_string()))?,
            group_id: model.group_id,
            actor: model.actor,
            recorded_at: model.recorded_at,
            action: AuditAction::try_from(model.action.as_str())?,
            detail: serde_json::from_str(&model.detail)
                .unwrap_or(serde_json::Value::String(model.detail)),
        })
    }
}
