use std::collections::{HashMap, HashSet};

use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AuditAction, BalanceDelta, CreateExpenseCmd, Expense, LedgerError, ResultLedger, Share,
    ShareSpec, UpdateExpenseCmd, expenses, shares,
    util::{normalize_optional_text, validate_shares},
};

use super::{Ledger, with_tx};

/// Filters for listing expenses.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct ExpenseListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If true, includes soft-deleted expenses (default: false).
    pub include_deleted: bool,
}

fn validate_list_filter(filter: &ExpenseListFilter) -> ResultLedger<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(LedgerError::Validation(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ExpensesCursor {
    occurred_at: DateTime<Utc>,
    expense_id: String,
}

impl ExpensesCursor {
    fn encode(&self) -> ResultLedger<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| LedgerError::InvalidCursor("invalid expenses cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultLedger<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| LedgerError::InvalidCursor("invalid expenses cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| LedgerError::InvalidCursor("invalid expenses cursor".to_string()))
    }
}

impl Ledger {
    /// Creates an expense and applies its cache delta in one unit of work.
    ///
    /// With an idempotency key, a retried create returns the existing id
    /// instead of double-inserting.
    pub async fn create_expense(&self, cmd: CreateExpenseCmd) -> ResultLedger<Uuid> {
        validate_shares(cmd.amount, &cmd.shares)?;
        let group_id = cmd.group_id.clone();

        let id = with_tx!(self, |db_tx| {
            let group = self.require_group_for_update(&db_tx, &cmd.group_id).await?;
            let currency = Self::group_currency(&group)?;
            self.require_active_member(&db_tx, &cmd.group_id, &cmd.user_id)
                .await?;
            self.require_participants_active(&db_tx, &cmd.group_id, &cmd.payer_id, &cmd.shares)
                .await?;

            if let Some(key) = cmd.idempotency_key.as_deref()
                && let Some(existing) = self
                    .find_expense_by_idempotency_key(&db_tx, &cmd.group_id, &cmd.user_id, key)
                    .await?
            {
                return crate::util::parse_uuid(&existing.id, "expense");
            }

            let mut expense = Expense::new(
                cmd.group_id.clone(),
                cmd.payer_id.clone(),
                cmd.amount,
                currency,
                normalize_optional_text(cmd.description.as_deref()),
                cmd.occurred_at,
                cmd.user_id.clone(),
                cmd.idempotency_key.clone(),
            )?;
            expense.shares = cmd
                .shares
                .iter()
                .map(|s| Share::new(expense.id, s.user_id.clone(), s.amount))
                .collect();

            expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
            for share in &expense.shares {
                shares::ActiveModel::from(share).insert(&db_tx).await?;
            }

            let mut delta = BalanceDelta::new();
            delta.add_expense(&expense);
            self.apply_deltas(&db_tx, &cmd.group_id, &delta).await?;

            self.append_audit(
                &db_tx,
                &cmd.group_id,
                &cmd.user_id,
                AuditAction::ExpenseCreated,
                expense_detail(&expense),
            )
            .await?;

            Ok(expense.id)
        })?;

        self.note_mutation(&group_id);
        Ok(id)
    }

    /// Updates an expense.
    ///
    /// The cache delta is the reversal of the whole old expense plus the
    /// whole new one — never a field-level diff — so changed participants
    /// can never leave stale shares in the cache.
    pub async fn update_expense(&self, cmd: UpdateExpenseCmd) -> ResultLedger<()> {
        let group_id = cmd.group_id.clone();

        with_tx!(self, |db_tx| {
            self.require_group_for_update(&db_tx, &cmd.group_id).await?;
            self.require_active_member(&db_tx, &cmd.group_id, &cmd.user_id)
                .await?;

            let old = self
                .load_expense(&db_tx, &cmd.group_id, cmd.expense_id)
                .await?;
            if old.is_deleted() {
                return Err(LedgerError::Validation(
                    "cannot update a deleted expense".to_string(),
                ));
            }

            let mut new = old.clone();
            if let Some(payer_id) = &cmd.payer_id {
                new.payer_id = payer_id.clone();
            }
            if let Some(amount) = cmd.amount {
                if !amount.is_positive() {
                    return Err(LedgerError::Validation(
                        "expense amount must be > 0".to_string(),
                    ));
                }
                new.amount = amount;
            }
            if let Some(description) = &cmd.description {
                new.description = normalize_optional_text(Some(description));
            }
            if let Some(occurred_at) = cmd.occurred_at {
                new.occurred_at = occurred_at;
            }

            let share_specs: Vec<ShareSpec> = match &cmd.shares {
                Some(specs) => specs.clone(),
                None => old
                    .shares
                    .iter()
                    .map(|s| ShareSpec::new(s.user_id.clone(), s.amount))
                    .collect(),
            };
            validate_shares(new.amount, &share_specs)?;
            self.require_participants_active(&db_tx, &cmd.group_id, &new.payer_id, &share_specs)
                .await?;
            new.shares = share_specs
                .iter()
                .map(|s| Share::new(new.id, s.user_id.clone(), s.amount))
                .collect();

            let mut delta = BalanceDelta::new();
            delta.remove_expense(&old);
            delta.add_expense(&new);

            expenses::ActiveModel::from(&new).update(&db_tx).await?;
            shares::Entity::delete_many()
                .filter(shares::Column::ExpenseId.eq(old.id.to_string()))
                .exec(&db_tx)
                .await?;
            for share in &new.shares {
                shares::ActiveModel::from(share).insert(&db_tx).await?;
            }

            self.apply_deltas(&db_tx, &cmd.group_id, &delta).await?;

            self.append_audit(
                &db_tx,
                &cmd.group_id,
                &cmd.user_id,
                AuditAction::ExpenseUpdated,
                json!({
                    "expense_id": new.id,
                    "old": expense_detail(&old),
                    "new": expense_detail(&new),
                }),
            )
            .await?;

            Ok(())
        })?;

        self.note_mutation(&group_id);
        Ok(())
    }

    /// Soft-deletes an expense, reversing exactly its own contribution to
    /// the caches. Unrelated payments and expenses are untouched.
    pub async fn delete_expense(
        &self,
        group_id: &str,
        expense_id: Uuid,
        user_id: &str,
        deleted_at: DateTime<Utc>,
    ) -> ResultLedger<()> {
        let group_id = group_id.to_string();
        let user_id = user_id.to_string();

        with_tx!(self, |db_tx| {
            self.require_group_for_update(&db_tx, &group_id).await?;
            self.require_active_member(&db_tx, &group_id, &user_id)
                .await?;

            let old = self.load_expense(&db_tx, &group_id, expense_id).await?;
            if old.is_deleted() {
                return Err(LedgerError::Validation(
                    "expense already deleted".to_string(),
                ));
            }

            let mut delta = BalanceDelta::new();
            delta.remove_expense(&old);

            let mut deleted = old.clone();
            deleted.deleted_at = Some(deleted_at);
            deleted.deleted_by = Some(user_id.clone());
            expenses::ActiveModel::from(&deleted).update(&db_tx).await?;

            self.apply_deltas(&db_tx, &group_id, &delta).await?;

            self.append_audit(
                &db_tx,
                &group_id,
                &user_id,
                AuditAction::ExpenseDeleted,
                expense_detail(&old),
            )
            .await?;

            Ok(())
        })?;

        self.note_mutation(&group_id);
        Ok(())
    }

    /// Returns one expense with its shares.
    pub async fn expense(
        &self,
        group_id: &str,
        expense_id: Uuid,
        user_id: &str,
    ) -> ResultLedger<Expense> {
        let group_id = group_id.to_string();
        let user_id = user_id.to_string();
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, &group_id).await?;
            self.require_member_read(&db_tx, &group_id, &user_id).await?;
            self.load_expense(&db_tx, &group_id, expense_id).await
        })
    }

    /// Lists expenses newest → older with cursor-based pagination.
    ///
    /// Returns the page and, when more rows remain, an opaque cursor for
    /// the next call.
    pub async fn list_expenses(
        &self,
        group_id: &str,
        user_id: &str,
        limit: u64,
        cursor: Option<&str>,
        filter: &ExpenseListFilter,
    ) -> ResultLedger<(Vec<Expense>, Option<String>)> {
        validate_list_filter(filter)?;
        let cursor = cursor.map(ExpensesCursor::decode).transpose()?;
        let group_id = group_id.to_string();
        let user_id = user_id.to_string();
        let filter = filter.clone();

        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, &group_id).await?;
            self.require_member_read(&db_tx, &group_id, &user_id).await?;

            let mut query = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group_id.clone()))
                .order_by_desc(expenses::Column::OccurredAt)
                .order_by_desc(expenses::Column::Id)
                .limit(limit + 1);

            if let Some(from) = filter.from {
                query = query.filter(expenses::Column::OccurredAt.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(expenses::Column::OccurredAt.lt(to));
            }
            if !filter.include_deleted {
                query = query.filter(expenses::Column::DeletedAt.is_null());
            }
            if let Some(cursor) = &cursor {
                query = query.filter(
                    Condition::any()
                        .add(expenses::Column::OccurredAt.lt(cursor.occurred_at))
                        .add(
                            Condition::all()
                                .add(expenses::Column::OccurredAt.eq(cursor.occurred_at))
                                .add(expenses::Column::Id.lt(cursor.expense_id.clone())),
                        ),
                );
            }

            let mut rows = query.all(&db_tx).await?;
            let next = if rows.len() as u64 > limit {
                rows.truncate(limit as usize);
                rows.last().map(|model| ExpensesCursor {
                    occurred_at: model.occurred_at,
                    expense_id: model.id.clone(),
                })
            } else {
                None
            };

            let mut out = Vec::with_capacity(rows.len());
            for model in rows {
                out.push(Expense::try_from(model)?);
            }
            self.attach_shares(&db_tx, &mut out).await?;

            let next = next.map(|c| c.encode()).transpose()?;
            Ok((out, next))
        })
    }

    pub(super) async fn load_expense(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        expense_id: Uuid,
    ) -> ResultLedger<Expense> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::NotFound("expense".to_string()))?;
        let mut expense = Expense::try_from(model)?;

        let share_models = shares::Entity::find()
            .filter(shares::Column::ExpenseId.eq(expense_id.to_string()))
            .all(db)
            .await?;
        expense.shares = share_models
            .into_iter()
            .map(Share::try_from)
            .collect::<ResultLedger<Vec<_>>>()?;
        Ok(expense)
    }

    pub(super) async fn attach_shares(
        &self,
        db: &DatabaseTransaction,
        expenses_out: &mut [Expense],
    ) -> ResultLedger<()> {
        if expenses_out.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = expenses_out.iter().map(|e| e.id.to_string()).collect();
        let share_models = shares::Entity::find()
            .filter(shares::Column::ExpenseId.is_in(ids))
            .all(db)
            .await?;

        let mut by_expense: HashMap<Uuid, Vec<Share>> = HashMap::new();
        for model in share_models {
            let share = Share::try_from(model)?;
            by_expense.entry(share.expense_id).or_default().push(share);
        }
        for expense in expenses_out {
            expense.shares = by_expense.remove(&expense.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn find_expense_by_idempotency_key(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        created_by: &str,
        key: &str,
    ) -> ResultLedger<Option<expenses::Model>> {
        expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .filter(expenses::Column::CreatedBy.eq(created_by.to_string()))
            .filter(expenses::Column::IdempotencyKey.eq(key.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Validates that the payer and every participant are active members.
    pub(super) async fn require_participants_active(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        payer_id: &str,
        share_specs: &[ShareSpec],
    ) -> ResultLedger<()> {
        let active: HashSet<String> = self
            .active_member_ids(db, group_id)
            .await?
            .into_iter()
            .collect();
        if !active.contains(payer_id) {
            return Err(LedgerError::Validation(format!(
                "{payer_id} is not an active member of the group"
            )));
        }
        for spec in share_specs {
            if !active.contains(spec.user_id.as_str()) {
                return Err(LedgerError::Validation(format!(
                    "{} is not an active member of the group",
                    spec.user_id
                )));
            }
        }
        Ok(())
    }
}

fn expense_detail(expense: &Expense) -> serde_json::Value {
    json!({
        "expense_id": expense.id,
        "payer_id": expense.payer_id,
        "amount_minor": expense.amount.cents(),
        "occurred_at": expense.occurred_at,
        "shares": expense
            .shares
            .iter()
            .map(|s| json!({ "user_id": s.user_id, "amount_minor": s.amount.cents() }))
            .collect::<Vec<_>>(),
    })
}
