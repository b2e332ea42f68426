use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AuditAction, BalanceDelta, CreatePaymentCmd, LedgerError, Payment, ResultLedger,
    UpdatePaymentCmd, payments, util::normalize_optional_text,
};

use super::{Ledger, with_tx};

impl Ledger {
    /// Records a direct settlement payment between two members, applying
    /// its cache delta in the same unit of work.
    pub async fn create_payment(&self, cmd: CreatePaymentCmd) -> ResultLedger<Uuid> {
        let group_id = cmd.group_id.clone();

        let id = with_tx!(self, |db_tx| {
            let group = self.require_group_for_update(&db_tx, &cmd.group_id).await?;
            let currency = Self::group_currency(&group)?;
            self.require_active_member(&db_tx, &cmd.group_id, &cmd.user_id)
                .await?;
            self.require_active_member(&db_tx, &cmd.group_id, &cmd.payer_id)
                .await?;
            self.require_active_member(&db_tx, &cmd.group_id, &cmd.payee_id)
                .await?;

            if let Some(key) = cmd.idempotency_key.as_deref()
                && let Some(existing) = self
                    .find_payment_by_idempotency_key(&db_tx, &cmd.group_id, &cmd.user_id, key)
                    .await?
            {
                return crate::util::parse_uuid(&existing.id, "payment");
            }

            let payment = Payment::new(
                cmd.group_id.clone(),
                cmd.payer_id.clone(),
                cmd.payee_id.clone(),
                cmd.amount,
                currency,
                normalize_optional_text(cmd.note.as_deref()),
                cmd.occurred_at,
                cmd.user_id.clone(),
                cmd.idempotency_key.clone(),
            )?;
            payments::ActiveModel::from(&payment).insert(&db_tx).await?;

            let mut delta = BalanceDelta::new();
            delta.add_payment(&payment);
            self.apply_deltas(&db_tx, &cmd.group_id, &delta).await?;

            self.append_audit(
                &db_tx,
                &cmd.group_id,
                &cmd.user_id,
                AuditAction::PaymentCreated,
                payment_detail(&payment),
            )
            .await?;

            Ok(payment.id)
        })?;

        self.note_mutation(&group_id);
        Ok(id)
    }

    /// Updates a payment; the cache delta reverses the old payment and
    /// applies the new one, same as expense updates.
    pub async fn update_payment(&self, cmd: UpdatePaymentCmd) -> ResultLedger<()> {
        let group_id = cmd.group_id.clone();

        with_tx!(self, |db_tx| {
            self.require_group_for_update(&db_tx, &cmd.group_id).await?;
            self.require_active_member(&db_tx, &cmd.group_id, &cmd.user_id)
                .await?;

            let old = self
                .load_payment(&db_tx, &cmd.group_id, cmd.payment_id)
                .await?;
            if old.is_deleted() {
                return Err(LedgerError::Validation(
                    "cannot update a deleted payment".to_string(),
                ));
            }

            let mut new = old.clone();
            if let Some(payer_id) = &cmd.payer_id {
                new.payer_id = payer_id.clone();
            }
            if let Some(payee_id) = &cmd.payee_id {
                new.payee_id = payee_id.clone();
            }
            if let Some(amount) = cmd.amount {
                if !amount.is_positive() {
                    return Err(LedgerError::Validation(
                        "payment amount must be > 0".to_string(),
                    ));
                }
                new.amount = amount;
            }
            if let Some(note) = &cmd.note {
                new.note = normalize_optional_text(Some(note));
            }
            if let Some(occurred_at) = cmd.occurred_at {
                new.occurred_at = occurred_at;
            }

            if new.payer_id == new.payee_id {
                return Err(LedgerError::Validation(
                    "payer and payee must differ".to_string(),
                ));
            }
            self.require_active_member(&db_tx, &cmd.group_id, &new.payer_id)
                .await?;
            self.require_active_member(&db_tx, &cmd.group_id, &new.payee_id)
                .await?;

            let mut delta = BalanceDelta::new();
            delta.remove_payment(&old);
            delta.add_payment(&new);

            payments::ActiveModel::from(&new).update(&db_tx).await?;
            self.apply_deltas(&db_tx, &cmd.group_id, &delta).await?;

            self.append_audit(
                &db_tx,
                &cmd.group_id,
                &cmd.user_id,
                AuditAction::PaymentUpdated,
                json!({
                    "payment_id": new.id,
                    "old": payment_detail(&old),
                    "new": payment_detail(&new),
                }),
            )
            .await?;

            Ok(())
        })?;

        self.note_mutation(&group_id);
        Ok(())
    }

    /// Soft-deletes a payment, reversing exactly its own contribution.
    pub async fn delete_payment(
        &self,
        group_id: &str,
        payment_id: Uuid,
        user_id: &str,
        deleted_at: DateTime<Utc>,
    ) -> ResultLedger<()> {
        let group_id = group_id.to_string();
        let user_id = user_id.to_string();

        with_tx!(self, |db_tx| {
            self.require_group_for_update(&db_tx, &group_id).await?;
            self.require_active_member(&db_tx, &group_id, &user_id)
                .await?;

            let old = self.load_payment(&db_tx, &group_id, payment_id).await?;
            if old.is_deleted() {
                return Err(LedgerError::Validation(
                    "payment already deleted".to_string(),
                ));
            }

            let mut delta = BalanceDelta::new();
            delta.remove_payment(&old);

            let mut deleted = old.clone();
            deleted.deleted_at = Some(deleted_at);
            deleted.deleted_by = Some(user_id.clone());
            payments::ActiveModel::from(&deleted).update(&db_tx).await?;

            self.apply_deltas(&db_tx, &group_id, &delta).await?;

            self.append_audit(
                &db_tx,
                &group_id,
                &user_id,
                AuditAction::PaymentDeleted,
                payment_detail(&old),
            )
            .await?;

            Ok(())
        })?;

        self.note_mutation(&group_id);
        Ok(())
    }

    /// Returns one payment.
    pub async fn payment(
        &self,
        group_id: &str,
        payment_id: Uuid,
        user_id: &str,
    ) -> ResultLedger<Payment> {
        let group_id = group_id.to_string();
        let user_id = user_id.to_string();
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, &group_id).await?;
            self.require_member_read(&db_tx, &group_id, &user_id).await?;
            self.load_payment(&db_tx, &group_id, payment_id).await
        })
    }

    /// Lists recent payments, newest first.
    pub async fn list_payments(
        &self,
        group_id: &str,
        user_id: &str,
        limit: u64,
        include_deleted: bool,
    ) -> ResultLedger<Vec<Payment>> {
        let group_id = group_id.to_string();
        let user_id = user_id.to_string();
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, &group_id).await?;
            self.require_member_read(&db_tx, &group_id, &user_id).await?;

            let mut query = payments::Entity::find()
                .filter(payments::Column::GroupId.eq(group_id.clone()))
                .order_by_desc(payments::Column::OccurredAt)
                .order_by_desc(payments::Column::Id)
                .limit(limit);
            if !include_deleted {
                query = query.filter(payments::Column::DeletedAt.is_null());
            }

            let rows = query.all(&db_tx).await?;
            rows.into_iter().map(Payment::try_from).collect()
        })
    }

    pub(super) async fn load_payment(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        payment_id: Uuid,
    ) -> ResultLedger<Payment> {
        let model = payments::Entity::find_by_id(payment_id.to_string())
            .filter(payments::Column::GroupId.eq(group_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::NotFound("payment".to_string()))?;
        Payment::try_from(model)
    }

    async fn find_payment_by_idempotency_key(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        created_by: &str,
        key: &str,
    ) -> ResultLedger<Option<payments::Model>> {
        payments::Entity::find()
            .filter(payments::Column::GroupId.eq(group_id.to_string()))
            .filter(payments::Column::CreatedBy.eq(created_by.to_string()))
            .filter(payments::Column::IdempotencyKey.eq(key.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }
}

fn payment_detail(payment: &Payment) -> serde_json::Value {
    json!({
        "payment_id": payment.id,
        "payer_id": payment.payer_id,
        "payee_id": payment.payee_id,
        "amount_minor": payment.amount.cents(),
        "occurred_at": payment.occurred_at,
    })
}
