use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{AuditAction, AuditEntry, LedgerError, ResultLedger, audit};

use super::{Ledger, with_tx};

impl Ledger {
    /// Appends one audit entry inside the caller's transaction.
    ///
    /// Every mutation and every reconciliation repair goes through here, so
    /// the trail and the change it describes commit or roll back together.
    pub(super) async fn append_audit(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        actor: &str,
        action: AuditAction,
        detail: serde_json::Value,
    ) -> ResultLedger<()> {
        let entry = AuditEntry::new(
            group_id.to_string(),
            actor.to_string(),
            Utc::now(),
            action,
            detail,
        );
        audit::ActiveModel::from(&entry).insert(db).await?;
        Ok(())
    }

    /// Lists the most recent audit entries for a group, newest first.
    pub async fn list_audit(
        &self,
        group_id: &str,
        user_id: &str,
        limit: u64,
    ) -> ResultLedger<Vec<AuditEntry>> {
        let group_id = group_id.to_string();
        let user_id = user_id.to_string();
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, &group_id).await?;
            if self
                .membership_status(&db_tx, &group_id, &user_id)
                .await?
                .is_none()
            {
                return Err(LedgerError::NotFound("group".to_string()));
            }

            let rows = audit::Entity::find()
                .filter(audit::Column::GroupId.eq(group_id.clone()))
                .order_by_desc(audit::Column::RecordedAt)
                .order_by_desc(audit::Column::Id)
                .limit(limit)
                .all(&db_tx)
                .await?;

            rows.into_iter().map(AuditEntry::try_from).collect()
        })
    }
}
