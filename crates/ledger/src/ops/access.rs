use sea_orm::{DatabaseTransaction, QueryFilter, QuerySelect, prelude::*};

use crate::{
    Currency, LedgerError, MembershipStatus, ResultLedger, groups, memberships, users,
};

use super::Ledger;

impl Ledger {
    pub(super) async fn find_group_by_id(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultLedger<Option<groups::Model>> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn require_group(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultLedger<groups::Model> {
        self.find_group_by_id(db, group_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("group".to_string()))
    }

    /// Loads the group row with an exclusive row lock.
    ///
    /// Every mutating operation starts here: concurrent deltas against one
    /// group serialize on this lock, while other groups proceed in
    /// parallel. (On SQLite the clause is a no-op; the whole database
    /// transaction serializes instead.)
    pub(super) async fn require_group_for_update(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultLedger<groups::Model> {
        groups::Entity::find_by_id(group_id.to_string())
            .lock_exclusive()
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::NotFound("group".to_string()))
    }

    pub(super) async fn membership_status(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultLedger<Option<MembershipStatus>> {
        let row =
            memberships::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
                .one(db)
                .await?;
        row.as_ref()
            .map(|m| MembershipStatus::try_from(m.status.as_str()))
            .transpose()
    }

    /// Ensures `user_id` is an **active** member of the group; archived
    /// members are not eligible for new transactions.
    pub(super) async fn require_active_member(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultLedger<()> {
        match self.membership_status(db, group_id, user_id).await? {
            Some(MembershipStatus::Active) => Ok(()),
            Some(MembershipStatus::Archived) | None => Err(LedgerError::Validation(format!(
                "{user_id} is not an active member of the group"
            ))),
        }
    }

    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultLedger<()> {
        let exists = users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .is_some();
        if !exists {
            return Err(LedgerError::NotFound("user".to_string()));
        }
        Ok(())
    }

    pub(super) async fn active_member_ids(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultLedger<Vec<String>> {
        let rows = memberships::Entity::find()
            .filter(memberships::Column::GroupId.eq(group_id.to_string()))
            .filter(memberships::Column::Status.eq(MembershipStatus::Active.as_str()))
            .all(db)
            .await?;
        Ok(rows.into_iter().map(|m| m.user_id).collect())
    }

    pub(super) fn group_currency(model: &groups::Model) -> ResultLedger<Currency> {
        Currency::try_from(model.currency.as_str())
    }
}
