use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use serde_json::json;

use crate::{
    AuditAction, Currency, Group, LedgerError, MembershipStatus, ResultLedger, groups,
    memberships, net_balances, users, util::normalize_required_name,
};

use super::{Ledger, with_tx};

impl Ledger {
    /// Registers a user. Usernames are the identity the whole ledger keys
    /// on, so an existing name is a conflict, not an upsert.
    pub async fn create_user(&self, username: &str, display_name: &str) -> ResultLedger<()> {
        let username = normalize_required_name(username, "user")?;
        let display_name = normalize_required_name(display_name, "display")?;
        with_tx!(self, |db_tx| {
            let existing = users::Entity::find_by_id(username.clone())
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(LedgerError::Conflict(format!(
                    "user {username} already exists"
                )));
            }
            let user = users::ActiveModel {
                username: ActiveValue::Set(username.clone()),
                display_name: ActiveValue::Set(display_name.clone()),
            };
            user.insert(&db_tx).await?;
            Ok(())
        })
    }

    /// Creates a group and, in the same unit of work, the creator's active
    /// membership and their zero net-balance row.
    pub async fn create_group(
        &self,
        name: &str,
        created_by: &str,
        currency: Option<Currency>,
    ) -> ResultLedger<String> {
        let name = normalize_required_name(name, "group")?;
        let created_by = created_by.to_string();
        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, &created_by).await?;

            let group = Group::new(name.clone(), &created_by, currency.unwrap_or_default());
            let group_id = group.id.clone();
            groups::ActiveModel::from(&group).insert(&db_tx).await?;

            let now = Utc::now();
            let membership = memberships::ActiveModel {
                group_id: ActiveValue::Set(group_id.clone()),
                user_id: ActiveValue::Set(created_by.clone()),
                status: ActiveValue::Set(MembershipStatus::Active.as_str().to_string()),
                joined_at: ActiveValue::Set(now),
            };
            membership.insert(&db_tx).await?;

            let net = net_balances::ActiveModel {
                group_id: ActiveValue::Set(group_id.clone()),
                user_id: ActiveValue::Set(created_by.clone()),
                balance_minor: ActiveValue::Set(0),
                revision: ActiveValue::Set(1),
            };
            net.insert(&db_tx).await?;

            self.append_audit(
                &db_tx,
                &group_id,
                &created_by,
                AuditAction::MemberAdded,
                json!({ "user_id": created_by, "founding": true }),
            )
            .await?;

            Ok(group_id)
        })
    }

    /// Returns a group; the actor must be a member (any status).
    pub async fn group(&self, group_id: &str, user_id: &str) -> ResultLedger<Group> {
        let group_id = group_id.to_string();
        let user_id = user_id.to_string();
        with_tx!(self, |db_tx| {
            let model = self.require_group(&db_tx, &group_id).await?;
            if self
                .membership_status(&db_tx, &group_id, &user_id)
                .await?
                .is_none()
            {
                return Err(LedgerError::NotFound("group".to_string()));
            }
            Group::try_from(model)
        })
    }
}
