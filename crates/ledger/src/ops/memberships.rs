use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use serde_json::json;

use crate::{
    AuditAction, LedgerError, MembershipStatus, MoneyCents, ResultLedger, memberships,
    net_balances, pair_balances,
};

use super::{Ledger, with_tx};

/// A member with their status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberView {
    pub user_id: String,
    pub status: MembershipStatus,
    pub joined_at: DateTime<Utc>,
}

impl Ledger {
    /// Adds a user to a group, or re-activates an archived membership.
    pub async fn add_member(
        &self,
        group_id: &str,
        member_username: &str,
        acting_user: &str,
    ) -> ResultLedger<()> {
        let group_id = group_id.to_string();
        let member_username = member_username.to_string();
        let acting_user = acting_user.to_string();

        with_tx!(self, |db_tx| {
            self.require_group_for_update(&db_tx, &group_id).await?;
            self.require_active_member(&db_tx, &group_id, &acting_user)
                .await?;
            self.require_user_exists(&db_tx, &member_username).await?;

            let status = self
                .membership_status(&db_tx, &group_id, &member_username)
                .await?;
            match status {
                Some(MembershipStatus::Active) => {
                    return Err(LedgerError::Conflict(format!(
                        "{member_username} is already an active member"
                    )));
                }
                Some(MembershipStatus::Archived) => {
                    let membership = memberships::ActiveModel {
                        group_id: ActiveValue::Set(group_id.clone()),
                        user_id: ActiveValue::Set(member_username.clone()),
                        status: ActiveValue::Set(
                            MembershipStatus::Active.as_str().to_string(),
                        ),
                        ..Default::default()
                    };
                    membership.update(&db_tx).await?;
                }
                None => {
                    let membership = memberships::ActiveModel {
                        group_id: ActiveValue::Set(group_id.clone()),
                        user_id: ActiveValue::Set(member_username.clone()),
                        status: ActiveValue::Set(
                            MembershipStatus::Active.as_str().to_string(),
                        ),
                        joined_at: ActiveValue::Set(Utc::now()),
                    };
                    membership.insert(&db_tx).await?;
                }
            }

            // Active members always carry an explicit net row, zero included.
            let existing_net = net_balances::Entity::find_by_id((
                group_id.clone(),
                member_username.clone(),
            ))
            .one(&db_tx)
            .await?;
            if existing_net.is_none() {
                let net = net_balances::ActiveModel {
                    group_id: ActiveValue::Set(group_id.clone()),
                    user_id: ActiveValue::Set(member_username.clone()),
                    balance_minor: ActiveValue::Set(0),
                    revision: ActiveValue::Set(1),
                };
                net.insert(&db_tx).await?;
            }

            self.append_audit(
                &db_tx,
                &group_id,
                &acting_user,
                AuditAction::MemberAdded,
                json!({
                    "user_id": member_username,
                    "reactivated": status == Some(MembershipStatus::Archived),
                }),
            )
            .await?;

            Ok(())
        })
    }

    /// Lists members of a group with their status, archived included.
    pub async fn list_members(
        &self,
        group_id: &str,
        acting_user: &str,
    ) -> ResultLedger<Vec<MemberView>> {
        let group_id = group_id.to_string();
        let acting_user = acting_user.to_string();
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, &group_id).await?;
            self.require_member_read(&db_tx, &group_id, &acting_user)
                .await?;

            let rows = memberships::Entity::find()
                .filter(memberships::Column::GroupId.eq(group_id.clone()))
                .order_by_asc(memberships::Column::UserId)
                .all(&db_tx)
                .await?;
            rows.into_iter()
                .map(|m| {
                    Ok(MemberView {
                        status: MembershipStatus::try_from(m.status.as_str())?,
                        user_id: m.user_id,
                        joined_at: m.joined_at,
                    })
                })
                .collect()
        })
    }

    /// Removes (archives) a member.
    ///
    /// The guard: a member leaves only settled. Balances are first
    /// reconciled against the transaction store, then the cached net
    /// balance must be zero and no pairwise row may name the member. The
    /// membership itself is archived, never deleted, so historical
    /// attributions stay valid.
    pub async fn remove_member(
        &self,
        group_id: &str,
        member_username: &str,
        acting_user: &str,
    ) -> ResultLedger<()> {
        // Repair any drift before trusting the cache for the precondition.
        self.reconcile(group_id, acting_user).await?;

        let group_id = group_id.to_string();
        let member_username = member_username.to_string();
        let acting_user = acting_user.to_string();

        with_tx!(self, |db_tx| {
            self.require_group_for_update(&db_tx, &group_id).await?;
            self.require_active_member(&db_tx, &group_id, &acting_user)
                .await?;

            match self
                .membership_status(&db_tx, &group_id, &member_username)
                .await?
            {
                Some(MembershipStatus::Active) => {}
                Some(MembershipStatus::Archived) => {
                    return Err(LedgerError::Validation(format!(
                        "{member_username} is already archived"
                    )));
                }
                None => return Err(LedgerError::NotFound("membership".to_string())),
            }

            let net_row = net_balances::Entity::find_by_id((
                group_id.clone(),
                member_username.clone(),
            ))
            .one(&db_tx)
            .await?;
            let net = net_row
                .as_ref()
                .map(|r| MoneyCents::new(r.balance_minor))
                .unwrap_or(MoneyCents::ZERO);
            if !net.is_negligible() {
                return Err(LedgerError::Precondition(format!(
                    "cannot remove {member_username}: net balance is {net}"
                )));
            }

            let pair_rows = pair_balances::Entity::find()
                .filter(pair_balances::Column::GroupId.eq(group_id.clone()))
                .filter(
                    Condition::any()
                        .add(pair_balances::Column::DebtorId.eq(member_username.clone()))
                        .add(pair_balances::Column::CreditorId.eq(member_username.clone())),
                )
                .all(&db_tx)
                .await?;
            if !pair_rows.is_empty() {
                let owed: Vec<String> = pair_rows
                    .iter()
                    .map(|r| {
                        format!(
                            "{} owes {} {}",
                            r.debtor_id,
                            r.creditor_id,
                            MoneyCents::new(r.amount_minor)
                        )
                    })
                    .collect();
                return Err(LedgerError::Precondition(format!(
                    "cannot remove {member_username}: unsettled balances ({})",
                    owed.join("; ")
                )));
            }

            let membership = memberships::ActiveModel {
                group_id: ActiveValue::Set(group_id.clone()),
                user_id: ActiveValue::Set(member_username.clone()),
                status: ActiveValue::Set(MembershipStatus::Archived.as_str().to_string()),
                ..Default::default()
            };
            membership.update(&db_tx).await?;

            if net_row.is_some() {
                net_balances::Entity::delete_by_id((group_id.clone(), member_username.clone()))
                    .exec(&db_tx)
                    .await?;
            }

            self.append_audit(
                &db_tx,
                &group_id,
                &acting_user,
                AuditAction::MemberArchived,
                json!({ "user_id": member_username }),
            )
            .await?;

            Ok(())
        })
    }
}
