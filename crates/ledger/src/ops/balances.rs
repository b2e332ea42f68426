use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    BalanceDelta, EPSILON, LedgerError, MoneyCents, ResultLedger, net_balances, pair_balances,
    reducer::PairKey,
};

use super::{Ledger, with_tx};

/// One member's cached net balance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberBalance {
    pub user_id: String,
    pub balance: MoneyCents,
}

impl Ledger {
    /// Cached net balance of a member; a missing row reads as zero.
    ///
    /// Positive = the group owes the user.
    pub async fn net_balance(
        &self,
        group_id: &str,
        user_id: &str,
        acting_user: &str,
    ) -> ResultLedger<MoneyCents> {
        let group_id = group_id.to_string();
        let user_id = user_id.to_string();
        let acting_user = acting_user.to_string();
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, &group_id).await?;
            self.require_member_read(&db_tx, &group_id, &acting_user)
                .await?;

            let row = net_balances::Entity::find_by_id((group_id.clone(), user_id.clone()))
                .one(&db_tx)
                .await?;
            Ok(row
                .map(|r| MoneyCents::new(r.balance_minor))
                .unwrap_or(MoneyCents::ZERO))
        })
    }

    /// Cached net balances of every member with a row, ordered by username.
    pub async fn group_balances(
        &self,
        group_id: &str,
        acting_user: &str,
    ) -> ResultLedger<Vec<MemberBalance>> {
        let group_id = group_id.to_string();
        let acting_user = acting_user.to_string();
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, &group_id).await?;
            self.require_member_read(&db_tx, &group_id, &acting_user)
                .await?;

            let rows = net_balances::Entity::find()
                .filter(net_balances::Column::GroupId.eq(group_id.clone()))
                .order_by_asc(net_balances::Column::UserId)
                .all(&db_tx)
                .await?;
            Ok(rows
                .into_iter()
                .map(|r| MemberBalance {
                    user_id: r.user_id,
                    balance: MoneyCents::new(r.balance_minor),
                })
                .collect())
        })
    }

    /// Cached signed balance between two members; positive means `user_a`
    /// owes `user_b`, and a missing row reads as settled.
    pub async fn pair_balance(
        &self,
        group_id: &str,
        user_a: &str,
        user_b: &str,
        acting_user: &str,
    ) -> ResultLedger<MoneyCents> {
        let group_id = group_id.to_string();
        let user_a = user_a.to_string();
        let user_b = user_b.to_string();
        let acting_user = acting_user.to_string();
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, &group_id).await?;
            self.require_member_read(&db_tx, &group_id, &acting_user)
                .await?;

            let row = Self::find_pair_row(&db_tx, &group_id, &user_a, &user_b).await?;
            Ok(match row {
                Some(r) if r.debtor_id == user_a => MoneyCents::new(r.amount_minor),
                Some(r) => MoneyCents::new(-r.amount_minor),
                None => MoneyCents::ZERO,
            })
        })
    }

    pub(super) async fn require_member_read(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultLedger<()> {
        if self
            .membership_status(db, group_id, user_id)
            .await?
            .is_none()
        {
            return Err(LedgerError::NotFound("group".to_string()));
        }
        Ok(())
    }

    pub(super) async fn find_pair_row(
        db: &DatabaseTransaction,
        group_id: &str,
        user_a: &str,
        user_b: &str,
    ) -> ResultLedger<Option<pair_balances::Model>> {
        pair_balances::Entity::find()
            .filter(pair_balances::Column::GroupId.eq(group_id.to_string()))
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(pair_balances::Column::DebtorId.eq(user_a.to_string()))
                            .add(pair_balances::Column::CreditorId.eq(user_b.to_string())),
                    )
                    .add(
                        Condition::all()
                            .add(pair_balances::Column::DebtorId.eq(user_b.to_string()))
                            .add(pair_balances::Column::CreditorId.eq(user_a.to_string())),
                    ),
            )
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Applies an incremental delta to both caches, inside the caller's
    /// (already group-locked) transaction.
    ///
    /// Net rows are upserted and keep explicit zeros; pair rows are
    /// rewritten in their collapsed orientation and deleted once the value
    /// is negligible, so the reverse-direction row can never coexist.
    pub(super) async fn apply_deltas(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        delta: &BalanceDelta,
    ) -> ResultLedger<()> {
        for (user_id, amount) in delta.net_deltas() {
            let existing =
                net_balances::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
                    .one(db)
                    .await?;
            match existing {
                Some(row) => {
                    let updated = net_balances::ActiveModel {
                        group_id: ActiveValue::Set(row.group_id),
                        user_id: ActiveValue::Set(row.user_id),
                        balance_minor: ActiveValue::Set(row.balance_minor + amount.cents()),
                        revision: ActiveValue::Set(row.revision + 1),
                    };
                    updated.update(db).await?;
                }
                None => {
                    let inserted = net_balances::ActiveModel {
                        group_id: ActiveValue::Set(group_id.to_string()),
                        user_id: ActiveValue::Set(user_id.to_string()),
                        balance_minor: ActiveValue::Set(amount.cents()),
                        revision: ActiveValue::Set(1),
                    };
                    inserted.insert(db).await?;
                }
            }
        }

        for (key, amount) in delta.pair_deltas() {
            self.apply_pair_delta(db, group_id, key, amount).await?;
        }

        Ok(())
    }

    async fn apply_pair_delta(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        key: &PairKey,
        delta: MoneyCents,
    ) -> ResultLedger<()> {
        let existing = Self::find_pair_row(db, group_id, &key.first, &key.second).await?;

        // Collapse the stored row into the canonical signed value
        // ("first owes second" positive) before adding the delta.
        let (cached, row) = match existing {
            Some(r) if r.debtor_id == key.first => (MoneyCents::new(r.amount_minor), Some(r)),
            Some(r) => (MoneyCents::new(-r.amount_minor), Some(r)),
            None => (MoneyCents::ZERO, None),
        };
        let updated = cached + delta;

        let (debtor, creditor, amount) = if updated.is_negative() {
            (key.second.clone(), key.first.clone(), -updated)
        } else {
            (key.first.clone(), key.second.clone(), updated)
        };

        match row {
            Some(r) => {
                if updated.abs() <= EPSILON {
                    pair_balances::Entity::delete_by_id(r.id).exec(db).await?;
                } else {
                    let model = pair_balances::ActiveModel {
                        id: ActiveValue::Set(r.id),
                        group_id: ActiveValue::Set(r.group_id),
                        debtor_id: ActiveValue::Set(debtor),
                        creditor_id: ActiveValue::Set(creditor),
                        amount_minor: ActiveValue::Set(amount.cents()),
                        revision: ActiveValue::Set(r.revision + 1),
                    };
                    model.update(db).await?;
                }
            }
            None => {
                if updated.abs() > EPSILON {
                    let model = pair_balances::ActiveModel {
                        id: ActiveValue::Set(Uuid::new_v4().to_string()),
                        group_id: ActiveValue::Set(group_id.to_string()),
                        debtor_id: ActiveValue::Set(debtor),
                        creditor_id: ActiveValue::Set(creditor),
                        amount_minor: ActiveValue::Set(amount.cents()),
                        revision: ActiveValue::Set(1),
                    };
                    model.insert(db).await?;
                }
            }
        }

        Ok(())
    }
}
