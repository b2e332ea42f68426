use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AuditAction, EPSILON, Expense, LedgerError, MoneyCents, Payment, ResultLedger, expenses,
    net_balances, pair_balances, payments,
    reducer::{self, PairKey},
};

use super::{Ledger, with_tx};

const MAX_RECONCILE_ATTEMPTS: u32 = 3;

/// What a diff is about: one member's net balance, or one pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffSubject {
    Net { user_id: String },
    Pair { first: String, second: String },
}

/// One detected mismatch between the cache and the reducers.
///
/// Pair values are signed in the canonical "`first` owes `second`"
/// orientation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub subject: DiffSubject,
    pub cached: MoneyCents,
    pub computed: MoneyCents,
}

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug)]
pub struct ReconcileReport {
    pub group_id: String,
    pub repaired: bool,
    pub diffs: Vec<Diff>,
}

struct Snapshot {
    members: Vec<String>,
    computed_net: HashMap<String, MoneyCents>,
    computed_pairs: HashMap<PairKey, MoneyCents>,
    net_revisions: HashMap<String, i64>,
    pair_revisions: HashMap<String, i64>,
    diffs: Vec<Diff>,
}

impl Ledger {
    /// Recomputes both balance views from the transaction store and repairs
    /// any cache drift.
    ///
    /// The reducers win every disagreement: they are defined directly on
    /// the transaction log and carry no incremental state to drift. Drift
    /// is repaired in place, audited and logged — it is an operational
    /// signal, never a request failure. The pass is idempotent and safe to
    /// run at any time.
    pub async fn reconcile(&self, group_id: &str, actor: &str) -> ResultLedger<ReconcileReport> {
        for _ in 0..MAX_RECONCILE_ATTEMPTS {
            if let Some(report) = self.reconcile_once(group_id, actor).await? {
                return Ok(report);
            }
            tracing::debug!(group_id, "reconcile raced a concurrent mutation, retrying");
        }
        Err(LedgerError::Conflict(
            "reconciliation kept racing concurrent mutations".to_string(),
        ))
    }

    /// One snapshot → compare → repair pass.
    ///
    /// Returns `None` when a concurrent mutation moved a cache row between
    /// the snapshot read and the repair write (detected via row revisions),
    /// in which case the caller retries from a fresh snapshot.
    async fn reconcile_once(
        &self,
        group_id: &str,
        actor: &str,
    ) -> ResultLedger<Option<ReconcileReport>> {
        let snapshot = with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            self.snapshot_group(&db_tx, group_id).await
        })?;

        if snapshot.diffs.is_empty() {
            return Ok(Some(ReconcileReport {
                group_id: group_id.to_string(),
                repaired: false,
                diffs: Vec::new(),
            }));
        }

        let repaired = with_tx!(self, |db_tx| {
            // Serialize with mutations on the same group before re-checking.
            self.require_group_for_update(&db_tx, group_id).await?;

            let net_rows = Self::load_net_rows(&db_tx, group_id).await?;
            let pair_rows = Self::load_pair_rows(&db_tx, group_id).await?;
            let net_now: HashMap<String, i64> = net_rows
                .iter()
                .map(|r| (r.user_id.clone(), r.revision))
                .collect();
            let pair_now: HashMap<String, i64> = pair_rows
                .iter()
                .map(|r| (r.id.clone(), r.revision))
                .collect();

            if net_now != snapshot.net_revisions || pair_now != snapshot.pair_revisions {
                Ok(false)
            } else {
                self.overwrite_caches(&db_tx, group_id, &snapshot, net_rows, pair_rows)
                    .await?;

                self.append_audit(
                    &db_tx,
                    group_id,
                    actor,
                    AuditAction::BalanceRepaired,
                    json!({ "diffs": &snapshot.diffs }),
                )
                .await?;

                Ok(true)
            }
        })?;

        if repaired {
            tracing::warn!(
                group_id,
                diffs = snapshot.diffs.len(),
                "balance cache drift repaired"
            );
            Ok(Some(ReconcileReport {
                group_id: group_id.to_string(),
                repaired: true,
                diffs: snapshot.diffs,
            }))
        } else {
            Ok(None)
        }
    }

    async fn snapshot_group(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultLedger<Snapshot> {
        let members = self.active_member_ids(db, group_id).await?;

        let expense_models = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .filter(expenses::Column::DeletedAt.is_null())
            .all(db)
            .await?;
        let mut group_expenses = expense_models
            .into_iter()
            .map(Expense::try_from)
            .collect::<ResultLedger<Vec<_>>>()?;
        self.attach_shares(db, &mut group_expenses).await?;

        let payment_models = payments::Entity::find()
            .filter(payments::Column::GroupId.eq(group_id.to_string()))
            .filter(payments::Column::DeletedAt.is_null())
            .all(db)
            .await?;
        let group_payments = payment_models
            .into_iter()
            .map(Payment::try_from)
            .collect::<ResultLedger<Vec<_>>>()?;

        let computed_net = reducer::net_balances(&members, &group_expenses, &group_payments);
        let computed_pairs = reducer::pair_balances(&group_expenses, &group_payments);

        let net_rows = Self::load_net_rows(db, group_id).await?;
        let pair_rows = Self::load_pair_rows(db, group_id).await?;

        let mut diffs = Vec::new();

        let cached_net: HashMap<String, MoneyCents> = net_rows
            .iter()
            .map(|r| (r.user_id.clone(), MoneyCents::new(r.balance_minor)))
            .collect();
        let mut net_users: Vec<&String> =
            cached_net.keys().chain(computed_net.keys()).collect();
        net_users.sort();
        net_users.dedup();
        for user in net_users {
            let cached = cached_net.get(user).copied().unwrap_or(MoneyCents::ZERO);
            let computed = computed_net.get(user).copied().unwrap_or(MoneyCents::ZERO);
            if (cached - computed).abs() > EPSILON {
                diffs.push(Diff {
                    subject: DiffSubject::Net {
                        user_id: user.clone(),
                    },
                    cached,
                    computed,
                });
            }
        }

        // Fold cached pair rows into canonical signed values; a pair with
        // both orientations present is drift by construction.
        let mut cached_pairs: HashMap<PairKey, MoneyCents> = HashMap::new();
        let mut duplicated: HashSet<PairKey> = HashSet::new();
        for row in &pair_rows {
            let key = PairKey::new(&row.debtor_id, &row.creditor_id);
            let sign = key.debt_sign(&row.debtor_id);
            if cached_pairs.contains_key(&key) {
                duplicated.insert(key.clone());
            }
            *cached_pairs.entry(key).or_default() += MoneyCents::new(sign * row.amount_minor);
        }
        let mut pair_keys: Vec<&PairKey> =
            cached_pairs.keys().chain(computed_pairs.keys()).collect();
        pair_keys.sort_by(|a, b| (&a.first, &a.second).cmp(&(&b.first, &b.second)));
        pair_keys.dedup();
        for key in pair_keys {
            let cached = cached_pairs.get(key).copied().unwrap_or(MoneyCents::ZERO);
            let computed = computed_pairs.get(key).copied().unwrap_or(MoneyCents::ZERO);
            if (cached - computed).abs() > EPSILON || duplicated.contains(key) {
                diffs.push(Diff {
                    subject: DiffSubject::Pair {
                        first: key.first.clone(),
                        second: key.second.clone(),
                    },
                    cached,
                    computed,
                });
            }
        }

        Ok(Snapshot {
            members,
            computed_net,
            computed_pairs,
            net_revisions: net_rows
                .iter()
                .map(|r| (r.user_id.clone(), r.revision))
                .collect(),
            pair_revisions: pair_rows
                .iter()
                .map(|r| (r.id.clone(), r.revision))
                .collect(),
            diffs,
        })
    }

    /// Replaces both caches with the reducer output.
    ///
    /// Net rows are kept for every active member (explicit zeros) and for
    /// any user the history still gives a non-negligible balance; pair rows
    /// are rebuilt from scratch in collapsed orientation.
    async fn overwrite_caches(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        snapshot: &Snapshot,
        net_rows: Vec<net_balances::Model>,
        pair_rows: Vec<pair_balances::Model>,
    ) -> ResultLedger<()> {
        let member_set: HashSet<&str> = snapshot.members.iter().map(String::as_str).collect();
        let mut target_net: HashMap<&str, MoneyCents> = snapshot
            .computed_net
            .iter()
            .filter(|(user, value)| {
                member_set.contains(user.as_str()) || !value.is_negligible()
            })
            .map(|(user, value)| (user.as_str(), *value))
            .collect();

        for row in net_rows {
            match target_net.remove(row.user_id.as_str()) {
                Some(value) => {
                    let updated = net_balances::ActiveModel {
                        group_id: ActiveValue::Set(row.group_id),
                        user_id: ActiveValue::Set(row.user_id),
                        balance_minor: ActiveValue::Set(value.cents()),
                        revision: ActiveValue::Set(row.revision + 1),
                    };
                    updated.update(db).await?;
                }
                None => {
                    net_balances::Entity::delete_by_id((row.group_id, row.user_id))
                        .exec(db)
                        .await?;
                }
            }
        }
        for (user, value) in target_net {
            let inserted = net_balances::ActiveModel {
                group_id: ActiveValue::Set(group_id.to_string()),
                user_id: ActiveValue::Set(user.to_string()),
                balance_minor: ActiveValue::Set(value.cents()),
                revision: ActiveValue::Set(1),
            };
            inserted.insert(db).await?;
        }

        for row in pair_rows {
            pair_balances::Entity::delete_by_id(row.id).exec(db).await?;
        }
        for (key, signed) in &snapshot.computed_pairs {
            let (debtor, creditor, amount) = if signed.is_negative() {
                (key.second.clone(), key.first.clone(), -*signed)
            } else {
                (key.first.clone(), key.second.clone(), *signed)
            };
            let inserted = pair_balances::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                group_id: ActiveValue::Set(group_id.to_string()),
                debtor_id: ActiveValue::Set(debtor),
                creditor_id: ActiveValue::Set(creditor),
                amount_minor: ActiveValue::Set(amount.cents()),
                revision: ActiveValue::Set(1),
            };
            inserted.insert(db).await?;
        }

        Ok(())
    }

    async fn load_net_rows(
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultLedger<Vec<net_balances::Model>> {
        net_balances::Entity::find()
            .filter(net_balances::Column::GroupId.eq(group_id.to_string()))
            .all(db)
            .await
            .map_err(Into::into)
    }

    async fn load_pair_rows(
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultLedger<Vec<pair_balances::Model>> {
        pair_balances::Entity::find()
            .filter(pair_balances::Column::GroupId.eq(group_id.to_string()))
            .all(db)
            .await
            .map_err(Into::into)
    }

}
