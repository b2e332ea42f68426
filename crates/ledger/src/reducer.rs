//! Ground-truth balance reducers.
//!
//! These are pure functions over a group's full transaction set. They are
//! the only legitimate definition of a correct balance: a single linear,
//! order-independent pass that sums stored share amounts, so re-running a
//! reducer over the same history always yields the same result. The cache
//! writer and the reconciler are both defined against them.
//!
//! The net and pairwise views are derived along *independent* paths from
//! the same transactions, so the reconciler can cross-check two
//! differently-shaped computations against one store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Expense, MoneyCents, Payment};

/// Canonical unordered pair of members.
///
/// `first` always sorts lexicographically before `second`; a signed amount
/// attached to the key means "`first` owes `second`" when positive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub first: String,
    pub second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self {
                first: a.to_string(),
                second: b.to_string(),
            }
        } else {
            Self {
                first: b.to_string(),
                second: a.to_string(),
            }
        }
    }

    /// Sign of a debt of `debtor` within this pair's canonical orientation.
    pub(crate) fn debt_sign(&self, debtor: &str) -> i64 {
        if debtor == self.first { 1 } else { -1 }
    }
}

/// Computes every member's net balance from the full transaction set.
///
/// Seeds zero for each name in `members`, then for every live expense
/// credits the payer with `total − own share` and debits each non-payer
/// participant by their share; every live payment debits the payer and
/// credits the payee. Users referenced only by history (archived members)
/// get an entry on demand, so conservation holds over the whole map.
pub fn net_balances<S: AsRef<str>>(
    members: &[S],
    expenses: &[Expense],
    payments: &[Payment],
) -> HashMap<String, MoneyCents> {
    let mut balances: HashMap<String, MoneyCents> = members
        .iter()
        .map(|m| (m.as_ref().to_string(), MoneyCents::ZERO))
        .collect();

    for expense in expenses.iter().filter(|e| !e.is_deleted()) {
        let payer_credit = expense.amount - expense.payer_share();
        *balances.entry(expense.payer_id.clone()).or_default() += payer_credit;
        for share in &expense.shares {
            if share.user_id != expense.payer_id {
                *balances.entry(share.user_id.clone()).or_default() -= share.amount;
            }
        }
    }

    for payment in payments.iter().filter(|p| !p.is_deleted()) {
        *balances.entry(payment.payer_id.clone()).or_default() += payment.amount;
        *balances.entry(payment.payee_id.clone()).or_default() -= payment.amount;
    }

    balances
}

/// Computes the signed balance between two members; positive means `a`
/// owes `b`.
pub fn pair_balance(expenses: &[Expense], payments: &[Payment], a: &str, b: &str) -> MoneyCents {
    let mut total = MoneyCents::ZERO;

    for expense in expenses.iter().filter(|e| !e.is_deleted()) {
        if expense.payer_id == b {
            if let Some(share) = expense.shares.iter().find(|s| s.user_id == a) {
                total += share.amount;
            }
        } else if expense.payer_id == a
            && let Some(share) = expense.shares.iter().find(|s| s.user_id == b)
        {
            total -= share.amount;
        }
    }

    for payment in payments.iter().filter(|p| !p.is_deleted()) {
        if payment.payer_id == a && payment.payee_id == b {
            total -= payment.amount;
        } else if payment.payer_id == b && payment.payee_id == a {
            total += payment.amount;
        }
    }

    total
}

/// Computes all pairwise balances in one pass, keyed canonically with the
/// "`first` owes `second` when positive" sign convention.
///
/// Pairs whose collapsed value is within one cent of zero are omitted: a
/// settled pair is represented by absence.
pub fn pair_balances(
    expenses: &[Expense],
    payments: &[Payment],
) -> HashMap<PairKey, MoneyCents> {
    let mut pairs: HashMap<PairKey, MoneyCents> = HashMap::new();

    for expense in expenses.iter().filter(|e| !e.is_deleted()) {
        for share in &expense.shares {
            if share.user_id == expense.payer_id {
                continue;
            }
            let key = PairKey::new(&share.user_id, &expense.payer_id);
            let sign = key.debt_sign(&share.user_id);
            *pairs.entry(key).or_default() += MoneyCents::new(sign * share.amount.cents());
        }
    }

    for payment in payments.iter().filter(|p| !p.is_deleted()) {
        let key = PairKey::new(&payment.payer_id, &payment.payee_id);
        let sign = key.debt_sign(&payment.payer_id);
        *pairs.entry(key).or_default() -= MoneyCents::new(sign * payment.amount.cents());
    }

    pairs.retain(|_, amount| !amount.is_negligible());
    pairs
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{Currency, Share};

    fn expense(payer: &str, total: i64, shares: &[(&str, i64)]) -> Expense {
        let mut e = Expense::new(
            "g".to_string(),
            payer.to_string(),
            MoneyCents::new(total),
            Currency::Eur,
            None,
            Utc::now(),
            payer.to_string(),
            None,
        )
        .unwrap();
        e.shares = shares
            .iter()
            .map(|(user, cents)| Share::new(e.id, user.to_string(), MoneyCents::new(*cents)))
            .collect();
        e
    }

    fn payment(payer: &str, payee: &str, amount: i64) -> Payment {
        Payment::new(
            "g".to_string(),
            payer.to_string(),
            payee.to_string(),
            MoneyCents::new(amount),
            Currency::Eur,
            None,
            Utc::now(),
            payer.to_string(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn dinner_split_credits_payer_and_debits_others() {
        let dinner = expense("a", 6000, &[("a", 2000), ("b", 2000), ("c", 2000)]);
        let balances = net_balances(&["a", "b", "c"], &[dinner], &[]);

        assert_eq!(balances["a"], MoneyCents::new(4000));
        assert_eq!(balances["b"], MoneyCents::new(-2000));
        assert_eq!(balances["c"], MoneyCents::new(-2000));
        assert_eq!(balances.values().copied().sum::<MoneyCents>(), MoneyCents::ZERO);
    }

    #[test]
    fn payment_settles_one_debtor() {
        let dinner = expense("a", 6000, &[("a", 2000), ("b", 2000), ("c", 2000)]);
        let settle = payment("b", "a", 2000);
        let balances = net_balances(&["a", "b", "c"], &[dinner.clone()], &[settle.clone()]);

        assert_eq!(balances["a"], MoneyCents::new(2000));
        assert_eq!(balances["b"], MoneyCents::ZERO);
        assert_eq!(balances["c"], MoneyCents::new(-2000));

        let pairs = pair_balances(&[dinner], &[settle]);
        assert_eq!(pairs.len(), 1);
        let key = PairKey::new("a", "c");
        // c owes a: canonical key is (a, c), so the signed value is negative.
        assert_eq!(pairs[&key], MoneyCents::new(-2000));
    }

    #[test]
    fn deleting_an_expense_reverses_only_its_contribution() {
        let mut dinner = expense("a", 6000, &[("a", 2000), ("b", 2000), ("c", 2000)]);
        let settle = payment("b", "a", 2000);
        dinner.deleted_at = Some(Utc::now());

        let balances = net_balances(&["a", "b", "c"], &[dinner], &[settle]);
        assert_eq!(balances["a"], MoneyCents::new(-2000));
        assert_eq!(balances["b"], MoneyCents::new(2000));
        assert_eq!(balances["c"], MoneyCents::ZERO);
    }

    #[test]
    fn pair_balance_is_signed_and_antisymmetric() {
        let dinner = expense("a", 6000, &[("a", 2000), ("b", 2000), ("c", 2000)]);
        let txs = [dinner];

        assert_eq!(pair_balance(&txs, &[], "b", "a"), MoneyCents::new(2000));
        assert_eq!(pair_balance(&txs, &[], "a", "b"), MoneyCents::new(-2000));
        assert_eq!(pair_balance(&txs, &[], "b", "c"), MoneyCents::ZERO);
    }

    #[test]
    fn pair_views_agree_with_each_other() {
        let e1 = expense("a", 3000, &[("b", 1500), ("c", 1500)]);
        let e2 = expense("b", 1000, &[("a", 400), ("b", 600)]);
        let p1 = payment("c", "a", 500);
        let expenses = [e1, e2];
        let payments = [p1];

        let pairs = pair_balances(&expenses, &payments);
        for (key, signed) in &pairs {
            assert_eq!(
                pair_balance(&expenses, &payments, &key.first, &key.second),
                *signed
            );
        }
    }

    #[test]
    fn settled_pairs_are_absent() {
        let dinner = expense("a", 4000, &[("a", 2000), ("b", 2000)]);
        let settle = payment("b", "a", 2000);
        assert!(pair_balances(&[dinner], &[settle]).is_empty());
    }

    #[test]
    fn payer_without_own_share_is_credited_in_full() {
        let treat = expense("a", 3000, &[("b", 1500), ("c", 1500)]);
        let balances = net_balances(&["a", "b", "c"], &[treat], &[]);
        assert_eq!(balances["a"], MoneyCents::new(3000));
        assert_eq!(balances["b"], MoneyCents::new(-1500));
    }

    #[test]
    fn pair_key_orders_lexicographically() {
        assert_eq!(PairKey::new("zoe", "amir"), PairKey::new("amir", "zoe"));
        let key = PairKey::new("zoe", "amir");
        assert_eq!(key.first, "amir");
        assert_eq!(key.debt_sign("zoe"), -1);
        assert_eq!(key.debt_sign("amir"), 1);
    }
}
