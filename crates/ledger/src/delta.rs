//! Incremental cache deltas.
//!
//! A [`BalanceDelta`] is the minimal adjustment a single committed mutation
//! implies for the cached balances, expressed as per-user and per-pair
//! signed amounts. The one rule that matters: an update is modeled as
//! **reverse(old) + apply(new)**, never as a field-level diff. Reversing the
//! whole old transaction and applying the whole new one makes it impossible
//! to leave stale participant shares behind when an edit changes the split.

use std::collections::HashMap;

use crate::{Expense, MoneyCents, Payment, reducer::PairKey};

/// Accumulated net and pairwise adjustments for one mutation.
#[derive(Clone, Debug, Default)]
pub struct BalanceDelta {
    net: HashMap<String, MoneyCents>,
    pairs: HashMap<PairKey, MoneyCents>,
}

impl BalanceDelta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a created expense into the delta.
    pub fn add_expense(&mut self, expense: &Expense) {
        self.apply_expense(expense, 1);
    }

    /// Folds the reversal of an expense (deletion, or the "old" half of an
    /// update) into the delta.
    pub fn remove_expense(&mut self, expense: &Expense) {
        self.apply_expense(expense, -1);
    }

    pub fn add_payment(&mut self, payment: &Payment) {
        self.apply_payment(payment, 1);
    }

    pub fn remove_payment(&mut self, payment: &Payment) {
        self.apply_payment(payment, -1);
    }

    fn apply_expense(&mut self, expense: &Expense, sign: i64) {
        let payer_credit = expense.amount - expense.payer_share();
        self.bump_net(&expense.payer_id, scale(payer_credit, sign));

        for share in &expense.shares {
            if share.user_id == expense.payer_id {
                continue;
            }
            self.bump_net(&share.user_id, scale(-share.amount, sign));

            let key = PairKey::new(&share.user_id, &expense.payer_id);
            let pair_sign = key.debt_sign(&share.user_id);
            self.bump_pair(key, MoneyCents::new(pair_sign * sign * share.amount.cents()));
        }
    }

    fn apply_payment(&mut self, payment: &Payment, sign: i64) {
        self.bump_net(&payment.payer_id, scale(payment.amount, sign));
        self.bump_net(&payment.payee_id, scale(-payment.amount, sign));

        let key = PairKey::new(&payment.payer_id, &payment.payee_id);
        let pair_sign = key.debt_sign(&payment.payer_id);
        self.bump_pair(key, MoneyCents::new(-pair_sign * sign * payment.amount.cents()));
    }

    fn bump_net(&mut self, user_id: &str, amount: MoneyCents) {
        if amount.is_zero() {
            return;
        }
        *self.net.entry(user_id.to_string()).or_default() += amount;
    }

    fn bump_pair(&mut self, key: PairKey, amount: MoneyCents) {
        if amount.is_zero() {
            return;
        }
        *self.pairs.entry(key).or_default() += amount;
    }

    /// Per-user net adjustments, zero entries dropped.
    pub fn net_deltas(&self) -> impl Iterator<Item = (&str, MoneyCents)> {
        self.net
            .iter()
            .filter(|(_, v)| !v.is_zero())
            .map(|(k, v)| (k.as_str(), *v))
    }

    /// Per-pair signed adjustments ("first owes second" positive), zero
    /// entries dropped.
    pub fn pair_deltas(&self) -> impl Iterator<Item = (&PairKey, MoneyCents)> {
        self.pairs
            .iter()
            .filter(|(_, v)| !v.is_zero())
            .map(|(k, v)| (k, *v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.net.values().all(|v| v.is_zero()) && self.pairs.values().all(|v| v.is_zero())
    }
}

fn scale(amount: MoneyCents, sign: i64) -> MoneyCents {
    MoneyCents::new(amount.cents() * sign)
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

    #[test]
    fn add_then_remove_cancels_out() {
        let e = expense("a", 6000, &[("a", 2000), ("b", 2000), ("c", 2000)]);
        let mut delta = BalanceDelta::new();
        delta.add_expense(&e);
        assert!(!delta.is_empty());
        delta.remove_expense(&e);
        assert!(delta.is_empty());
    }

    #[test]
    fn update_reverses_old_shares_entirely() {
        // The drift class this guards against: participants change on edit
        // and the old shares are left in the cache.
        let old = expense("a", 3000, &[("b", 1500), ("c", 1500)]);
        let mut new = expense("a", 3000, &[("b", 3000)]);
        new.id = old.id;

        let mut delta = BalanceDelta::new();
        delta.remove_expense(&old);
        delta.add_expense(&new);

        let net: HashMap<&str, MoneyCents> = delta.net_deltas().collect();
        // a's credit is unchanged (total and own share identical): no entry.
        assert!(!net.contains_key("a"));
        assert_eq!(net["b"], MoneyCents::new(-1500));
        assert_eq!(net["c"], MoneyCents::new(1500));

        let pairs: HashMap<PairKey, MoneyCents> =
            delta.pair_deltas().map(|(k, v)| (k.clone(), v)).collect();
        assert_eq!(pairs[&PairKey::new("b", "a")], MoneyCents::new(1500));
        assert_eq!(pairs[&PairKey::new("c", "a")], MoneyCents::new(1500));
    }

    #[test]
    fn payment_delta_offsets_expense_debt() {
        let e = expense("a", 4000, &[("a", 2000), ("b", 2000)]);
        let p = crate::Payment::new(
            "g".to_string(),
            "b".to_string(),
            "a".to_string(),
            MoneyCents::new(2000),
            Currency::Eur,
            None,
            Utc::now(),
            "b".to_string(),
            None,
        )
        .unwrap();

        let mut delta = BalanceDelta::new();
        delta.add_expense(&e);
        delta.add_payment(&p);
        assert!(delta.is_empty());
    }
}
