//! Command structs for ledger write operations.
//!
//! These types group parameters for the write surface (expenses, payments),
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::MoneyCents;

/// One participant's slice of an expense, as supplied by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareSpec {
    pub user_id: String,
    pub amount: MoneyCents,
}

impl ShareSpec {
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount: MoneyCents) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
        }
    }
}

/// Create an expense.
#[derive(Clone, Debug)]
pub struct CreateExpenseCmd {
    pub group_id: String,
    pub payer_id: String,
    pub amount: MoneyCents,
    pub shares: Vec<ShareSpec>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
    pub idempotency_key: Option<String>,
}

impl CreateExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        user_id: impl Into<String>,
        payer_id: impl Into<String>,
        amount: MoneyCents,
        shares: Vec<ShareSpec>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            payer_id: payer_id.into(),
            amount,
            shares,
            description: None,
            occurred_at,
            user_id: user_id.into(),
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Update an existing expense.
///
/// Unset fields keep their current value; a set `shares` replaces the whole
/// participant set. Internally the ledger reverses the old expense and
/// applies the new one, so partial share updates cannot leave stale cache
/// rows behind.
#[derive(Clone, Debug)]
pub struct UpdateExpenseCmd {
    pub group_id: String,
    pub expense_id: Uuid,
    pub user_id: String,

    pub payer_id: Option<String>,
    pub amount: Option<MoneyCents>,
    pub shares: Option<Vec<ShareSpec>>,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl UpdateExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        expense_id: Uuid,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            expense_id,
            user_id: user_id.into(),
            payer_id: None,
            amount: None,
            shares: None,
            description: None,
            occurred_at: None,
        }
    }

    #[must_use]
    pub fn payer_id(mut self, payer_id: impl Into<String>) -> Self {
        self.payer_id = Some(payer_id.into());
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn shares(mut self, shares: Vec<ShareSpec>) -> Self {
        self.shares = Some(shares);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}

/// Create a payment (direct settlement between two members).
#[derive(Clone, Debug)]
pub struct CreatePaymentCmd {
    pub group_id: String,
    pub payer_id: String,
    pub payee_id: String,
    pub amount: MoneyCents,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
    pub idempotency_key: Option<String>,
}

impl CreatePaymentCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        user_id: impl Into<String>,
        payer_id: impl Into<String>,
        payee_id: impl Into<String>,
        amount: MoneyCents,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            payer_id: payer_id.into(),
            payee_id: payee_id.into(),
            amount,
            note: None,
            occurred_at,
            user_id: user_id.into(),
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Update an existing payment. Unset fields keep their current value.
#[derive(Clone, Debug)]
pub struct UpdatePaymentCmd {
    pub group_id: String,
    pub payment_id: Uuid,
    pub user_id: String,

    pub payer_id: Option<String>,
    pub payee_id: Option<String>,
    pub amount: Option<MoneyCents>,
    pub note: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl UpdatePaymentCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        payment_id: Uuid,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            payment_id,
            user_id: user_id.into(),
            payer_id: None,
            payee_id: None,
            amount: None,
            note: None,
            occurred_at: None,
        }
    }

    #[must_use]
    pub fn payer_id(mut self, payer_id: impl Into<String>) -> Self {
        self.payer_id = Some(payer_id.into());
        self
    }

    #[must_use]
    pub fn payee_id(mut self, payee_id: impl Into<String>) -> Self {
        self.payee_id = Some(payee_id.into());
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}
