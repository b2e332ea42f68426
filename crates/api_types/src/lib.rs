//! Request/response bodies shared between the ledger service and its API
//! clients. Amounts travel as integer minor units (cents).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
}

pub mod group {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupNew {
        pub name: String,
        pub currency: Option<Currency>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GroupView {
        pub id: String,
        pub name: String,
        pub currency: Currency,
    }
}

pub mod membership {
    use super::*;

    /// Membership status of a user in a group.
    ///
    /// - `active`: eligible for new expenses and payments.
    /// - `archived`: retained for historical attribution only; removal
    ///   archives, it never deletes.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum MembershipStatus {
        Active,
        Archived,
    }

    /// Request body for adding a member.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberAdd {
        pub username: String,
    }

    /// Response body for listing members.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct MembersResponse {
        pub members: Vec<MemberView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MemberView {
        pub username: String,
        pub status: MembershipStatus,
        pub joined_at: DateTime<Utc>,
    }
}

pub mod expense {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShareBody {
        pub user_id: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub payer_id: String,
        pub amount_minor: i64,
        pub shares: Vec<ShareBody>,
        pub description: Option<String>,
        pub occurred_at: DateTime<Utc>,
        pub idempotency_key: Option<String>,
    }

    /// Unset fields keep their current value; `shares` replaces the whole
    /// participant set when present.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub payer_id: Option<String>,
        pub amount_minor: Option<i64>,
        pub shares: Option<Vec<ShareBody>>,
        pub description: Option<String>,
        pub occurred_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub payer_id: String,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub occurred_at: DateTime<Utc>,
        pub created_by: String,
        pub deleted: bool,
        pub shares: Vec<ShareBody>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpensesPage {
        pub items: Vec<ExpenseView>,
        /// Opaque cursor for the next page, absent on the last one.
        pub next_cursor: Option<String>,
    }
}

pub mod payment {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        pub payer_id: String,
        pub payee_id: String,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub occurred_at: DateTime<Utc>,
        pub idempotency_key: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PaymentUpdate {
        pub payer_id: Option<String>,
        pub payee_id: Option<String>,
        pub amount_minor: Option<i64>,
        pub note: Option<String>,
        pub occurred_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub id: Uuid,
        pub payer_id: String,
        pub payee_id: String,
        pub amount_minor: i64,
        pub note: Option<String>,
        pub occurred_at: DateTime<Utc>,
        pub created_by: String,
        pub deleted: bool,
    }
}

pub mod balance {
    use super::*;

    /// One member's net position: positive = the group owes the user.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub user_id: String,
        pub balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalancesResponse {
        pub balances: Vec<BalanceView>,
    }

    /// A collapsed pairwise balance, oriented debtor → creditor.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PairBalanceView {
        pub debtor_id: String,
        pub creditor_id: String,
        pub amount_minor: i64,
    }
}

pub mod reconcile {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum DiffSubject {
        Net { user_id: String },
        Pair { first: String, second: String },
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DiffView {
        pub subject: DiffSubject,
        pub cached_minor: i64,
        pub computed_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReconcileResponse {
        pub group_id: String,
        pub repaired: bool,
        pub diffs: Vec<DiffView>,
    }
}
