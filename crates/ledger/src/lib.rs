//! Quota ledger core.
//!
//! Groups of people log shared expenses and payments; the ledger keeps a
//! durable transaction store as ground truth and two cached balance views
//! (per-member net, pairwise) that are incrementally maintained, verified
//! and repaired against pure reducers.

pub use audit::{AuditAction, AuditEntry};
pub use commands::{
    CreateExpenseCmd, CreatePaymentCmd, ShareSpec, UpdateExpenseCmd, UpdatePaymentCmd,
};
pub use currency::Currency;
pub use delta::BalanceDelta;
pub use error::LedgerError;
pub use expenses::Expense;
pub use groups::Group;
pub use memberships::MembershipStatus;
pub use money::{EPSILON, MoneyCents};
pub use ops::{
    Diff, DiffSubject, ExpenseListFilter, Ledger, LedgerBuilder, MemberBalance, MemberView,
    ReconcileReport,
};
pub use payments::Payment;
pub use queue::{NoopQueue, ReconcileQueue};
pub use shares::Share;

pub mod audit;
mod commands;
mod currency;
mod delta;
mod error;
pub mod expenses;
pub mod groups;
pub mod memberships;
mod money;
pub mod net_balances;
mod ops;
pub mod pair_balances;
pub mod payments;
mod queue;
pub mod reducer;
pub mod shares;
pub mod users;
mod util;

type ResultLedger<T> = Result<T, LedgerError>;
