use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use sea_orm::DatabaseConnection;

use crate::{
    ResultLedger,
    queue::{NoopQueue, ReconcileQueue},
};

mod access;
mod audit;
mod balances;
mod expenses;
mod groups;
mod memberships;
mod payments;
mod reconcile;

pub use balances::MemberBalance;
pub use expenses::ExpenseListFilter;
pub use memberships::MemberView;
pub use reconcile::{Diff, DiffSubject, ReconcileReport};

/// Run a block inside a DB transaction, committing on success and rolling
/// back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultLedger<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Entry point for every ledger operation.
///
/// Holds the database handle, the background reconciliation sink and the
/// per-group mutation counters that drive periodic self-healing.
pub struct Ledger {
    database: DatabaseConnection,
    queue: Arc<dyn ReconcileQueue>,
    reconcile_every: u64,
    mutation_counts: Mutex<HashMap<String, u64>>,
}

impl Ledger {
    /// Return a builder for `Ledger`. Help to build the struct.
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }

    /// Counts one committed mutation against a group, scheduling a
    /// background reconcile every `reconcile_every` mutations.
    pub(crate) fn note_mutation(&self, group_id: &str) {
        if self.reconcile_every == 0 {
            return;
        }
        let due = {
            let mut counts = self
                .mutation_counts
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let count = counts.entry(group_id.to_string()).or_insert(0);
            *count += 1;
            (*count).is_multiple_of(self.reconcile_every)
        };
        if due {
            tracing::debug!(group_id, "scheduling periodic reconciliation");
            self.queue.schedule(group_id);
        }
    }
}

/// The builder for `Ledger`.
pub struct LedgerBuilder {
    database: DatabaseConnection,
    queue: Arc<dyn ReconcileQueue>,
    reconcile_every: u64,
}

impl Default for LedgerBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            queue: Arc::new(NoopQueue),
            reconcile_every: 64,
        }
    }
}

impl LedgerBuilder {
    /// Pass the required database.
    #[must_use]
    pub fn database(mut self, db: DatabaseConnection) -> LedgerBuilder {
        self.database = db;
        self
    }

    /// Sink for deferred reconciliation work (defaults to a no-op).
    #[must_use]
    pub fn reconcile_queue(mut self, queue: Arc<dyn ReconcileQueue>) -> LedgerBuilder {
        self.queue = queue;
        self
    }

    /// Schedule a background reconcile every `n` mutations per group; 0
    /// disables periodic scheduling.
    #[must_use]
    pub fn reconcile_every(mut self, n: u64) -> LedgerBuilder {
        self.reconcile_every = n;
        self
    }

    /// Construct `Ledger`.
    pub async fn build(self) -> ResultLedger<Ledger> {
        Ok(Ledger {
            database: self.database,
            queue: self.queue,
            reconcile_every: self.reconcile_every,
            mutation_counts: Mutex::new(HashMap::new()),
        })
    }
}
