//! Background reconciliation hook.
//!
//! The ledger does not own a job queue; it only needs "schedule a
//! reconciliation for group G, eventually", with at-least-once delivery.
//! Reconcile is idempotent, so duplicate or repeated deliveries are
//! harmless.

/// Sink for deferred reconciliation work.
pub trait ReconcileQueue: Send + Sync {
    /// Requests that `group_id` be reconciled at some later point.
    ///
    /// Implementations must not block: hand the id to a worker and return.
    fn schedule(&self, group_id: &str);
}

/// Default queue that drops every request.
///
/// Suitable for deployments that rely on on-demand reconciliation only.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopQueue;

impl ReconcileQueue for NoopQueue {
    fn schedule(&self, _group_id: &str) {}
}
