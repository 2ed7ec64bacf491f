//! The capture hook run by the write path for every mutated row.
//!
//! An invocation goes through catalog lookup, projection, diff (updates
//! only), event assembly, publication and the audit append. Two boundaries
//! keep any fault away from the write:
//!
//! - the outer boundary catches a fault in any of those steps and appends an
//!   `ERROR` audit record in place of the `SUCCESS` one;
//! - the inner boundary catches a fault of that error append and leaves a
//!   diagnostic log line instead.
//!
//! [`CaptureHook::capture`] therefore never fails. It returns an [`Outcome`]
//! telling which path the invocation ended on.

use crate::audit::{AuditError, AuditRecord, AuditStore, NoAudit};
use crate::catalog::{self, Catalog};
use crate::clock::{Clock, SystemClock};
use crate::diff::changed_fields;
use crate::errors::{AUDIT_WRITE_FAILURE, CaptureError};
use crate::event::ChangeEvent;
use crate::notify::Notifier;
use crate::projection::{project_deleted, project_keys};
use crate::row::{Mutation, Operation};

/// How an invocation of the hook ended. Never an error for the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event was published and a `SUCCESS` record appended.
    Recorded,
    /// The event was published. The hook keeps no audit trail.
    Published,
    /// A step failed and an `ERROR` record with this code was appended.
    RecordedError {
        /// Code of the fault.
        code: &'static str,
    },
    /// A step failed and no record could be appended; a log line marks it.
    Logged {
        /// Code written to the log line.
        code: &'static str,
    },
}

impl Outcome {
    /// Returns whether the event went through without any fault.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Recorded | Self::Published)
    }

    /// Returns the code of the fault, if any.
    #[must_use]
    pub fn error_code(self) -> Option<&'static str> {
        match self {
            Self::Recorded | Self::Published => None,
            Self::RecordedError { code } | Self::Logged { code } => Some(code),
        }
    }
}

/// Position of an invocation between the two containment boundaries.
enum Stage {
    Running,
    CaughtOuter(CaptureError),
    CaughtInner {
        fault: CaptureError,
        cause: Option<AuditError>,
    },
    Done(Outcome),
}

/// Turns row mutations into published change events and audit records.
///
/// # Example
///
/// ```
/// use capture_hook::{
///     BroadcastNotifier, CaptureHook, CatalogEntry, MemoryAuditStore, MemoryCatalog, Mutation,
///     Outcome,
/// };
/// use serde_json::json;
///
/// let catalog = MemoryCatalog::from_entries([CatalogEntry::new(
///     "orders",
///     &["id"],
///     &["customer_id"],
///     &["status"],
/// )]);
/// let hook = CaptureHook::new(catalog, BroadcastNotifier::new("shop"), MemoryAuditStore::new());
///
/// let outcome = hook.capture(&Mutation::insert(
///     4211,
///     "public",
///     "orders",
///     json!({"id": 1, "customer_id": 7, "status": "PENDING"}),
/// ));
/// assert_eq!(outcome, Outcome::Recorded);
/// ```
#[derive(Debug)]
pub struct CaptureHook<C, N, A = NoAudit, K = SystemClock> {
    catalog: C,
    notifier: N,
    audit: Option<A>,
    clock: K,
}

impl<C: Catalog, N: Notifier> CaptureHook<C, N> {
    /// A hook that publishes events without keeping an audit trail.
    ///
    /// Faults are only logged.
    #[must_use]
    pub fn notify_only(catalog: C, notifier: N) -> Self {
        Self {
            catalog,
            notifier,
            audit: None,
            clock: SystemClock,
        }
    }
}

impl<C: Catalog, N: Notifier, A: AuditStore> CaptureHook<C, N, A> {
    /// A hook that publishes events and appends them to `audit`.
    #[must_use]
    pub fn new(catalog: C, notifier: N, audit: A) -> Self {
        Self {
            catalog,
            notifier,
            audit: Some(audit),
            clock: SystemClock,
        }
    }
}

impl<C, N, A, K> CaptureHook<C, N, A, K> {
    /// Replaces the time source of `recorded_at`.
    #[must_use]
    pub fn with_clock<K2: Clock>(self, clock: K2) -> CaptureHook<C, N, A, K2> {
        CaptureHook {
            catalog: self.catalog,
            notifier: self.notifier,
            audit: self.audit,
            clock,
        }
    }

    /// The catalog the hook reads.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// The channel the hook publishes on.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// The audit store, if the hook keeps an audit trail.
    pub fn audit(&self) -> Option<&A> {
        self.audit.as_ref()
    }
}

impl<C: Catalog, N: Notifier, A: AuditStore, K: Clock> CaptureHook<C, N, A, K> {
    /// Captures one mutation. Never fails and never panics on a capture fault.
    pub fn capture(&self, mutation: &Mutation) -> Outcome {
        let _span = tracing::debug_span!(
            "capture",
            table = %mutation.table,
            tg_op = %mutation.operation,
            xmin = mutation.transaction_id
        )
        .entered();

        // One timestamp for both the success and the error record.
        let recorded_at = self.clock.now();
        let mut event = ChangeEvent::for_mutation(mutation);
        let mut stage = Stage::Running;

        loop {
            stage = match stage {
                Stage::Running => match self.run(mutation, &mut event, recorded_at) {
                    Ok(outcome) => Stage::Done(outcome),
                    Err(fault) => {
                        tracing::warn!(
                            error_code = fault.code(),
                            error = %fault,
                            "change capture failed"
                        );
                        Stage::CaughtOuter(fault)
                    }
                },
                Stage::CaughtOuter(fault) => match &self.audit {
                    Some(store) => {
                        let record = AuditRecord::failure(&event, fault.details(), recorded_at);
                        match store.append(&record) {
                            Ok(()) => Stage::Done(Outcome::RecordedError { code: fault.code() }),
                            Err(cause) => Stage::CaughtInner {
                                fault,
                                cause: Some(cause),
                            },
                        }
                    }
                    None => Stage::CaughtInner { fault, cause: None },
                },
                Stage::CaughtInner { fault, cause } => {
                    Stage::Done(self.log_unrecorded(mutation, &fault, cause.as_ref()))
                }
                Stage::Done(outcome) => return outcome,
            };
        }
    }

    fn run(
        &self,
        mutation: &Mutation,
        event: &mut ChangeEvent,
        recorded_at: f64,
    ) -> Result<Outcome, CaptureError> {
        self.build(mutation, event)?;
        let payload = event.to_payload()?;
        self.notifier.publish(&payload)?;

        let Some(store) = &self.audit else {
            return Ok(Outcome::Published);
        };
        store.append(&AuditRecord::success(event, recorded_at))?;
        tracing::debug!("recorded change event");
        Ok(Outcome::Recorded)
    }

    /// Fills `event` step by step, leaving what was computed on a fault.
    fn build(&self, mutation: &Mutation, event: &mut ChangeEvent) -> Result<(), CaptureError> {
        let entry = catalog::resolve(&self.catalog, &mutation.table)?;
        event.indices = entry.index_names();

        match mutation.operation {
            Operation::Delete => {
                event.old_projection = project_deleted(mutation.old_image()?, &entry);
            }
            Operation::Insert => {
                event.new_projection = project_keys(mutation.new_image()?, &entry);
            }
            Operation::Update => {
                event.new_projection = project_keys(mutation.new_image()?, &entry);
                event.old_projection = project_keys(mutation.old_image()?, &entry);
                let (old, new) = mutation.update_images()?;
                event.changed_fields = Some(changed_fields(new, old));
            }
            Operation::Truncate => {}
        }
        Ok(())
    }

    fn log_unrecorded(
        &self,
        mutation: &Mutation,
        fault: &CaptureError,
        cause: Option<&AuditError>,
    ) -> Outcome {
        let at = self.clock.now();
        let code = match cause {
            Some(cause) => {
                tracing::error!(
                    table = %mutation.table,
                    schema = %mutation.schema,
                    tg_op = %mutation.operation,
                    error_code = AUDIT_WRITE_FAILURE,
                    error = %cause,
                    fault = %fault.details().message,
                    at,
                    "error occurred while processing notification"
                );
                AUDIT_WRITE_FAILURE
            }
            None => {
                tracing::error!(
                    table = %mutation.table,
                    schema = %mutation.schema,
                    tg_op = %mutation.operation,
                    error_code = fault.code(),
                    error = %fault.details().message,
                    at,
                    "error occurred while processing notification"
                );
                fault.code()
            }
        };
        Outcome::Logged { code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditStatus, MemoryAuditStore};
    use crate::catalog::{CatalogEntry, MemoryCatalog};
    use crate::clock::FixedClock;
    use crate::errors::{CATALOG_MISSING, PROJECTION_FAILURE};
    use crate::notify::BroadcastNotifier;
    use serde_json::json;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::from_entries([CatalogEntry::new(
            "orders",
            &["id"],
            &["customer_id"],
            &["status"],
        )])
    }

    fn hook() -> CaptureHook<MemoryCatalog, BroadcastNotifier, MemoryAuditStore, FixedClock> {
        CaptureHook::new(
            catalog(),
            BroadcastNotifier::new("shop"),
            MemoryAuditStore::new(),
        )
        .with_clock(FixedClock(1700000000.0))
    }

    #[test]
    fn test_insert_projects_keys_only() {
        let hook = hook();
        let mut subscription = hook.notifier().subscribe().unwrap();
        let outcome = hook.capture(&Mutation::insert(
            10,
            "public",
            "orders",
            json!({"id": 1, "customer_id": 7, "status": "PENDING", "total": 99.5}),
        ));
        assert_eq!(outcome, Outcome::Recorded);

        let event = subscription.try_next_event().unwrap().unwrap();
        assert_eq!(
            event.new_projection.map(serde_json::Value::Object),
            Some(json!({"id": 1, "customer_id": 7}))
        );
        assert_eq!(event.old_projection, None);
        assert_eq!(event.changed_fields, None);
        assert_eq!(event.indices, ["status"]);
    }

    #[test]
    fn test_truncate_carries_indices_only() {
        let hook = hook();
        let outcome = hook.capture(&Mutation::truncate(11, "public", "orders"));
        assert_eq!(outcome, Outcome::Recorded);

        let records = hook.audit().unwrap().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tg_op, Operation::Truncate);
        assert_eq!(records[0].indices, ["status"]);
        assert_eq!(records[0].new_row, None);
        assert_eq!(records[0].old_row, None);
    }

    #[test]
    fn test_malformed_old_image_keeps_new_projection_on_error_record() {
        let hook = hook();
        let outcome = hook.capture(&Mutation::update(
            12,
            "public",
            "orders",
            json!("not a row"),
            json!({"id": 1, "customer_id": 7, "status": "SHIPPED"}),
        ));
        assert_eq!(
            outcome,
            Outcome::RecordedError {
                code: PROJECTION_FAILURE
            }
        );

        let record = &hook.audit().unwrap().records()[0];
        assert_eq!(record.status, AuditStatus::Error);
        assert_eq!(
            record.new_row.clone().map(serde_json::Value::Object),
            Some(json!({"id": 1, "customer_id": 7}))
        );
        assert_eq!(record.old_row, None);
        assert_eq!(record.indices, ["status"]);
    }

    #[test]
    fn test_update_without_old_image_is_recorded_as_error() {
        let hook = hook();
        let mut mutation = Mutation::update(
            16,
            "public",
            "orders",
            json!({"id": 1, "customer_id": 7, "status": "PENDING"}),
            json!({"id": 1, "customer_id": 7, "status": "SHIPPED"}),
        );
        mutation.old = None;

        let outcome = hook.capture(&mutation);
        assert_eq!(
            outcome,
            Outcome::RecordedError {
                code: PROJECTION_FAILURE
            }
        );

        let record = &hook.audit().unwrap().records()[0];
        assert_eq!(record.changed_fields, None);
        assert_eq!(
            record.error_details.as_ref().unwrap().message,
            "CC002: malformed old row image for table 'orders': expected an object, got null"
        );
    }

    #[test]
    fn test_notify_only_logs_faults() {
        let hook = CaptureHook::notify_only(MemoryCatalog::default(), BroadcastNotifier::new("shop"));
        assert!(hook.audit().is_none());

        let outcome = hook.capture(&Mutation::truncate(13, "public", "legacy_items"));
        assert_eq!(
            outcome,
            Outcome::Logged {
                code: CATALOG_MISSING
            }
        );
        assert_eq!(outcome.error_code(), Some(CATALOG_MISSING));
    }

    #[test]
    fn test_notify_only_publishes() {
        let hook = CaptureHook::notify_only(catalog(), BroadcastNotifier::new("shop"));
        let outcome = hook.capture(&Mutation::truncate(14, "public", "orders"));
        assert_eq!(outcome, Outcome::Published);
        assert!(outcome.is_success());
    }

    #[test]
    fn test_recorded_at_comes_from_clock() {
        let hook = hook();
        hook.capture(&Mutation::truncate(15, "public", "orders"));
        let record = &hook.audit().unwrap().records()[0];
        assert!((record.recorded_at - 1700000000.0).abs() < f64::EPSILON);
    }
}
