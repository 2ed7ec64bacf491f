#![doc = include_str!("../README.md")]
#![deny(clippy::mod_module_files)]

pub mod audit;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod diff;
pub mod errors;
pub mod event;
pub mod hook;
pub mod notify;
pub mod projection;
pub mod row;

// Re-export main types
pub use audit::{
    AuditError, AuditRecord, AuditStatus, AuditStore, ErrorDetails, JsonLinesAuditStore,
    MemoryAuditStore, NoAudit,
};
pub use catalog::{Catalog, CatalogEntry, FieldSet, MemoryCatalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CaptureConfig, ConfigError};
pub use event::ChangeEvent;
pub use hook::{CaptureHook, Outcome};
pub use notify::{BroadcastNotifier, Notifier, NotifyError, Subscription};
pub use row::{Mutation, Operation, Projection, RowImage};

// Re-export errors
pub use errors::CaptureError;
