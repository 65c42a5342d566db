//! `weekboard-sync` — optimistic writes with safe rollback.
//!
//! The coordinator applies a local state change before the server confirms
//! it, retries transient failures with backoff, and rolls the local state
//! back when the write definitively fails. Version tokens make each write
//! conditional on "no intervening change", so lost updates surface as
//! conflicts instead of silently clobbering.

pub mod error;
pub mod mutation;
pub mod notify;
pub mod retry;
pub mod version;
pub mod write;

pub use error::{ApplyError, WriteError};
pub use mutation::{
    MutationCoordinator, MutationHandle, MutationKind, MutationObserver, MutationStatus,
    NoopObserver,
};
pub use notify::{NotifySink, NullSink, Severity};
pub use retry::RetryPolicy;
pub use version::VersionTokenStore;
pub use write::{BatchItemOutcome, BatchItemStatus, WriteOk};
