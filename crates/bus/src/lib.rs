//! `weekboard-bus` — domain change notifications across execution contexts.
//!
//! Every open context (window, tab) of the application holds one
//! `CrossTabBus`. A mutation in one context publishes a `RefreshEvent`;
//! every *other* context receives it and re-derives its state (refetch or
//! local patch). Two transports:
//!
//! - Primary: direct delivery through a shared in-process hub.
//! - Fallback: a durable keyed store (one file per domain) that detached
//!   contexts poll. At-least-once; receivers deduplicate and ignore their
//!   own origin id.
//!
//! No cross-context ordering is guaranteed. An event means "something in
//! this domain may have changed", nothing stronger.

pub mod bus;
pub mod event;
pub mod store;

pub use bus::{CrossTabBus, PollerGuard, ProcessHub, Subscription};
pub use event::{ChangeKind, Domain, RefreshEvent};
pub use store::{FallbackStore, StoreError};
