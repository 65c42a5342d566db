//! Optimistic mutation coordinator.
//!
//! State machine per entity key:
//!
//! ```text
//! idle → optimistic → confirmed              (success)
//! idle → optimistic → rollingBack → failed   (failure after retries)
//! ```
//!
//! Terminal statuses (confirmed, failed) stop blocking the key but stick
//! around as its last outcome until the next apply.
//!
//! Key invariants:
//! - At most one non-terminal mutation per entity key; a second `apply`
//!   for the same key is rejected synchronously as Busy.
//! - The coordinator is the sole writer of the optimistic cache while a
//!   mutation for that key is non-terminal.
//! - Rollback is visible in the cache before the failure notification
//!   fires, so the UI never shows a confirmed-looking value that was
//!   never persisted.
//! - After `teardown()`, no state is written and pending backoff waits
//!   wake immediately.
//!
//! The write itself runs on a worker thread (the UI thread never blocks);
//! retries wait on a condvar so teardown can cancel them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{ApplyError, WriteError};
use crate::notify::{NotifySink, Severity};
use crate::retry::RetryPolicy;
use crate::version::VersionTokenStore;
use crate::write::{BatchItemOutcome, BatchItemStatus, WriteOk};

/// What a mutation does to its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Created,
    Updated,
    Deleted,
}

/// Lifecycle status of a mutation. `Idle` doubles as "no mutation".
///
/// Terminal statuses linger as the key's last outcome (so the shell can
/// show a saved/failed indicator) until the next `apply` replaces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Idle,
    Optimistic,
    Confirmed,
    RollingBack,
    Failed,
}

impl MutationStatus {
    /// A terminal status no longer blocks the key.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Idle | Self::Confirmed | Self::Failed)
    }
}

/// Domain-side reactions to mutation outcomes (e.g. broadcasting refresh
/// events). Distinct from the user-facing notification sink.
pub trait MutationObserver<V>: Send + Sync {
    fn confirmed(&self, _entity_key: &str, _state: Option<&V>, _token: Option<&str>) {}
    fn rolled_back(&self, _entity_key: &str, _prior: Option<&V>) {}
    /// The resource changed under us; the caller should refetch and let
    /// the user decide. The stale desired state was already rolled back.
    fn conflicted(&self, _entity_key: &str) {}
}

/// Observer that reacts to nothing.
pub struct NoopObserver;

impl<V> MutationObserver<V> for NoopObserver {}

struct MutationRecord<V> {
    prior: Option<V>,
    status: MutationStatus,
}

struct Inner<V> {
    /// Locally observed entity state; optimistically updated.
    cache: HashMap<String, V>,
    /// Mutations by entity key. Terminal records linger as the key's
    /// last outcome until the next apply replaces them.
    in_flight: HashMap<String, MutationRecord<V>>,
}

/// Cancellable wait used for retry backoff. `teardown` trips the flag and
/// wakes every sleeper; a woken sleeper must not write any state.
struct BackoffGate {
    torn_down: Mutex<bool>,
    cv: Condvar,
}

impl BackoffGate {
    fn new() -> Self {
        Self {
            torn_down: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Wait for `duration`. Returns false when woken by teardown.
    fn wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut torn = self.torn_down.lock().unwrap();
        loop {
            if *torn {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let (guard, _timeout) = self.cv.wait_timeout(torn, deadline - now).unwrap();
            torn = guard;
        }
    }

    fn release(&self) {
        *self.torn_down.lock().unwrap() = true;
        self.cv.notify_all();
    }
}

/// Handle to an in-flight mutation's worker thread.
///
/// Dropping it detaches the worker (the normal UI path); `wait()` joins
/// it, which tests use to make outcomes deterministic.
pub struct MutationHandle {
    thread: JoinHandle<()>,
}

impl MutationHandle {
    pub fn wait(self) {
        let _ = self.thread.join();
    }
}

/// Applies optimistic local changes and reconciles them with write outcomes.
pub struct MutationCoordinator<V> {
    inner: Arc<Mutex<Inner<V>>>,
    tokens: Arc<VersionTokenStore>,
    sink: Arc<dyn NotifySink>,
    observer: Arc<dyn MutationObserver<V>>,
    policy: RetryPolicy,
    alive: Arc<AtomicBool>,
    gate: Arc<BackoffGate>,
}

impl<V> Clone for MutationCoordinator<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            tokens: Arc::clone(&self.tokens),
            sink: Arc::clone(&self.sink),
            observer: Arc::clone(&self.observer),
            policy: self.policy,
            alive: Arc::clone(&self.alive),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<V: Clone + Send + 'static> MutationCoordinator<V> {
    pub fn new(
        tokens: Arc<VersionTokenStore>,
        sink: Arc<dyn NotifySink>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                cache: HashMap::new(),
                in_flight: HashMap::new(),
            })),
            tokens,
            sink,
            observer: Arc::new(NoopObserver),
            policy,
            alive: Arc::new(AtomicBool::new(true)),
            gate: Arc::new(BackoffGate::new()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn MutationObserver<V>>) -> Self {
        self.observer = observer;
        self
    }

    // =========================================================================
    // Observed state
    // =========================================================================

    /// Seed the local cache from a fetch (not a mutation).
    pub fn seed(&self, entity_key: &str, state: V) {
        self.inner
            .lock()
            .unwrap()
            .cache
            .insert(entity_key.to_string(), state);
    }

    /// The locally observed state of an entity (optimistic while a
    /// mutation is in flight).
    pub fn state_of(&self, entity_key: &str) -> Option<V> {
        self.inner.lock().unwrap().cache.get(entity_key).cloned()
    }

    /// The key's mutation status, including a lingering terminal outcome.
    pub fn status_of(&self, entity_key: &str) -> MutationStatus {
        self.inner
            .lock()
            .unwrap()
            .in_flight
            .get(entity_key)
            .map_or(MutationStatus::Idle, |r| r.status)
    }

    pub fn is_busy(&self, entity_key: &str) -> bool {
        !self.status_of(entity_key).is_terminal()
    }

    // =========================================================================
    // Single-entity apply
    // =========================================================================

    /// Optimistically apply `desired` and issue the write.
    ///
    /// Rejected as Busy when the key already has a non-terminal mutation.
    /// The write closure receives the desired state and the current
    /// version token for the key, fresh on every attempt.
    pub fn apply<W>(
        &self,
        entity_key: &str,
        kind: MutationKind,
        desired: V,
        mut write: W,
    ) -> Result<MutationHandle, ApplyError>
    where
        W: FnMut(&V, Option<&str>) -> Result<WriteOk<V>, WriteError> + Send + 'static,
    {
        {
            let mut inner = self.inner.lock().unwrap();
            let busy = inner
                .in_flight
                .get(entity_key)
                .is_some_and(|r| !r.status.is_terminal());
            if busy {
                return Err(ApplyError::Busy {
                    entity_key: entity_key.to_string(),
                });
            }

            let prior = inner.cache.get(entity_key).cloned();
            match kind {
                MutationKind::Deleted => {
                    inner.cache.remove(entity_key);
                }
                MutationKind::Created | MutationKind::Updated => {
                    inner
                        .cache
                        .insert(entity_key.to_string(), desired.clone());
                }
            }
            inner.in_flight.insert(
                entity_key.to_string(),
                MutationRecord {
                    prior,
                    status: MutationStatus::Optimistic,
                },
            );
        }

        let worker = self.clone();
        let key = entity_key.to_string();
        let thread = thread::spawn(move || worker.run_single(key, kind, desired, &mut write));
        Ok(MutationHandle { thread })
    }

    fn run_single<W>(&self, key: String, kind: MutationKind, desired: V, write: &mut W)
    where
        W: FnMut(&V, Option<&str>) -> Result<WriteOk<V>, WriteError>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            // Token read fresh on every attempt.
            let token = self.tokens.get(&key);
            match write(&desired, token.as_deref()) {
                Ok(ok) => {
                    let WriteOk { state, token } = ok;
                    let confirmed = state.unwrap_or_else(|| desired.clone());
                    self.confirm(&key, kind, confirmed, token.as_deref());
                    return;
                }
                Err(WriteError::Conflict(cause)) => {
                    // Stale-write prevention: do not retry the same
                    // desired state against a moved resource.
                    tracing::warn!(entity = %key, %cause, "write conflict");
                    self.rollback(&key);
                    self.sink.notify(
                        "This item was changed elsewhere. Refresh to see the latest version.",
                        Severity::Warning,
                    );
                    self.observer.conflicted(&key);
                    return;
                }
                Err(WriteError::Transient(cause)) => {
                    tracing::warn!(entity = %key, attempt, %cause, "write failed");
                    if attempt >= self.policy.max_retries {
                        self.rollback(&key);
                        self.sink.notify(
                            "Could not save your change. It has been reverted.",
                            Severity::Error,
                        );
                        return;
                    }
                    if !self.gate.wait(self.policy.delay()) {
                        return; // torn down mid-backoff
                    }
                }
            }
        }
    }

    /// Mark a mutation confirmed and record its new version token.
    /// No-op after teardown.
    fn confirm(&self, key: &str, kind: MutationKind, state: V, token: Option<&str>) {
        if !self.alive.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut inner = self.inner.lock().unwrap();
            let Some(record) = inner.in_flight.get_mut(key) else {
                return;
            };
            record.status = MutationStatus::Confirmed;
            match kind {
                MutationKind::Deleted => {
                    inner.cache.remove(key);
                }
                MutationKind::Created | MutationKind::Updated => {
                    inner.cache.insert(key.to_string(), state.clone());
                }
            }
        }
        match (kind, token) {
            (MutationKind::Deleted, _) => self.tokens.remove(key),
            (_, Some(token)) => self.tokens.set(key, token),
            (_, None) => {}
        }
        tracing::debug!(entity = %key, "write confirmed");
        let state = match kind {
            MutationKind::Deleted => None,
            _ => Some(state),
        };
        self.observer.confirmed(key, state.as_ref(), token);
    }

    /// Restore the pre-mutation state. Runs before any failure
    /// notification. No-op after teardown.
    fn rollback(&self, key: &str) {
        if !self.alive.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut inner = self.inner.lock().unwrap();
            let Some(record) = inner.in_flight.get_mut(key) else {
                return;
            };
            record.status = MutationStatus::RollingBack;
        }

        // The key stays busy through RollingBack; the cache restore and
        // the terminal mark happen under one lock.
        let prior;
        {
            let mut inner = self.inner.lock().unwrap();
            let Some(record) = inner.in_flight.get_mut(key) else {
                return;
            };
            record.status = MutationStatus::Failed;
            prior = record.prior.clone();
            match &prior {
                Some(value) => {
                    inner.cache.insert(key.to_string(), value.clone());
                }
                None => {
                    inner.cache.remove(key);
                }
            }
        }
        self.observer.rolled_back(key, prior.as_ref());
    }

    // =========================================================================
    // Bulk apply
    // =========================================================================

    /// Apply many independent per-entity updates as one batched write.
    ///
    /// The whole call is rejected when any key is busy (the caller retries
    /// once the earlier submission settles). The batched result is fanned
    /// out per entity: confirmed items keep their optimistic state and
    /// store their token, failed items roll back individually. A partial
    /// failure never rolls back entities that succeeded.
    pub fn apply_batch<W>(
        &self,
        updates: Vec<(String, V)>,
        mut write: W,
    ) -> Result<MutationHandle, ApplyError>
    where
        W: FnMut(&[(String, V)]) -> Result<Vec<BatchItemOutcome>, WriteError> + Send + 'static,
    {
        {
            let mut inner = self.inner.lock().unwrap();
            for (key, _) in &updates {
                let busy = inner
                    .in_flight
                    .get(key)
                    .is_some_and(|r| !r.status.is_terminal());
                if busy {
                    return Err(ApplyError::Busy {
                        entity_key: key.clone(),
                    });
                }
            }
            for (key, desired) in &updates {
                let prior = inner.cache.get(key).cloned();
                inner.cache.insert(key.clone(), desired.clone());
                inner.in_flight.insert(
                    key.clone(),
                    MutationRecord {
                        prior,
                        status: MutationStatus::Optimistic,
                    },
                );
            }
        }

        let worker = self.clone();
        let thread = thread::spawn(move || worker.run_batch(updates, &mut write));
        Ok(MutationHandle { thread })
    }

    fn run_batch<W>(&self, updates: Vec<(String, V)>, write: &mut W)
    where
        W: FnMut(&[(String, V)]) -> Result<Vec<BatchItemOutcome>, WriteError>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match write(&updates) {
                Ok(outcomes) => {
                    self.fan_out(&updates, &outcomes);
                    return;
                }
                Err(WriteError::Conflict(cause)) => {
                    tracing::warn!(%cause, "batch write conflict");
                    for (key, _) in &updates {
                        self.rollback(key);
                        self.observer.conflicted(key);
                    }
                    self.sink.notify(
                        "These items were changed elsewhere. Refresh to see the latest versions.",
                        Severity::Warning,
                    );
                    return;
                }
                Err(WriteError::Transient(cause)) => {
                    tracing::warn!(attempt, %cause, "batch write failed");
                    if attempt >= self.policy.max_retries {
                        for (key, _) in &updates {
                            self.rollback(key);
                        }
                        self.sink.notify(
                            "Could not save your changes. They have been reverted.",
                            Severity::Error,
                        );
                        return;
                    }
                    if !self.gate.wait(self.policy.delay()) {
                        return;
                    }
                }
            }
        }
    }

    /// Fan a batched result out into per-entity confirm/rollback
    /// decisions, keyed by the entity id in each result element.
    fn fan_out(&self, updates: &[(String, V)], outcomes: &[BatchItemOutcome]) {
        if !self.alive.load(Ordering::SeqCst) {
            return;
        }
        let by_id: HashMap<&str, &BatchItemOutcome> = outcomes
            .iter()
            .map(|o| (o.entity_id.as_str(), o))
            .collect();

        let mut failed = 0usize;
        for (key, desired) in updates {
            match by_id.get(key.as_str()) {
                Some(outcome) if outcome.status == BatchItemStatus::Confirmed => {
                    self.confirm(
                        key,
                        MutationKind::Updated,
                        desired.clone(),
                        outcome.token.as_deref(),
                    );
                }
                Some(outcome) => {
                    tracing::warn!(entity = %key, status = ?outcome.status, "batch item failed");
                    self.rollback(key);
                    if outcome.status == BatchItemStatus::Conflict {
                        self.observer.conflicted(key);
                    }
                    failed += 1;
                }
                // An item the server did not answer for is treated as failed.
                None => {
                    tracing::warn!(entity = %key, "batch item missing from response");
                    self.rollback(key);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            self.sink.notify(
                &format!(
                    "{failed} of {} changes could not be saved and were reverted.",
                    updates.len()
                ),
                Severity::Error,
            );
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Stop applying results of in-flight mutations and cancel pending
    /// backoff waits. Called when the owning context goes away.
    pub fn teardown(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.gate.release();
    }
}
