//! The cross-context bus: listener registry plus transports.
//!
//! Each execution context owns one `CrossTabBus`. Contexts in the same
//! process share a `ProcessHub` (primary transport, direct delivery).
//! A context without a hub runs detached on the durable fallback store
//! and polls for changes. Falling back is silent: it is an environment
//! property, not an error.
//!
//! The publisher's own context is never redelivered to: the code path
//! that publishes has already applied the effect locally.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use uuid::Uuid;

use crate::event::{ChangeKind, Domain, RefreshEvent};
use crate::store::FallbackStore;

type Listener = Arc<dyn Fn(&RefreshEvent) + Send + Sync>;
type DedupKey = (Domain, ChangeKind, String, i64);

/// Listeners of one context, keyed by domain.
#[derive(Default)]
struct Registry {
    listeners: HashMap<Domain, Vec<(u64, Listener)>>,
    next_id: u64,
}

/// Invoke a context's listeners for an event. Listener arcs are cloned
/// out first so callbacks run without the registry lock held (a listener
/// may subscribe or unsubscribe).
fn dispatch(registry: &Mutex<Registry>, event: &RefreshEvent) {
    let listeners: Vec<Listener> = {
        let registry = registry.lock().unwrap();
        registry
            .listeners
            .get(&event.domain)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    };
    for listener in listeners {
        listener(event);
    }
}

/// Active subscription; unsubscribes on drop.
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    domain: Domain,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap();
            if let Some(entries) = registry.listeners.get_mut(&self.domain) {
                entries.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

/// Shared in-process hub: the primary transport. One per process,
/// constructed at application start.
#[derive(Default)]
pub struct ProcessHub {
    contexts: Mutex<Vec<HubContext>>,
}

struct HubContext {
    origin_id: Uuid,
    deliver: Listener,
}

impl ProcessHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn context_count(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    fn attach(&self, origin_id: Uuid, deliver: Listener) {
        self.contexts.lock().unwrap().push(HubContext {
            origin_id,
            deliver,
        });
    }

    fn detach(&self, origin_id: Uuid) {
        self.contexts
            .lock()
            .unwrap()
            .retain(|c| c.origin_id != origin_id);
    }

    /// Deliver to every context except the publisher's.
    fn publish(&self, event: &RefreshEvent) {
        let delivers: Vec<Listener> = self
            .contexts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.origin_id != event.origin_id)
            .map(|c| Arc::clone(&c.deliver))
            .collect();
        for deliver in delivers {
            deliver(event);
        }
    }
}

/// Recently delivered event identities, bounded. Fallback delivery is
/// at-least-once; this makes redelivery a no-op.
#[derive(Default)]
struct SeenSet {
    set: HashSet<DedupKey>,
    order: VecDeque<DedupKey>,
}

const SEEN_CAP: usize = 256;

impl SeenSet {
    /// Returns false when the key was already seen.
    fn insert(&mut self, key: DedupKey) -> bool {
        if !self.set.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        if self.order.len() > SEEN_CAP {
            if let Some(old) = self.order.pop_front() {
                self.set.remove(&old);
            }
        }
        true
    }
}

enum Transport {
    Primary(Arc<ProcessHub>),
    Fallback {
        store: FallbackStore,
        seen: Mutex<SeenSet>,
    },
}

/// One execution context's connection to the refresh bus.
pub struct CrossTabBus {
    origin_id: Uuid,
    registry: Arc<Mutex<Registry>>,
    transport: Transport,
}

impl CrossTabBus {
    /// Join the in-process hub (primary transport).
    pub fn connect(hub: &Arc<ProcessHub>) -> Self {
        let origin_id = Uuid::new_v4();
        let registry = Arc::new(Mutex::new(Registry::default()));

        let deliver_registry = Arc::clone(&registry);
        hub.attach(
            origin_id,
            Arc::new(move |event: &RefreshEvent| dispatch(&deliver_registry, event)),
        );

        Self {
            origin_id,
            registry,
            transport: Transport::Primary(Arc::clone(hub)),
        }
    }

    /// Run detached on the durable fallback store (no hub available in
    /// this environment).
    pub fn detached(store: FallbackStore) -> Self {
        Self {
            origin_id: Uuid::new_v4(),
            registry: Arc::new(Mutex::new(Registry::default())),
            transport: Transport::Fallback {
                store,
                seen: Mutex::new(SeenSet::default()),
            },
        }
    }

    pub fn origin_id(&self) -> Uuid {
        self.origin_id
    }

    /// Register a listener for one domain. Dropping the returned
    /// subscription unsubscribes.
    #[must_use = "dropping the subscription unsubscribes the listener"]
    pub fn subscribe(
        &self,
        domain: Domain,
        listener: impl Fn(&RefreshEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let mut registry = self.registry.lock().unwrap();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .listeners
            .entry(domain)
            .or_default()
            .push((id, Arc::new(listener)));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            domain,
            id,
        }
    }

    /// Build and publish an event stamped with this context's origin id.
    /// Returns the event so the caller can log or inspect it.
    pub fn publish(
        &self,
        domain: Domain,
        kind: ChangeKind,
        entity_id: impl Into<String>,
        fields: Option<Vec<String>>,
    ) -> RefreshEvent {
        let event = RefreshEvent::new(domain, kind, entity_id, fields, self.origin_id);
        self.publish_event(&event);
        event
    }

    pub fn publish_event(&self, event: &RefreshEvent) {
        match &self.transport {
            Transport::Primary(hub) => hub.publish(event),
            Transport::Fallback { store, .. } => {
                // A failed fallback write is logged, never user-visible.
                if let Err(e) = store.publish(event) {
                    tracing::warn!(error = %e, "fallback publish failed");
                }
            }
        }
    }

    /// One fallback delivery pass over every domain key. Skips our own
    /// events and anything already seen. Returns how many events were
    /// dispatched. No-op on the primary transport.
    pub fn poll_once(&self) -> usize {
        let Transport::Fallback { store, seen } = &self.transport else {
            return 0;
        };

        let mut delivered = 0;
        for domain in Domain::ALL {
            let event = match store.read(domain) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(domain = domain.key(), error = %e, "fallback read failed");
                    continue;
                }
            };
            if event.origin_id == self.origin_id {
                continue; // our own write: the effect was applied locally
            }
            if !seen.lock().unwrap().insert(event.dedup_key()) {
                continue;
            }
            dispatch(&self.registry, &event);
            delivered += 1;
        }
        delivered
    }

    /// Poll the fallback store on a background thread until the guard
    /// drops.
    pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> PollerGuard {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let bus = Arc::clone(self);
        let handle = std::thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                bus.poll_once();
                std::thread::sleep(interval);
            }
        });
        PollerGuard {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for CrossTabBus {
    fn drop(&mut self) {
        if let Transport::Primary(hub) = &self.transport {
            hub.detach(self.origin_id);
        }
    }
}

/// Stops the fallback poller thread when dropped.
pub struct PollerGuard {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for PollerGuard {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
