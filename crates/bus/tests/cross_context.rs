//! End-to-end delivery across contexts, both transports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use weekboard_bus::{ChangeKind, CrossTabBus, Domain, FallbackStore, ProcessHub, RefreshEvent};

fn recording_listener(
    log: &Arc<Mutex<Vec<RefreshEvent>>>,
) -> impl Fn(&RefreshEvent) + Send + Sync {
    let log = Arc::clone(log);
    move |event| log.lock().unwrap().push(event.clone())
}

#[test]
fn test_primary_transport_fans_out_to_every_other_context() {
    let hub = ProcessHub::new();
    let publisher = CrossTabBus::connect(&hub);
    let receiver_a = CrossTabBus::connect(&hub);
    let receiver_b = CrossTabBus::connect(&hub);

    let seen_by_publisher = Arc::new(Mutex::new(Vec::new()));
    let seen_by_a = Arc::new(Mutex::new(Vec::new()));
    let seen_by_b = Arc::new(Mutex::new(Vec::new()));
    let _s0 = publisher.subscribe(Domain::Assignments, recording_listener(&seen_by_publisher));
    let _s1 = receiver_a.subscribe(Domain::Assignments, recording_listener(&seen_by_a));
    let _s2 = receiver_b.subscribe(Domain::Assignments, recording_listener(&seen_by_b));

    let published = publisher.publish(
        Domain::Assignments,
        ChangeKind::Updated,
        "a7",
        Some(vec!["hours".to_string()]),
    );

    assert!(seen_by_publisher.lock().unwrap().is_empty());

    let got_a = seen_by_a.lock().unwrap();
    let got_b = seen_by_b.lock().unwrap();
    assert_eq!(got_a.len(), 1);
    assert_eq!(got_b.len(), 1);
    assert_eq!(got_a[0], published);
    assert_eq!(got_a[0].origin_id, publisher.origin_id());
    assert_eq!(got_a[0].fields.as_deref(), Some(&["hours".to_string()][..]));
}

#[test]
fn test_fallback_store_carries_events_between_detached_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = CrossTabBus::detached(FallbackStore::new(dir.path()));
    let receiver = CrossTabBus::detached(FallbackStore::new(dir.path()));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let _sub = receiver.subscribe(Domain::Projects, recording_listener(&seen));

    publisher.publish(Domain::Projects, ChangeKind::Created, "p3", None);

    assert_eq!(receiver.poll_once(), 1);
    let got = seen.lock().unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].entity_id, "p3");
    assert_eq!(got[0].kind, ChangeKind::Created);
}

#[test]
fn test_fallback_redelivery_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = CrossTabBus::detached(FallbackStore::new(dir.path()));
    let receiver = CrossTabBus::detached(FallbackStore::new(dir.path()));

    let count = Arc::new(AtomicUsize::new(0));
    let count_in_listener = Arc::clone(&count);
    let _sub = receiver.subscribe(Domain::Departments, move |_| {
        count_in_listener.fetch_add(1, Ordering::SeqCst);
    });

    publisher.publish(Domain::Departments, ChangeKind::Updated, "d1", None);

    // The store still holds the event on later polls; delivery must not
    // repeat.
    assert_eq!(receiver.poll_once(), 1);
    assert_eq!(receiver.poll_once(), 0);
    assert_eq!(receiver.poll_once(), 0);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fallback_skips_own_origin() {
    let dir = tempfile::tempdir().unwrap();
    let bus = CrossTabBus::detached(FallbackStore::new(dir.path()));

    let count = Arc::new(AtomicUsize::new(0));
    let count_in_listener = Arc::clone(&count);
    let _sub = bus.subscribe(Domain::Assignments, move |_| {
        count_in_listener.fetch_add(1, Ordering::SeqCst);
    });

    bus.publish(Domain::Assignments, ChangeKind::Deleted, "a1", None);

    assert_eq!(bus.poll_once(), 0);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_fallback_delivers_newer_event_after_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = CrossTabBus::detached(FallbackStore::new(dir.path()));
    let receiver = CrossTabBus::detached(FallbackStore::new(dir.path()));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let _sub = receiver.subscribe(Domain::Deliverables, recording_listener(&seen));

    publisher.publish(Domain::Deliverables, ChangeKind::Created, "d1", None);
    assert_eq!(receiver.poll_once(), 1);

    publisher.publish(Domain::Deliverables, ChangeKind::Updated, "d1", None);
    assert_eq!(receiver.poll_once(), 1);

    let got = seen.lock().unwrap();
    assert_eq!(got.len(), 2);
    assert_eq!(got[1].kind, ChangeKind::Updated);
}

#[test]
fn test_background_poller_picks_up_events() {
    let dir = tempfile::tempdir().unwrap();
    let publisher = CrossTabBus::detached(FallbackStore::new(dir.path()));
    let receiver = Arc::new(CrossTabBus::detached(FallbackStore::new(dir.path())));

    let count = Arc::new(AtomicUsize::new(0));
    let count_in_listener = Arc::clone(&count);
    let _sub = receiver.subscribe(Domain::Projects, move |_| {
        count_in_listener.fetch_add(1, Ordering::SeqCst);
    });

    let guard = receiver.spawn_poller(std::time::Duration::from_millis(10));
    publisher.publish(Domain::Projects, ChangeKind::Updated, "p9", None);

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while count.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    drop(guard);

    assert_eq!(count.load(Ordering::SeqCst), 1);
}
