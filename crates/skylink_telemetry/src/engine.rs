//! The telemetry facade and transaction state machine.

use crate::config::TelemetryConfig;
use crate::policy::UpdatePolicy;
use crate::queue::{EventQueue, QueueEntry};
use crate::scheduler::Scheduler;
use crate::stats::TelemetryStats;
use crate::timer::{Timer, TimerFactory};
use crate::transport::LinkTransport;
use parking_lot::Mutex;
use skylink_objects::{EventKind, EventListener, ObjectRef, ObjectStore};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// The single in-flight exchange. Valid only while stored in
/// `EngineState::transaction`.
struct Transaction {
    obj: ObjectRef,
    all_instances: bool,
    request: bool,
    acked: bool,
    retries_remaining: u32,
}

/// Everything the engine mutates, under the one exclusive lock.
struct EngineState {
    scheduler: Scheduler,
    queue: EventQueue,
    transaction: Option<Transaction>,
    tx_errors: u64,
    tx_retries: u64,
}

/// The synchronization engine of one telemetry link.
///
/// Decides per object type when and how to push or pull data, serializes
/// all exchanges into a single in-flight transaction, retries on timeout,
/// and schedules periodic pushes with anti-bunching jitter.
///
/// Object-store notifications, object events and transport completions all
/// funnel into the engine's one lock; none of them blocks on I/O — sends
/// are fire-and-forget and completion arrives later through
/// [`Telemetry::transaction_completed`].
pub struct Telemetry {
    store: Arc<dyn ObjectStore>,
    transport: Arc<dyn LinkTransport>,
    config: TelemetryConfig,
    state: Mutex<EngineState>,
    tick_timer: Arc<dyn Timer>,
    trans_timer: Arc<dyn Timer>,
    weak_self: Weak<Telemetry>,
}

impl Telemetry {
    /// Creates the engine for one link and starts its periodic scheduler.
    ///
    /// Every object type already in the store is registered; types and
    /// instances created later are picked up through the store's
    /// notification stream.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        transport: Arc<dyn LinkTransport>,
        timers: &dyn TimerFactory,
        config: TelemetryConfig,
    ) -> Arc<Self> {
        let engine = Arc::new_cyclic(|weak: &Weak<Self>| {
            let tick = weak.clone();
            let tick_timer = timers.create(
                "tick",
                Arc::new(move || {
                    if let Some(engine) = tick.upgrade() {
                        engine.on_tick();
                    }
                }),
            );
            let timeout = weak.clone();
            let trans_timer = timers.create(
                "transaction",
                Arc::new(move || {
                    if let Some(engine) = timeout.upgrade() {
                        engine.on_transaction_timeout();
                    }
                }),
            );

            Self {
                state: Mutex::new(EngineState {
                    scheduler: Scheduler::new(
                        config.min_tick_interval_ms,
                        config.max_tick_interval_ms,
                    ),
                    queue: EventQueue::new(config.queue_depth),
                    transaction: None,
                    tx_errors: 0,
                    tx_retries: 0,
                }),
                store,
                transport,
                config,
                tick_timer,
                trans_timer,
                weak_self: weak.clone(),
            }
        });

        for obj in engine.store.object_types() {
            engine.register_object(&obj);
        }

        let weak = Arc::downgrade(&engine);
        engine.store.on_new_object(Arc::new(move |obj| {
            if let Some(engine) = weak.upgrade() {
                engine.register_object(&obj);
            }
        }));
        let weak = Arc::downgrade(&engine);
        engine.store.on_new_instance(Arc::new(move |obj| {
            if let Some(engine) = weak.upgrade() {
                engine.register_object(&obj);
            }
        }));

        engine
            .tick_timer
            .arm(Duration::from_millis(u64::from(engine.config.max_tick_interval_ms)));

        engine
    }

    /// Registers an object for telemetry handling: a scheduler entry for
    /// its type (one regardless of instance count) plus policy resolution
    /// against its current metadata.
    pub fn register_object(&self, obj: &ObjectRef) {
        let mut state = self.state.lock();
        state.scheduler.register(obj);
        self.apply_policy(&mut state, obj);
    }

    /// Forces an on-demand pull of the object from the peer.
    ///
    /// The outcome is reported through the object's completion callback.
    pub fn update_requested(&self, obj: &ObjectRef) {
        let mut state = self.state.lock();
        self.process_event(
            &mut state,
            QueueEntry::new(obj.clone(), EventKind::UpdateRequested, false),
            true,
        );
    }

    /// Entry point for the transport's completion notifications.
    ///
    /// A completion that does not match the pending transaction's object id
    /// is a protocol anomaly: it is logged and otherwise ignored.
    pub fn transaction_completed(&self, obj: &ObjectRef) {
        let mut state = self.state.lock();
        let matches = state
            .transaction
            .as_ref()
            .map(|trans| trans.obj.object_id() == obj.object_id())
            .unwrap_or(false);
        if !matches {
            warn!(object = %obj.name(), "received a transaction completion when none was expected");
            return;
        }

        debug!(object = %obj.name(), "transaction completed");
        self.trans_timer.cancel();
        if let Some(trans) = state.transaction.take() {
            trans.obj.transaction_completed(true);
        }
        self.drain_queue(&mut state);
    }

    /// Returns true if the connection-status sentinel reports the link
    /// established.
    pub fn connected(&self) -> bool {
        self.store
            .object_by_name(&self.config.status_object)
            .and_then(|obj| obj.field_value(&self.config.status_field))
            .map(|value| value == self.config.connected_value)
            .unwrap_or(false)
    }

    /// Snapshot of the link statistics: transport counters plus the
    /// engine's transmit-error and retry counters.
    pub fn stats(&self) -> TelemetryStats {
        let state = self.state.lock();
        TelemetryStats::merge(self.transport.stats(), state.tx_errors, state.tx_retries)
    }

    /// Resets the transport counters and the engine's local counters.
    pub fn reset_stats(&self) {
        let mut state = self.state.lock();
        self.transport.reset_stats();
        state.tx_errors = 0;
        state.tx_retries = 0;
    }

    /// True if a transaction is currently awaiting its reply.
    pub fn transaction_pending(&self) -> bool {
        self.state.lock().transaction.is_some()
    }

    /// Current depths of the priority and regular event queues.
    pub fn queue_depths(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.queue.priority_depth(), state.queue.regular_depth())
    }

    /// Number of object types with a scheduler entry.
    pub fn scheduled_types(&self) -> usize {
        self.state.lock().scheduler.len()
    }

    /// Resolves the object's metadata into period and event subscriptions,
    /// replacing any previous configuration for its type. Every instance
    /// of the type gets (re)connected to the resolved event set.
    fn apply_policy(&self, state: &mut EngineState, obj: &ObjectRef) {
        let policy = UpdatePolicy::resolve(&obj.metadata(), obj.is_meta());
        state.scheduler.set_period(obj.object_id(), policy.period_ms);

        let weak = self.weak_self.clone();
        let listener: EventListener = Arc::new(move |obj, kind| {
            if let Some(engine) = weak.upgrade() {
                engine.object_event(obj, kind);
            }
        });
        for instance in self.store.instances_of(obj.object_id()) {
            instance.connect(policy.events, Arc::clone(&listener));
        }
    }

    /// Handles one subscribed event raised by an object instance.
    fn object_event(&self, obj: ObjectRef, kind: EventKind) {
        let mut state = self.state.lock();
        self.process_event(&mut state, QueueEntry::new(obj, kind, false), true);
    }

    /// Enqueues a synchronization request and kicks off draining if no
    /// transaction is in flight. A full queue drops the entry, counts a
    /// transmit error and fails the object so its waiter is unblocked.
    fn process_event(&self, state: &mut EngineState, entry: QueueEntry, priority: bool) {
        debug!(object = %entry.obj.name(), event = ?entry.kind, "queueing event");
        if let Err(err) = state.queue.push(entry.clone(), priority) {
            state.tx_errors += 1;
            warn!(object = %entry.obj.name(), %err, "event lost");
            entry.obj.transaction_completed(false);
        }

        if state.transaction.is_none() {
            self.drain_queue(state);
        }
    }

    /// Dequeues the next pending request (priority first) and starts its
    /// transaction.
    fn drain_queue(&self, state: &mut EngineState) {
        if state.transaction.is_some() {
            warn!("dequeue requested while a transaction is pending");
            return;
        }

        let Some(entry) = state.queue.pop() else {
            return;
        };

        // Until the link is up, only traffic that can establish it — the
        // status sentinel's own — may pass.
        if !self.connected() {
            state.queue.clear_regular();
            let is_sentinel = self
                .store
                .object_by_name(&self.config.status_object)
                .map(|sentinel| sentinel.object_id() == entry.obj.object_id())
                .unwrap_or(false);
            if !is_sentinel {
                debug!(object = %entry.obj.name(), "link not connected, failing entry");
                entry.obj.transaction_completed(false);
                return;
            }
        }

        // An unpacked event means the data already arrived from the peer;
        // there is nothing to send.
        if entry.kind != EventKind::Unpacked {
            let metadata = entry.obj.metadata();
            state.transaction = Some(Transaction {
                obj: entry.obj.clone(),
                all_instances: entry.all_instances,
                request: entry.kind.is_request(),
                acked: metadata.acked,
                retries_remaining: self.config.max_retries,
            });
            self.send_transaction(state);
        }

        // A metaobject passing through may carry a policy change for its
        // parent; apply it now rather than on the next tick.
        if let Some(parent) = entry.obj.meta_parent() {
            self.apply_policy(state, &parent);
        }

        // The unpack itself was a no-op, but entries queued behind it must
        // not be left stuck.
        if entry.kind == EventKind::Unpacked {
            self.drain_queue(state);
        }
    }

    /// Issues the pending transaction to the transport, arming the reply
    /// timeout when a reply is expected.
    fn send_transaction(&self, state: &mut EngineState) {
        let Some(trans) = &state.transaction else {
            warn!("transaction processing requested with none pending");
            return;
        };
        let obj = trans.obj.clone();
        let request = trans.request;
        let acked = trans.acked;
        let all_instances = trans.all_instances;

        debug!(object = %obj.name(), request, acked, "starting transaction");
        let sent = if request {
            self.transport.send_object_request(&obj, all_instances)
        } else {
            self.transport.send_object(&obj, acked, all_instances)
        };
        if let Err(err) = sent {
            warn!(object = %obj.name(), %err, "transport send failed");
        }

        if request || acked {
            self.trans_timer.arm(self.config.transaction_timeout);
        } else {
            // Fire and forget: no reply to wait for.
            self.trans_timer.cancel();
            state.transaction = None;
        }
    }

    /// Handles expiry of the reply timeout: resend while the retry budget
    /// lasts, otherwise abandon the transaction and fail it.
    fn on_transaction_timeout(&self) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let retry = match &mut state.transaction {
            None => {
                debug!("transaction timeout with nothing pending");
                return;
            }
            Some(trans) => {
                if trans.retries_remaining > 0 {
                    trans.retries_remaining -= 1;
                    true
                } else {
                    false
                }
            }
        };

        if retry {
            state.tx_retries += 1;
            self.send_transaction(state);
        } else {
            self.transport.cancel_transaction();
            if let Some(trans) = state.transaction.take() {
                warn!(object = %trans.obj.name(), "transaction failed, retries exhausted");
                trans.obj.transaction_completed(false);
            }
            state.tx_errors += 1;
            self.drain_queue(state);
        }
    }

    /// Handles a scheduler wake-up: sweep the countdowns, enqueue a
    /// periodic push for every due type, and re-arm for the minimum
    /// remaining delay, charging the time spent emitting.
    fn on_tick(&self) {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let due = state.scheduler.advance();
        let started = Instant::now();
        for obj in due {
            self.process_event(
                state,
                QueueEntry::new(obj, EventKind::PeriodicPush, true),
                true,
            );
        }
        let emit_elapsed = started.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;

        let next = state.scheduler.rearm_after(emit_elapsed);
        self.tick_timer
            .arm(Duration::from_millis(u64::from(next)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualTimers;
    use crate::transport::{MockTransport, SentFrame};
    use skylink_objects::{MemoryObject, MemoryStore, Metadata, ObjectId};

    struct Harness {
        store: Arc<MemoryStore>,
        transport: Arc<MockTransport>,
        timers: ManualTimers,
        sentinel: Arc<MemoryObject>,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let sentinel =
                MemoryObject::new(ObjectId::new(0xffff), "LinkStatus", Metadata::manual(false));
            sentinel.set_field("Status", "Connected");
            store.add(Arc::clone(&sentinel));
            Self {
                store,
                transport: Arc::new(MockTransport::new()),
                timers: ManualTimers::new(),
                sentinel,
            }
        }

        fn engine(&self) -> Arc<Telemetry> {
            Telemetry::new(
                Arc::clone(&self.store) as Arc<dyn ObjectStore>,
                Arc::clone(&self.transport) as Arc<dyn LinkTransport>,
                &self.timers,
                TelemetryConfig::default(),
            )
        }
    }

    fn on_change_object(id: u32, name: &str, acked: bool) -> Arc<MemoryObject> {
        MemoryObject::new(ObjectId::new(id), name, Metadata::on_change(acked))
    }

    #[test]
    fn one_scheduler_entry_per_type() {
        let harness = Harness::new();
        harness.store.add(on_change_object(1, "Attitude", false));
        harness.store.add(on_change_object(1, "Attitude", false));
        harness.store.add(on_change_object(2, "Gps", false));
        let engine = harness.engine();

        // Sentinel + two data types, regardless of instance count.
        assert_eq!(engine.scheduled_types(), 3);

        harness.store.add(on_change_object(1, "Attitude", false));
        assert_eq!(engine.scheduled_types(), 3);
    }

    #[test]
    fn unacked_push_is_fire_and_forget() {
        let harness = Harness::new();
        let obj = on_change_object(1, "Attitude", false);
        harness.store.add(Arc::clone(&obj));
        let engine = harness.engine();

        obj.raise(EventKind::AutoUpdated);

        assert_eq!(
            harness.transport.frames(),
            vec![SentFrame::Object {
                id: ObjectId::new(1),
                acked: false,
                all_instances: false,
            }]
        );
        assert!(!engine.transaction_pending());
        assert_eq!(harness.timers.get("transaction").unwrap().armed(), None);
        assert_eq!(engine.stats().tx_retries, 0);
        // Fire-and-forget completes without reporting an outcome.
        assert!(obj.outcomes().is_empty());
    }

    #[test]
    fn acked_push_waits_for_completion() {
        let harness = Harness::new();
        let obj = on_change_object(1, "Attitude", true);
        harness.store.add(Arc::clone(&obj));
        let engine = harness.engine();

        obj.raise(EventKind::ManualUpdated);
        assert!(engine.transaction_pending());
        assert_eq!(
            harness.timers.get("transaction").unwrap().armed(),
            Some(Duration::from_millis(250))
        );

        engine.transaction_completed(&(Arc::clone(&obj) as ObjectRef));
        assert!(!engine.transaction_pending());
        assert_eq!(obj.outcomes(), vec![true]);
        assert_eq!(harness.timers.get("transaction").unwrap().armed(), None);
    }

    #[test]
    fn update_request_sends_a_pull() {
        let harness = Harness::new();
        let obj = on_change_object(1, "Attitude", false);
        harness.store.add(Arc::clone(&obj));
        let engine = harness.engine();

        engine.update_requested(&(Arc::clone(&obj) as ObjectRef));

        assert_eq!(
            harness.transport.frames(),
            vec![SentFrame::Request {
                id: ObjectId::new(1),
                all_instances: false,
            }]
        );
        // A pull always expects a reply.
        assert!(engine.transaction_pending());
    }

    #[test]
    fn unmatched_completion_is_ignored() {
        let harness = Harness::new();
        let a = on_change_object(1, "Attitude", true);
        let b = on_change_object(2, "Gps", false);
        harness.store.add(Arc::clone(&a));
        harness.store.add(Arc::clone(&b));
        let engine = harness.engine();

        a.raise(EventKind::ManualUpdated);
        assert!(engine.transaction_pending());

        engine.transaction_completed(&(Arc::clone(&b) as ObjectRef));
        assert!(engine.transaction_pending(), "anomaly must not clear the transaction");
        assert!(a.outcomes().is_empty());
        assert!(b.outcomes().is_empty());
    }

    #[test]
    fn completion_with_nothing_pending_is_ignored() {
        let harness = Harness::new();
        let obj = on_change_object(1, "Attitude", false);
        harness.store.add(Arc::clone(&obj));
        let engine = harness.engine();

        engine.transaction_completed(&(Arc::clone(&obj) as ObjectRef));
        assert!(!engine.transaction_pending());
        assert!(obj.outcomes().is_empty());
    }

    #[test]
    fn queue_overflow_drops_newest_and_reports_failure() {
        let harness = Harness::new();
        let blocker = on_change_object(1, "Attitude", true);
        let noisy = on_change_object(2, "Gps", false);
        harness.store.add(Arc::clone(&blocker));
        harness.store.add(Arc::clone(&noisy));
        let engine = harness.engine();

        // Occupy the transaction slot so everything else queues up.
        blocker.raise(EventKind::ManualUpdated);
        assert!(engine.transaction_pending());

        let depth = TelemetryConfig::default().queue_depth;
        for _ in 0..depth {
            noisy.raise(EventKind::AutoUpdated);
        }
        assert_eq!(engine.queue_depths().0, depth);
        assert!(noisy.outcomes().is_empty());

        // One past capacity: dropped, counted, failed.
        noisy.raise(EventKind::AutoUpdated);
        assert_eq!(engine.queue_depths().0, depth);
        assert_eq!(engine.stats().tx_errors, 1);
        assert_eq!(noisy.outcomes(), vec![false]);
    }

    #[test]
    fn regular_queue_waits_for_priority() {
        let harness = Harness::new();
        let blocker = on_change_object(1, "Attitude", true);
        let reg = on_change_object(2, "Gps", true);
        let prio = on_change_object(3, "Baro", true);
        harness.store.add(Arc::clone(&blocker));
        harness.store.add(Arc::clone(&reg));
        harness.store.add(Arc::clone(&prio));
        let engine = harness.engine();

        blocker.raise(EventKind::ManualUpdated);
        harness.transport.clear_frames();

        {
            let mut state = engine.state.lock();
            let entry = QueueEntry::new(
                Arc::clone(&reg) as ObjectRef,
                EventKind::ManualUpdated,
                false,
            );
            engine.process_event(&mut state, entry, false);
            let entry = QueueEntry::new(
                Arc::clone(&prio) as ObjectRef,
                EventKind::ManualUpdated,
                false,
            );
            engine.process_event(&mut state, entry, true);
        }
        assert_eq!(engine.queue_depths(), (1, 1));

        // Each completion hands the slot to the next entry: the priority
        // one goes out first even though it was enqueued second.
        engine.transaction_completed(&(Arc::clone(&blocker) as ObjectRef));
        engine.transaction_completed(&(Arc::clone(&prio) as ObjectRef));
        engine.transaction_completed(&(Arc::clone(&reg) as ObjectRef));

        assert_eq!(
            harness.transport.frames(),
            vec![
                SentFrame::Object {
                    id: ObjectId::new(3),
                    acked: true,
                    all_instances: false,
                },
                SentFrame::Object {
                    id: ObjectId::new(2),
                    acked: true,
                    all_instances: false,
                },
            ]
        );
        assert_eq!(engine.queue_depths(), (0, 0));
        assert_eq!(prio.outcomes(), vec![true]);
        assert_eq!(reg.outcomes(), vec![true]);
    }

    #[test]
    fn disconnected_gate_fails_non_sentinel_traffic() {
        let harness = Harness::new();
        harness.sentinel.set_field("Status", "Handshaking");
        let obj = on_change_object(1, "Attitude", false);
        harness.store.add(Arc::clone(&obj));
        let engine = harness.engine();
        assert!(!engine.connected());

        obj.raise(EventKind::AutoUpdated);

        assert!(harness.transport.frames().is_empty());
        assert_eq!(obj.outcomes(), vec![false]);

        // Sentinel traffic still passes, to let the connection establish.
        harness.sentinel.raise(EventKind::ManualUpdated);
        assert_eq!(
            harness.transport.frames(),
            vec![SentFrame::Object {
                id: ObjectId::new(0xffff),
                acked: false,
                all_instances: false,
            }]
        );

        // Once connected, normal traffic resumes.
        harness.sentinel.set_field("Status", "Connected");
        obj.raise(EventKind::AutoUpdated);
        assert_eq!(engine.stats().tx_errors, 0);
        assert_eq!(obj.outcomes(), vec![false]);
        assert_eq!(harness.transport.frames().len(), 2);
    }

    #[test]
    fn disconnected_gate_clears_regular_queue() {
        let harness = Harness::new();
        harness.sentinel.set_field("Status", "Handshaking");
        let blocker = on_change_object(1, "Attitude", true);
        let reg = on_change_object(2, "Gps", false);
        harness.store.add(Arc::clone(&blocker));
        harness.store.add(Arc::clone(&reg));
        let engine = harness.engine();

        {
            let mut state = engine.state.lock();
            // Park a regular entry behind a priority one without a
            // transaction pending yet.
            state
                .queue
                .push(
                    QueueEntry::new(Arc::clone(&reg) as ObjectRef, EventKind::ManualUpdated, false),
                    false,
                )
                .unwrap();
            state
                .queue
                .push(
                    QueueEntry::new(
                        Arc::clone(&blocker) as ObjectRef,
                        EventKind::ManualUpdated,
                        false,
                    ),
                    true,
                )
                .unwrap();
            engine.drain_queue(&mut state);
        }

        // The priority entry was dequeued and failed by the gate; the
        // regular queue was discarded wholesale.
        assert_eq!(engine.queue_depths(), (0, 0));
        assert_eq!(blocker.outcomes(), vec![false]);
        assert!(reg.outcomes().is_empty(), "cleared entries fail silently");
    }

    #[test]
    fn unpacked_event_starts_no_transaction_but_keeps_draining() {
        let harness = Harness::new();
        let parent = on_change_object(1, "Gps", false);
        let meta = MemoryObject::new_meta(
            ObjectId::new(2),
            "GpsMeta",
            Metadata::on_change(false),
            Arc::clone(&parent) as ObjectRef,
        );
        let follower = on_change_object(3, "Baro", false);
        harness.store.add(Arc::clone(&parent));
        harness.store.add(Arc::clone(&meta));
        harness.store.add(Arc::clone(&follower));
        let engine = harness.engine();

        {
            let mut state = engine.state.lock();
            state
                .queue
                .push(
                    QueueEntry::new(Arc::clone(&meta) as ObjectRef, EventKind::Unpacked, false),
                    true,
                )
                .unwrap();
            state
                .queue
                .push(
                    QueueEntry::new(
                        Arc::clone(&follower) as ObjectRef,
                        EventKind::ManualUpdated,
                        false,
                    ),
                    true,
                )
                .unwrap();
            engine.drain_queue(&mut state);
        }

        // No frame for the unpack, and the follower was not left stuck.
        assert_eq!(
            harness.transport.frames(),
            vec![SentFrame::Object {
                id: ObjectId::new(3),
                acked: false,
                all_instances: false,
            }]
        );
    }

    #[test]
    fn metaobject_dequeue_reapplies_parent_policy() {
        let harness = Harness::new();
        let parent = MemoryObject::new(ObjectId::new(1), "Gps", Metadata::manual(false));
        let meta = MemoryObject::new_meta(
            ObjectId::new(2),
            "GpsMeta",
            Metadata::on_change(false),
            Arc::clone(&parent) as ObjectRef,
        );
        harness.store.add(Arc::clone(&parent));
        harness.store.add(Arc::clone(&meta));
        let engine = harness.engine();

        // Manual mode: auto updates are not subscribed.
        assert!(!parent
            .connected_events()
            .contains(EventKind::AutoUpdated));

        // The peer rewrites the parent's policy via the metaobject.
        parent.set_metadata(Metadata::on_change(false));
        meta.raise(EventKind::Unpacked);

        assert!(parent
            .connected_events()
            .contains(EventKind::AutoUpdated));
        let _ = engine;
    }

    #[test]
    fn dequeue_while_pending_is_a_guarded_noop() {
        let harness = Harness::new();
        let blocker = on_change_object(1, "Attitude", true);
        let waiting = on_change_object(2, "Gps", false);
        harness.store.add(Arc::clone(&blocker));
        harness.store.add(Arc::clone(&waiting));
        let engine = harness.engine();

        blocker.raise(EventKind::ManualUpdated);
        waiting.raise(EventKind::ManualUpdated);
        assert_eq!(engine.queue_depths().0, 1);

        {
            let mut state = engine.state.lock();
            engine.drain_queue(&mut state);
        }
        // Still queued; nothing was corrupted.
        assert_eq!(engine.queue_depths().0, 1);
        assert!(engine.transaction_pending());
    }

    #[test]
    fn periodic_tick_enqueues_all_instances_push() {
        let harness = Harness::new();
        let obj = MemoryObject::new(ObjectId::new(1), "Battery", Metadata::periodic(100, false));
        harness.store.add(Arc::clone(&obj));
        let engine = harness.engine();

        let tick = harness.timers.get("tick").unwrap();
        assert_eq!(tick.armed(), Some(Duration::from_millis(1000)));
        assert!(tick.fire());

        assert_eq!(
            harness.transport.frames(),
            vec![SentFrame::Object {
                id: ObjectId::new(1),
                acked: false,
                all_instances: true,
            }]
        );

        // Re-armed for at most one period ahead.
        let next = tick.armed().unwrap();
        assert!(next <= Duration::from_millis(100), "re-armed with {next:?}");
        let _ = engine;
    }

    #[test]
    fn stats_reset_clears_local_counters() {
        let harness = Harness::new();
        let obj = on_change_object(1, "Attitude", true);
        harness.store.add(Arc::clone(&obj));
        let engine = harness.engine();

        obj.raise(EventKind::ManualUpdated);
        let timeout = harness.timers.get("transaction").unwrap();
        // Exhaust the retry budget: initial send + 2 retries.
        assert!(timeout.fire());
        assert!(timeout.fire());
        assert!(timeout.fire());

        let stats = engine.stats();
        assert_eq!(stats.tx_retries, 2);
        assert_eq!(stats.tx_errors, 1);

        engine.reset_stats();
        let stats = engine.stats();
        assert_eq!(stats.tx_retries, 0);
        assert_eq!(stats.tx_errors, 0);
    }
}
