//! Test doubles shared by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::client::SseConfig;
use crate::engine::{CloseReason, Engine, Host, Subscriber};
use crate::identifiers::{ElementId, SubscriberId};
use crate::protocol::InboundMessage;
use crate::transport::{
    EventReceiver, EventSender, Transport, TransportEvent, TransportEventKind, TransportFactory,
    TransportRequest,
};

// ============================================================================
// RecordingHost
// ============================================================================

/// Host callback observed by [`RecordingHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostCall {
    Open(ElementId),
    Error(ElementId, String),
    Closed(ElementId, CloseReason),
    Before(SubscriberId),
    Swap(ElementId, String),
    /// Element, trigger spec, message id.
    Trigger(ElementId, String, String),
    After(SubscriberId),
    Unmatched(ElementId),
}

#[derive(Default)]
struct HostState {
    present: FxHashSet<ElementId>,
    parents: FxHashMap<ElementId, ElementId>,
    vetoes: FxHashSet<SubscriberId>,
    calls: Vec<HostCall>,
}

/// In-memory element tree that records every callback.
#[derive(Default)]
pub(crate) struct RecordingHost {
    state: Mutex<HostState>,
}

impl RecordingHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds `element` to the tree under `parent`.
    pub(crate) fn attach(&self, element: u64, parent: Option<u64>) {
        let mut state = self.state.lock();
        let element = ElementId::new(element);
        state.present.insert(element);
        if let Some(parent) = parent {
            state.parents.insert(element, ElementId::new(parent));
        }
    }

    /// Removes `element` from the tree.
    pub(crate) fn detach(&self, element: u64) {
        self.state.lock().present.remove(&ElementId::new(element));
    }

    /// Makes `on_before_message` veto swaps for `subscriber`.
    pub(crate) fn veto(&self, subscriber: SubscriberId) {
        self.state.lock().vetoes.insert(subscriber);
    }

    pub(crate) fn calls(&self) -> Vec<HostCall> {
        self.state.lock().calls.clone()
    }

    pub(crate) fn clear(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, call: HostCall) {
        self.state.lock().calls.push(call);
    }
}

impl Host for RecordingHost {
    fn is_present(&self, element: ElementId) -> bool {
        self.state.lock().present.contains(&element)
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.state.lock().parents.get(&element).copied()
    }

    fn replace_content(&self, element: ElementId, data: &str) {
        self.record(HostCall::Swap(element, data.to_string()));
    }

    fn run_trigger(&self, element: ElementId, spec: &str, message: &InboundMessage) {
        self.record(HostCall::Trigger(element, spec.to_string(), message.id.clone()));
    }

    fn on_connection_open(&self, scope: ElementId) {
        self.record(HostCall::Open(scope));
    }

    fn on_connection_error(&self, scope: ElementId, info: &str) {
        self.record(HostCall::Error(scope, info.to_string()));
    }

    fn on_connection_closed(&self, scope: ElementId, reason: CloseReason) {
        self.record(HostCall::Closed(scope, reason));
    }

    fn on_before_message(&self, subscriber: &Subscriber, _message: &InboundMessage) -> bool {
        self.record(HostCall::Before(subscriber.id));
        !self.state.lock().vetoes.contains(&subscriber.id)
    }

    fn on_after_message(&self, subscriber: &Subscriber, _message: &InboundMessage) {
        self.record(HostCall::After(subscriber.id));
    }

    fn on_unmatched(&self, scope: ElementId, _message: &InboundMessage) {
        self.record(HostCall::Unmatched(scope));
    }
}

// ============================================================================
// MockFactory
// ============================================================================

/// One transport handed out by [`MockFactory`].
struct MockRecord {
    request: TransportRequest,
    events: EventSender,
    opened_at: Instant,
    listening: Arc<Mutex<FxHashSet<String>>>,
    closed: Arc<AtomicBool>,
}

/// Transport factory that records attempts and lets tests inject events.
#[derive(Clone, Default)]
pub(crate) struct MockFactory {
    records: Arc<Mutex<Vec<MockRecord>>>,
}

impl MockFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Requests in open order.
    pub(crate) fn opened(&self) -> Vec<TransportRequest> {
        self.records.lock().iter().map(|r| r.request.clone()).collect()
    }

    pub(crate) fn opened_at(&self, index: usize) -> Instant {
        self.records.lock()[index].opened_at
    }

    pub(crate) fn is_closed(&self, index: usize) -> bool {
        self.records.lock()[index].closed.load(Ordering::SeqCst)
    }

    pub(crate) fn is_listening(&self, index: usize, event_type: &str) -> bool {
        self.records.lock()[index].listening.lock().contains(event_type)
    }

    /// Builds an event as if attempt `index` produced it.
    pub(crate) fn event(&self, index: usize, kind: TransportEventKind) -> TransportEvent {
        TransportEvent::new(&self.records.lock()[index].request, kind)
    }

    pub(crate) fn open_event(&self, index: usize) -> TransportEvent {
        self.event(index, TransportEventKind::Open)
    }

    pub(crate) fn error_event(&self, index: usize, info: &str) -> TransportEvent {
        self.event(index, TransportEventKind::Error(info.to_string()))
    }

    pub(crate) fn message_event(&self, index: usize, message: InboundMessage) -> TransportEvent {
        self.event(index, TransportEventKind::Message(message))
    }

    /// Sends an event through attempt `index`'s channel.
    pub(crate) fn emit(&self, index: usize, kind: TransportEventKind) {
        let records = self.records.lock();
        let record = &records[index];
        let _ = record
            .events
            .send(TransportEvent::new(&record.request, kind));
    }
}

impl TransportFactory for MockFactory {
    fn open(&self, request: TransportRequest, events: EventSender) -> Box<dyn Transport> {
        let listening = Arc::new(Mutex::new(FxHashSet::default()));
        let closed = Arc::new(AtomicBool::new(false));

        self.records.lock().push(MockRecord {
            request,
            events,
            opened_at: Instant::now(),
            listening: Arc::clone(&listening),
            closed: Arc::clone(&closed),
        });

        Box::new(MockTransport { listening, closed })
    }
}

struct MockTransport {
    listening: Arc<Mutex<FxHashSet<String>>>,
    closed: Arc<AtomicBool>,
}

impl Transport for MockTransport {
    fn listen(&mut self, event_type: &str) {
        self.listening.lock().insert(event_type.to_string());
    }

    fn unlisten(&mut self, event_type: &str) {
        self.listening.lock().remove(event_type);
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Engine wired to a recording host and a mock factory.
pub(crate) fn fixture() -> (Engine, Arc<RecordingHost>, MockFactory, EventReceiver) {
    let host = Arc::new(RecordingHost::new());
    let factory = MockFactory::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let engine = Engine::new(
        SseConfig::default(),
        Arc::clone(&host) as Arc<dyn Host>,
        Arc::new(factory.clone()),
        tx,
    );

    (engine, host, factory, rx)
}
