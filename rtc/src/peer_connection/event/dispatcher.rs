use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};

use super::{RTCPeerConnectionEvent, RTCPeerConnectionEventHandler, dispatch_to};
use crate::engine::{EngineEvent, EngineNotifier};
use crate::peer_connection::state::RTCIceGatheringState;
use shared::error::{Error, Result};

const DELIVERY_THREAD_NAME: &str = "rtc-peer-events";

/// Turns one engine notification into the connection events it causes. Runs on the delivery
/// thread, in queue order.
pub(crate) type EngineEventTranslator =
    Box<dyn FnMut(EngineEvent) -> Vec<RTCPeerConnectionEvent> + Send>;

enum Notification {
    Engine(EngineEvent),
    Event(RTCPeerConnectionEvent),
}

#[derive(Default)]
struct Queue {
    items: VecDeque<Notification>,
    closed: bool,
}

/// The queue shared by the connection, the engine notifiers and the delivery thread.
#[derive(Default)]
pub(crate) struct DispatcherShared {
    queue: Mutex<Queue>,
    ready: Condvar,
}

impl DispatcherShared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, notification: Notification) -> bool {
        let mut queue = self.lock();
        if queue.closed {
            return false;
        }
        queue.items.push_back(notification);
        self.ready.notify_one();
        true
    }

    pub(crate) fn push_engine(&self, event: EngineEvent) -> bool {
        let accepted = self.push(Notification::Engine(event));
        if !accepted {
            log::trace!("event queue closed, engine notification dropped");
        }
        accepted
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Blocks until a notification is queued. `None` once the queue is closed and drained.
    fn next(&self) -> Option<Notification> {
        let mut queue = self.lock();
        loop {
            if let Some(notification) = queue.items.pop_front() {
                return Some(notification);
            }
            if queue.closed {
                return None;
            }
            queue = self
                .ready
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[derive(Default)]
struct Consumers {
    handlers: Vec<Arc<dyn RTCPeerConnectionEventHandler>>,
    subscribers: Vec<UnboundedSender<RTCPeerConnectionEvent>>,
}

/// One ordered event queue per connection, drained by a dedicated delivery thread.
///
/// Engine notifications are translated into connection events when they reach the head of
/// the queue, so engine events and events raised by connection calls come out in one
/// order. Handlers and subscribers are served without any lock held.
pub(crate) struct EventDispatcher {
    shared: Arc<DispatcherShared>,
    consumers: Arc<Mutex<Consumers>>,
    translator: Mutex<Option<EngineEventTranslator>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: Mutex<Option<ThreadId>>,
}

impl EventDispatcher {
    pub(crate) fn new(translator: EngineEventTranslator) -> Self {
        Self {
            shared: Arc::new(DispatcherShared::default()),
            consumers: Arc::new(Mutex::new(Consumers::default())),
            translator: Mutex::new(Some(translator)),
            worker: Mutex::new(None),
            worker_id: Mutex::new(None),
        }
    }

    /// Spawns the delivery thread. Calling it twice is a no-op.
    pub(crate) fn start(&self) -> Result<()> {
        let Some(mut translator) = self.translator.lock()?.take() else {
            return Ok(());
        };
        let shared = Arc::clone(&self.shared);
        let consumers = Arc::clone(&self.consumers);

        let handle = thread::Builder::new()
            .name(DELIVERY_THREAD_NAME.to_owned())
            .spawn(move || {
                log::debug!("event delivery started");
                let mut delivery = Delivery {
                    consumers,
                    last_gathering_state: None,
                };
                while let Some(notification) = shared.next() {
                    match notification {
                        Notification::Engine(event) => {
                            log::trace!("translating engine notification {event}");
                            for translated in translator(event) {
                                delivery.deliver(translated);
                            }
                        }
                        Notification::Event(event) => delivery.deliver(event),
                    }
                }
                log::debug!("event delivery stopped");
            })
            .map_err(|err| Error::ErrEngineInit(format!("cannot spawn event thread: {err}")))?;

        *self.worker_id.lock()? = Some(handle.thread().id());
        *self.worker.lock()? = Some(handle);
        Ok(())
    }

    pub(crate) fn notifier(&self) -> EngineNotifier {
        EngineNotifier::new(Arc::downgrade(&self.shared))
    }

    /// Queues an event raised by a connection call.
    pub(crate) fn emit(&self, event: RTCPeerConnectionEvent) {
        if !self.shared.push(Notification::Event(event)) {
            log::trace!("event queue closed, event dropped");
        }
    }

    pub(crate) fn emit_all(&self, events: impl IntoIterator<Item = RTCPeerConnectionEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    pub(crate) fn add_handler(&self, handler: Arc<dyn RTCPeerConnectionEventHandler>) {
        self.consumers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handlers
            .push(handler);
    }

    /// A stream of every event queued from now on. Ends once the connection is closed and
    /// the remaining events were delivered.
    pub(crate) fn subscribe(&self) -> RTCPeerConnectionEventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        // consumers are released by the delivery thread when it stops; a sender created
        // after that would keep the stream open forever
        let queue = self.shared.lock();
        if !queue.closed {
            self.consumers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .subscribers
                .push(tx);
        }
        drop(queue);
        RTCPeerConnectionEventStream { rx }
    }

    /// Stops accepting notifications. Already queued events are still delivered, then the
    /// delivery thread exits.
    pub(crate) fn close(&self) {
        let mut queue = self.shared.lock();
        if !queue.closed {
            queue.closed = true;
            self.shared.ready.notify_all();
            log::debug!("event queue closed with {} pending", queue.items.len());
        }
    }

    fn on_delivery_thread(&self) -> bool {
        let worker_id = *self.worker_id.lock().unwrap_or_else(PoisonError::into_inner);
        worker_id == Some(thread::current().id())
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.close();
        // the last reference may go away inside a handler; the thread then finishes alone
        if self.on_delivery_thread() {
            return;
        }
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                log::error!("event delivery thread panicked");
            }
        }
    }
}

struct Delivery {
    consumers: Arc<Mutex<Consumers>>,
    last_gathering_state: Option<RTCIceGatheringState>,
}

impl Delivery {
    fn deliver(&mut self, event: RTCPeerConnectionEvent) {
        if let RTCPeerConnectionEvent::OnIceGatheringStateChangeEvent(state) = event {
            if self.last_gathering_state == Some(state) {
                log::trace!("suppressing repeated icegatheringstatechange({state})");
                return;
            }
            self.last_gathering_state = Some(state);
        }
        log::trace!("delivering {}", event.name());

        let (handlers, subscribers) = {
            let consumers = self
                .consumers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            (consumers.handlers.clone(), consumers.subscribers.clone())
        };

        for handler in handlers {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| dispatch_to(handler.as_ref(), &event)));
            if outcome.is_err() {
                log::error!("event handler panicked on {}", event.name());
            }
        }

        let mut gone = false;
        for subscriber in &subscribers {
            gone |= subscriber.send(event.clone()).is_err();
        }
        if gone {
            self.consumers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .subscribers
                .retain(|s| !s.is_closed());
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        // ends every subscriber stream
        let mut consumers = self
            .consumers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        consumers.subscribers.clear();
        consumers.handlers.clear();
    }
}

/// Pull-mode consumer of connection events.
pub struct RTCPeerConnectionEventStream {
    rx: UnboundedReceiver<RTCPeerConnectionEvent>,
}

impl RTCPeerConnectionEventStream {
    /// Waits for the next event; `None` once the connection is closed and drained.
    pub async fn recv(&mut self) -> Option<RTCPeerConnectionEvent> {
        self.rx.recv().await
    }

    /// Blocking variant of [`recv`](Self::recv) for plain threads.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn blocking_recv(&mut self) -> Option<RTCPeerConnectionEvent> {
        self.rx.blocking_recv()
    }

    /// The next event if one is ready.
    pub fn try_recv(&mut self) -> Option<RTCPeerConnectionEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Reports whether the stream ended: the connection is closed and every event was
    /// received.
    pub fn is_terminated(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }
}

impl fmt::Debug for RTCPeerConnectionEventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RTCPeerConnectionEventStream")
            .field("queued", &self.rx.len())
            .finish()
    }
}
