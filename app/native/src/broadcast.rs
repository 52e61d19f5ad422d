//! Fan-out of display events to listener groups.
//!
//! Several independent owners may each hold listeners for the same physical
//! display. Every listener receives every event published for its display
//! exactly once, on its own executor and never on the publisher's stack.
//!
//! Listeners are held strongly until explicitly unsubscribed.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::events::DisplayEvent;
use crate::insets::DisplayId;

/// A unit of work posted to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Receives events for the displays it subscribed to.
pub trait DisplayEventListener: Send + Sync {
    /// Called on the listener's executor for each published event.
    fn on_event(&self, display_id: DisplayId, event: &DisplayEvent);
}

/// Execution context a listener wants its events delivered on.
pub trait Executor: Send + Sync {
    /// Queues `task` to run later.
    fn post(&self, task: Task);
}

/// Executor that runs tasks one at a time, in posting order, on a tokio task.
#[derive(Debug, Clone)]
pub struct SerialExecutor {
    sender: mpsc::UnboundedSender<Task>,
}

impl SerialExecutor {
    /// Spawns the draining task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn spawn(name: &'static str) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Task>();
        tokio::spawn(async move {
            tracing::trace!(executor = name, "serial executor started");
            while let Some(task) = receiver.recv().await {
                task();
            }
            tracing::trace!(executor = name, "serial executor stopped");
        });
        Self { sender }
    }
}

impl Executor for SerialExecutor {
    fn post(&self, task: Task) {
        if self.sender.send(task).is_err() {
            tracing::warn!("serial executor stopped, dropping task");
        }
    }
}

#[derive(Clone)]
struct Subscriber {
    listener: Arc<dyn DisplayEventListener>,
    executor: Arc<dyn Executor>,
}

fn same_listener(a: &Arc<dyn DisplayEventListener>, b: &Arc<dyn DisplayEventListener>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

/// Per-display listener groups.
#[derive(Default)]
pub struct CrossProcessEventBroadcaster {
    groups: DashMap<DisplayId, Vec<Subscriber>>,
}

impl CrossProcessEventBroadcaster {
    /// Creates a broadcaster with no groups.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Adds `listener` to the group of `display_id`, creating the group if
    /// needed. Subscribing the same listener twice is a no-op.
    pub fn subscribe(
        &self,
        display_id: DisplayId,
        listener: Arc<dyn DisplayEventListener>,
        executor: Arc<dyn Executor>,
    ) {
        let mut group = self.groups.entry(display_id).or_default();
        if group.iter().any(|s| same_listener(&s.listener, &listener)) {
            return;
        }
        group.push(Subscriber { listener, executor });
        tracing::debug!(display = display_id, listeners = group.len(), "listener subscribed");
    }

    /// Removes `listener` from the group of `display_id`.
    ///
    /// Returns `false` if the group or the listener is absent.
    pub fn unsubscribe(&self, display_id: DisplayId, listener: &Arc<dyn DisplayEventListener>) -> bool {
        let Some(mut group) = self.groups.get_mut(&display_id) else {
            return false;
        };
        let before = group.len();
        group.retain(|s| !same_listener(&s.listener, listener));
        let removed = group.len() != before;
        if removed {
            tracing::debug!(display = display_id, listeners = group.len(), "listener unsubscribed");
        }
        removed
    }

    /// Posts `event` to every listener of `display_id`, each on its own
    /// executor. Does nothing if the display has no group.
    pub fn publish(&self, display_id: DisplayId, event: DisplayEvent) {
        // Snapshot so a listener may (un)subscribe from its callback
        let subscribers = match self.groups.get(&display_id) {
            Some(group) => group.clone(),
            None => return,
        };
        tracing::debug!(
            display = display_id,
            event = event.name(),
            listeners = subscribers.len(),
            "publishing display event"
        );
        for Subscriber { listener, executor } in subscribers {
            executor.post(Box::new(move || listener.on_event(display_id, &event)));
        }
    }

    /// Number of listeners subscribed to `display_id`.
    #[must_use]
    pub fn listener_count(&self, display_id: DisplayId) -> usize {
        self.groups.get(&display_id).map_or(0, |group| group.len())
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct QueueExecutor {
        tasks: Mutex<Vec<Task>>,
    }

    impl QueueExecutor {
        fn run_all(&self) -> usize {
            let tasks: Vec<Task> = std::mem::take(&mut *self.tasks.lock());
            let count = tasks.len();
            for task in tasks {
                task();
            }
            count
        }
    }

    impl Executor for QueueExecutor {
        fn post(&self, task: Task) { self.tasks.lock().push(task); }
    }

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<(DisplayId, DisplayEvent)>>,
    }

    impl DisplayEventListener for RecordingListener {
        fn on_event(&self, display_id: DisplayId, event: &DisplayEvent) {
            self.events.lock().push((display_id, *event));
        }
    }

    const SHOWING: DisplayEvent = DisplayEvent::KeyboardVisibilityChanged { showing: true };

    #[test]
    fn test_publish_is_posted_not_synchronous() {
        let broadcaster = CrossProcessEventBroadcaster::new();
        let executor = Arc::new(QueueExecutor::default());
        let listener = Arc::new(RecordingListener::default());
        broadcaster.subscribe(1, listener.clone(), executor.clone());

        broadcaster.publish(1, SHOWING);
        assert!(listener.events.lock().is_empty());

        assert_eq!(executor.run_all(), 1);
        assert_eq!(*listener.events.lock(), vec![(1, SHOWING)]);
    }

    #[test]
    fn test_every_listener_receives_each_event_once() {
        let broadcaster = CrossProcessEventBroadcaster::new();
        let first_executor = Arc::new(QueueExecutor::default());
        let second_executor = Arc::new(QueueExecutor::default());
        let first = Arc::new(RecordingListener::default());
        let second = Arc::new(RecordingListener::default());

        broadcaster.subscribe(1, first.clone(), first_executor.clone());
        broadcaster.subscribe(1, first.clone(), first_executor.clone());
        broadcaster.subscribe(1, second.clone(), second_executor.clone());
        assert_eq!(broadcaster.listener_count(1), 2);

        broadcaster.publish(1, SHOWING);
        first_executor.run_all();
        second_executor.run_all();

        assert_eq!(first.events.lock().len(), 1);
        assert_eq!(second.events.lock().len(), 1);
    }

    #[test]
    fn test_publish_only_reaches_its_display() {
        let broadcaster = CrossProcessEventBroadcaster::new();
        let executor = Arc::new(QueueExecutor::default());
        let listener = Arc::new(RecordingListener::default());
        broadcaster.subscribe(1, listener.clone(), executor.clone());

        broadcaster.publish(2, SHOWING);
        assert_eq!(executor.run_all(), 0);
    }

    #[test]
    fn test_unsubscribed_listener_is_not_invoked() {
        let broadcaster = CrossProcessEventBroadcaster::new();
        let executor = Arc::new(QueueExecutor::default());
        let listener = Arc::new(RecordingListener::default());
        let handle: Arc<dyn DisplayEventListener> = listener.clone();
        broadcaster.subscribe(1, handle.clone(), executor.clone());

        assert!(broadcaster.unsubscribe(1, &handle));
        broadcaster.publish(1, SHOWING);
        executor.run_all();

        assert!(listener.events.lock().is_empty());
    }

    #[test]
    fn test_unsubscribe_absent_is_false() {
        let broadcaster = CrossProcessEventBroadcaster::new();
        let handle: Arc<dyn DisplayEventListener> = Arc::new(RecordingListener::default());

        assert!(!broadcaster.unsubscribe(1, &handle));

        let other: Arc<dyn DisplayEventListener> = Arc::new(RecordingListener::default());
        broadcaster.subscribe(1, other, Arc::new(QueueExecutor::default()));
        assert!(!broadcaster.unsubscribe(1, &handle));
    }

    #[tokio::test]
    async fn test_serial_executor_runs_in_order() {
        let executor = SerialExecutor::spawn("test");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        for i in 0..3 {
            let seen = seen.clone();
            executor.post(Box::new(move || seen.lock().push(i)));
        }
        executor.post(Box::new(move || {
            let _ = done_tx.send(());
        }));

        done_rx.await.unwrap();
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }
}
