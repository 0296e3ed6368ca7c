/*
    core_events - Synchronous typed event delivery

    Containers emit events in lockstep with state mutation: listeners
    run synchronously, in registration order, before the emitting call
    returns. Each delivery carries the event, whether the triggering
    operation was local, and the sequenced message when one exists.
*/

use crate::core_protocol::SequencedMessage;

/// Identifier returned by listener registration, used to unsubscribe
pub type ListenerId = u64;

type AlwaysFn<E> = Box<dyn FnMut(&E, bool, Option<&SequencedMessage>) + Send>;
type UntilFn<E> = Box<dyn FnMut(&E, bool, Option<&SequencedMessage>) -> bool + Send>;

enum Callback<E> {
    /// Runs on every emission until removed with `off`
    Always(AlwaysFn<E>),
    /// Runs until it returns true, then is removed
    Until(UntilFn<E>),
}

struct ListenerEntry<E> {
    id: ListenerId,
    callback: Callback<E>,
}

/// Listener registry for one event type
pub struct Emitter<E> {
    next_id: ListenerId,
    listeners: Vec<ListenerEntry<E>>,
}

impl<E> Emitter<E> {
    pub fn new() -> Self {
        Emitter { next_id: 0, listeners: Vec::new() }
    }

    /// Register a listener invoked on every emission
    pub fn on(
        &mut self,
        listener: impl FnMut(&E, bool, Option<&SequencedMessage>) + Send + 'static,
    ) -> ListenerId {
        self.push(Callback::Always(Box::new(listener)))
    }

    /// Register a listener removed after its first invocation
    pub fn once(
        &mut self,
        mut listener: impl FnMut(&E, bool, Option<&SequencedMessage>) + Send + 'static,
    ) -> ListenerId {
        self.until(move |event, local, message| {
            listener(event, local, message);
            true
        })
    }

    /// Register a listener removed once it returns true
    pub fn until(
        &mut self,
        listener: impl FnMut(&E, bool, Option<&SequencedMessage>) -> bool + Send + 'static,
    ) -> ListenerId {
        self.push(Callback::Until(Box::new(listener)))
    }

    /// Remove a listener; returns whether it was still registered
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.len() != before
    }

    /// Deliver an event to every listener, in registration order.
    ///
    /// Returns the number of listeners invoked.
    pub fn emit(&mut self, event: &E, local: bool, message: Option<&SequencedMessage>) -> usize {
        let mut delivered = 0;
        self.listeners.retain_mut(|entry| {
            delivered += 1;
            match &mut entry.callback {
                Callback::Always(cb) => {
                    cb(event, local, message);
                    true
                }
                Callback::Until(cb) => !cb(event, local, message),
            }
        });
        delivered
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn push(&mut self, callback: Callback<E>) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push(ListenerEntry { id, callback });
        id
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}
