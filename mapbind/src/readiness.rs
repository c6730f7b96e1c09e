//! Readiness gating: deferring engine mutations until the engine reached the required
//! initialization state.
//!
//! The engine moves through [`ReadinessState`]s in one direction only. A binding that needs a
//! given state asks the map with [`MapHandle::when_ready`], which either runs the callback right
//! away or queues it until the state is reached. The returned [`Deferred`] lets the binding
//! cancel a queued callback when it is detached first.

use std::cell::Cell;
use std::rc::Rc;

use crate::event::MapEventKind;
use crate::handle::MapHandle;

/// Initialization state of an engine instance. Never regresses within one instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadinessState {
    /// Neither the style nor the resources are loaded.
    #[default]
    Initializing,
    /// The style was parsed; sources, layers and terrain can be added.
    StyleReady,
    /// All resources are loaded; feature queries are reliable.
    FullyLoaded,
}

impl ReadinessState {
    /// Returns true if a callback waiting for `gate` may run in this state.
    pub fn satisfies(self, gate: Gate) -> bool {
        self >= gate.required_state()
    }
}

/// Condition a deferred callback waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Required before adding sources, layers and terrain.
    StyleReady,
    /// Required before feature queries and removal of style dependent resources.
    FullyLoaded,
}

impl Gate {
    /// State that opens the gate.
    pub fn required_state(self) -> ReadinessState {
        match self {
            Self::StyleReady => ReadinessState::StyleReady,
            Self::FullyLoaded => ReadinessState::FullyLoaded,
        }
    }

    /// Event that signals the gate opened.
    pub fn event(self) -> MapEventKind {
        match self {
            Self::StyleReady => MapEventKind::StyleLoad,
            Self::FullyLoaded => MapEventKind::Load,
        }
    }
}

/// State of a deferred callback.
///
/// `Pending` is the only state with outgoing transitions: to `Bound` when the callback runs and
/// to `Cancelled` when its owner gives up on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredState {
    /// Waiting for the gate to open.
    Pending,
    /// The callback ran.
    Bound,
    /// The callback was cancelled and will never run.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WaiterId(u64);

/// Handle to a callback passed to [`MapHandle::when_ready`].
#[derive(Debug, Clone)]
pub struct Deferred {
    inner: Rc<DeferredInner>,
}

#[derive(Debug)]
struct DeferredInner {
    gate: Gate,
    state: Cell<DeferredState>,
    waiter: Cell<Option<WaiterId>>,
}

impl Deferred {
    fn new(gate: Gate) -> Self {
        Self {
            inner: Rc::new(DeferredInner {
                gate,
                state: Cell::new(DeferredState::Pending),
                waiter: Cell::new(None),
            }),
        }
    }

    /// Gate the callback waits for.
    pub fn gate(&self) -> Gate {
        self.inner.gate
    }

    /// Current state.
    pub fn state(&self) -> DeferredState {
        self.inner.state.get()
    }

    /// Returns true if the callback has not run and was not cancelled.
    pub fn is_pending(&self) -> bool {
        self.state() == DeferredState::Pending
    }

    /// Cancels the callback if it is still pending. Returns true if it was.
    ///
    /// Cancelling a callback that already ran or was already cancelled does nothing.
    pub fn cancel(&self, map: &MapHandle) -> bool {
        if !self.transition(DeferredState::Cancelled) {
            return false;
        }

        if let Some(waiter) = self.inner.waiter.take() {
            map.cancel_waiter(waiter);
        }

        true
    }

    fn bind(&self) -> bool {
        self.inner.waiter.set(None);
        self.transition(DeferredState::Bound)
    }

    fn transition(&self, to: DeferredState) -> bool {
        let from = self.inner.state.get();
        if from != DeferredState::Pending {
            log::debug!("Ignoring {from:?} -> {to:?} transition of a deferred callback");
            return false;
        }

        self.inner.state.set(to);
        true
    }
}

pub(crate) type ReadyCallback = Box<dyn FnOnce(&MapHandle)>;

struct Waiter {
    id: WaiterId,
    deferred: Deferred,
    callback: ReadyCallback,
}

/// Queue of callbacks waiting for a gate, in registration order.
#[derive(Default)]
pub(crate) struct Waiters {
    next_id: u64,
    queue: Vec<Waiter>,
}

/// A queued callback whose gate opened.
pub(crate) struct ReadyWaiter {
    deferred: Deferred,
    callback: ReadyCallback,
}

impl ReadyWaiter {
    /// Runs the callback unless the deferred left the pending state in the meantime.
    pub(crate) fn run(self, map: &MapHandle) {
        if self.deferred.bind() {
            (self.callback)(map);
        }
    }
}

impl Waiters {
    pub(crate) fn push(&mut self, gate: Gate, callback: ReadyCallback) -> Deferred {
        let id = WaiterId(self.next_id);
        self.next_id += 1;

        let deferred = Deferred::new(gate);
        deferred.inner.waiter.set(Some(id));
        self.queue.push(Waiter {
            id,
            deferred: deferred.clone(),
            callback,
        });

        deferred
    }

    pub(crate) fn remove(&mut self, id: WaiterId) -> bool {
        let len = self.queue.len();
        self.queue.retain(|waiter| waiter.id != id);
        self.queue.len() != len
    }

    /// Removes and returns all waiters whose gate is open in `state`, keeping their order.
    pub(crate) fn take_ready(&mut self, state: ReadinessState) -> Vec<ReadyWaiter> {
        let (ready, pending): (Vec<Waiter>, Vec<Waiter>) = std::mem::take(&mut self.queue)
            .into_iter()
            .partition(|waiter| state.satisfies(waiter.deferred.gate()));
        self.queue = pending;

        ready
            .into_iter()
            .map(|waiter| ReadyWaiter {
                deferred: waiter.deferred,
                callback: waiter.callback,
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// Drops all waiters, moving them to the cancelled state.
    pub(crate) fn clear(&mut self) {
        for waiter in self.queue.drain(..) {
            waiter.deferred.inner.waiter.set(None);
            waiter.deferred.transition(DeferredState::Cancelled);
        }
    }
}

/// Creates a deferred that already ran, for callbacks executed synchronously.
pub(crate) fn bound(gate: Gate) -> Deferred {
    let deferred = Deferred::new(gate);
    deferred.bind();
    deferred
}

/// Creates a deferred that will never run, for callbacks refused by a destroyed map.
pub(crate) fn cancelled(gate: Gate) -> Deferred {
    let deferred = Deferred::new(gate);
    deferred.transition(DeferredState::Cancelled);
    deferred
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessEngine;
    use std::cell::RefCell;

    #[test]
    fn states_are_ordered() {
        assert!(ReadinessState::FullyLoaded.satisfies(Gate::StyleReady));
        assert!(ReadinessState::StyleReady.satisfies(Gate::StyleReady));
        assert!(!ReadinessState::StyleReady.satisfies(Gate::FullyLoaded));
        assert!(!ReadinessState::Initializing.satisfies(Gate::StyleReady));
    }

    #[test]
    fn take_ready_keeps_registration_order() {
        let order = Rc::new(RefCell::new(vec![]));
        let mut waiters = Waiters::default();

        for (index, gate) in [Gate::StyleReady, Gate::FullyLoaded, Gate::StyleReady]
            .into_iter()
            .enumerate()
        {
            let order = order.clone();
            waiters.push(gate, Box::new(move |_: &MapHandle| order.borrow_mut().push(index)));
        }

        let map = MapHandle::new(Box::new(HeadlessEngine::new()));
        for waiter in waiters.take_ready(ReadinessState::StyleReady) {
            waiter.run(&map);
        }
        assert_eq!(*order.borrow(), vec![0, 2]);
        assert_eq!(waiters.len(), 1);

        for waiter in waiters.take_ready(ReadinessState::FullyLoaded) {
            waiter.run(&map);
        }
        assert_eq!(*order.borrow(), vec![0, 2, 1]);
        assert_eq!(waiters.len(), 0);
    }

    #[test]
    fn transitions_out_of_final_states_are_ignored() {
        let deferred = Deferred::new(Gate::StyleReady);
        assert!(deferred.bind());
        assert_eq!(deferred.state(), DeferredState::Bound);

        assert!(!deferred.transition(DeferredState::Cancelled));
        assert!(!deferred.bind());
        assert_eq!(deferred.state(), DeferredState::Bound);
    }

    #[test]
    fn clear_cancels_pending_waiters() {
        let mut waiters = Waiters::default();
        let deferred = waiters.push(Gate::FullyLoaded, Box::new(|_: &MapHandle| {}));

        waiters.clear();

        assert_eq!(deferred.state(), DeferredState::Cancelled);
        assert_eq!(waiters.len(), 0);
    }
}
