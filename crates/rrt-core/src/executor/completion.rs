// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Single-fire completion markers.
//!
//! [`channel`] returns a [`Completer`] that travels with the task and a
//! [`Completion`] handed back to whoever submitted it. The completer fires at
//! most once; dropping it unfired (the task panicked, or the executor was
//! torn down before running it) resolves the handle as abandoned, so a waiter
//! never blocks forever.

use std::sync::{Arc, Condvar, Mutex, PoisonError};

use crate::error::ExecutorError;
use crate::milestone::lock;

#[derive(Debug)]
enum State<O> {
    Pending,
    Done(O),
    Taken,
    Abandoned,
}

#[derive(Debug)]
struct Slot<O> {
    state: Mutex<State<O>>,
    ready: Condvar,
}

impl<O> Slot<O> {
    fn resolve(&self, next: State<O>) {
        let mut state = lock(&self.state);
        if matches!(*state, State::Pending) {
            *state = next;
        }
        self.ready.notify_all();
    }
}

/// Producer side of a completion marker.
#[derive(Debug)]
pub struct Completer<O> {
    slot: Option<Arc<Slot<O>>>,
}

/// Waiter side of a completion marker.
///
/// Not `Clone`: exactly one party observes the outcome.
#[derive(Debug)]
pub struct Completion<O> {
    slot: Arc<Slot<O>>,
}

/// Creates a linked completer/completion pair.
pub(crate) fn channel<O>() -> (Completer<O>, Completion<O>) {
    let slot = Arc::new(Slot {
        state: Mutex::new(State::Pending),
        ready: Condvar::new(),
    });
    (
        Completer {
            slot: Some(Arc::clone(&slot)),
        },
        Completion { slot },
    )
}

impl<O> Completer<O> {
    /// Publishes the task's output and wakes the waiter.
    pub(crate) fn fire(mut self, value: O) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(State::Done(value));
        }
    }
}

impl<O> Drop for Completer<O> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.resolve(State::Abandoned);
        }
    }
}

impl<O> Completion<O> {
    /// Returns `true` once the task has either completed or been abandoned.
    pub fn is_complete(&self) -> bool {
        !matches!(*lock(&self.slot.state), State::Pending)
    }

    /// Blocks until the task resolves and returns its output.
    pub fn wait(self) -> Result<O, ExecutorError> {
        let mut state = lock(&self.slot.state);
        while matches!(*state, State::Pending) {
            state = self
                .slot
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        match std::mem::replace(&mut *state, State::Taken) {
            State::Done(value) => Ok(value),
            State::Pending | State::Taken | State::Abandoned => Err(ExecutorError::Abandoned),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    use super::*;
    use std::thread;

    #[test]
    fn fire_then_wait() {
        let (done, handle) = channel();
        assert!(!handle.is_complete());
        done.fire(7_u32);
        assert!(handle.is_complete());
        assert_eq!(handle.wait().expect("fired"), 7);
    }

    #[test]
    fn waiter_blocks_until_fired_from_another_thread() {
        let (done, handle) = channel();
        let producer = thread::spawn(move || done.fire(String::from("ok")));
        assert_eq!(handle.wait().expect("fired"), "ok");
        producer.join().expect("producer");
    }

    #[test]
    fn dropped_completer_abandons() {
        let (done, handle) = channel::<u8>();
        drop(done);
        assert!(handle.is_complete());
        assert!(matches!(handle.wait(), Err(ExecutorError::Abandoned)));
    }
}
