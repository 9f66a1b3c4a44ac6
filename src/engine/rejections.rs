//! Unhandled promise rejection tracking.

use std::cell::RefCell;

use boa_engine::builtins::promise::OperationType;
use boa_engine::context::HostHooks;
use boa_engine::{Context, JsObject};

/// Collects promises that were rejected without a handler.
///
/// The engine calls the host hook with `Reject` when a promise is rejected
/// while nothing listens and with `Handle` when a handler is attached later.
/// Whatever is still listed after a microtask drain is unhandled.
#[derive(Debug, Default)]
pub struct RejectionTracker {
    pending: RefCell<Vec<JsObject>>,
}

impl RejectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the promises that are still unhandled.
    pub fn take(&self) -> Vec<JsObject> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    /// Stop tracking a promise the engine reports through another path.
    pub fn forget(&self, promise: &JsObject) {
        self.pending
            .borrow_mut()
            .retain(|tracked| !JsObject::equals(tracked, promise));
    }

    pub fn clear(&self) {
        self.pending.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

impl HostHooks for RejectionTracker {
    fn promise_rejection_tracker(
        &self,
        promise: &JsObject,
        operation: OperationType,
        _context: &mut Context,
    ) {
        match operation {
            OperationType::Reject => {
                let mut pending = self.pending.borrow_mut();
                if !pending.iter().any(|tracked| JsObject::equals(tracked, promise)) {
                    pending.push(promise.clone());
                }
            }
            OperationType::Handle => self.forget(promise),
        }
    }
}
