//! One-shot deferred action lists.
//!
//! Some facts about a function only become known after code that depends on
//! them has been detailed: a callee may start throwing after its callers were
//! detailed, and a lambda's captures are only final once the enclosing function
//! is done. Entities keep a [`OneShot`] list per such fact; dependents push a
//! [`DeferredAction`] and the detailer runs the list exactly once when the fact
//! becomes true. Subscribing after that point yields the action back so the
//! caller can run it immediately.

use crate::{ItemId, ScopeId};

/// Work queued until an entity reaches some state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredAction {
    /// Copy the callee's possible errors into the scope of a call site.
    PropagateThrows { callee: ItemId, call_scope: ScopeId },
    /// Finalise a lambda's captured variables and register its holder item.
    FinalizeCaptures { lambda: ItemId },
}

/// A list of actions that fires at most once.
#[derive(Debug, Clone, Default)]
pub struct OneShot<A = DeferredAction> {
    fired: bool,
    pending: Vec<A>,
}

impl<A> OneShot<A> {
    pub fn new() -> Self {
        Self {
            fired: false,
            pending: Vec::new(),
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn pending(&self) -> &[A] {
        &self.pending
    }

    /// Queue `action`, or hand it back if the event already fired.
    #[must_use = "an action returned after firing must be run by the caller"]
    pub fn subscribe(&mut self, action: A) -> Option<A> {
        if self.fired {
            Some(action)
        } else {
            self.pending.push(action);
            None
        }
    }

    /// Mark the event fired and take the queued actions. Later calls return
    /// nothing.
    pub fn fire(&mut self) -> Vec<A> {
        if self.fired {
            return Vec::new();
        }
        self.fired = true;
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once() {
        let mut event: OneShot<u32> = OneShot::new();
        assert!(event.subscribe(1).is_none());
        assert!(event.subscribe(2).is_none());
        assert_eq!(event.fire(), vec![1, 2]);
        assert!(event.has_fired());
        assert!(event.fire().is_empty());
    }

    #[test]
    fn late_subscribers_get_action_back() {
        let mut event = OneShot::new();
        let _ = event.fire();
        let action = DeferredAction::FinalizeCaptures {
            lambda: ItemId::new(3),
        };
        assert_eq!(event.subscribe(action.clone()), Some(action));
        assert!(event.pending().is_empty());
    }
}
