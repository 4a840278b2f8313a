//! Coalescing of full reconciliation passes.
//!
//! Structural edits fire many overlapping notifications within one UI turn.
//! Each notification arms one of two independent triggers; arming a trigger
//! that is already pending is free. When the next turn runs, the trigger is
//! cleared first and then a single full pass is performed, so a notification
//! that arrives during the pass arms a fresh one.

use std::cell::Cell;
use std::rc::Rc;

use crate::platform::TurnDispatcher;

// ============================================================================
// Types
// ============================================================================

/// What armed a coalesced pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Armed after every bind and every targeted synchronize.
    DeferredFullSync,
    /// Armed by window resize, end of live resize and container resize.
    ExternalGeometry,
}

impl Trigger {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeferredFullSync => "deferred-full-sync",
            Self::ExternalGeometry => "external-geometry",
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Two pending flags sharing one dispatcher.
pub struct Scheduler {
    dispatcher: Rc<dyn TurnDispatcher>,
    deferred_full_sync: Rc<Cell<bool>>,
    external_geometry: Rc<Cell<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(dispatcher: Rc<dyn TurnDispatcher>) -> Self {
        Self {
            dispatcher,
            deferred_full_sync: Rc::new(Cell::new(false)),
            external_geometry: Rc::new(Cell::new(false)),
        }
    }

    fn flag(&self, trigger: Trigger) -> &Rc<Cell<bool>> {
        match trigger {
            Trigger::DeferredFullSync => &self.deferred_full_sync,
            Trigger::ExternalGeometry => &self.external_geometry,
        }
    }

    /// Whether `trigger` has a pass queued for the next turn.
    #[must_use]
    pub fn is_pending(&self, trigger: Trigger) -> bool { self.flag(trigger).get() }

    /// Queue `pass` for the next turn unless `trigger` is already pending.
    ///
    /// Returns `true` if a new task was posted.
    pub fn arm(&self, trigger: Trigger, pass: impl FnOnce() + 'static) -> bool {
        let flag = self.flag(trigger);
        if flag.replace(true) {
            tracing::trace!(trigger = trigger.as_str(), "portal: pass already pending");
            return false;
        }

        let flag = Rc::clone(flag);
        self.dispatcher.post(Box::new(move || {
            flag.set(false);
            pass();
        }));
        tracing::trace!(trigger = trigger.as_str(), "portal: pass scheduled");
        true
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("deferred_full_sync", &self.deferred_full_sync.get())
            .field("external_geometry", &self.external_geometry.get())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
