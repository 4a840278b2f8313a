//! Cooperative next-turn task queue.
//!
//! A host application that owns its own run loop drives the queue by calling
//! [`TurnQueue::run_turn`] once per loop iteration. Tasks posted while a turn
//! is running are deferred to the following turn, so a task can never starve
//! the loop by re-posting itself.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::TurnDispatcher;

type Task = Box<dyn FnOnce()>;

/// Single-threaded FIFO of tasks waiting for the next UI turn.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct TurnQueue {
    pending: Rc<RefCell<VecDeque<Task>>>,
}

impl TurnQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Number of tasks waiting for the next turn.
    #[must_use]
    pub fn pending(&self) -> usize { self.pending.borrow().len() }

    #[must_use]
    pub fn is_idle(&self) -> bool { self.pending.borrow().is_empty() }

    /// Runs every task that was posted before this call.
    ///
    /// Returns the number of tasks executed.
    pub fn run_turn(&self) -> usize {
        let batch = std::mem::take(&mut *self.pending.borrow_mut());
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }

    /// Runs turns until the queue is empty or `max_turns` is reached.
    ///
    /// Returns the number of turns that executed at least one task.
    pub fn run_until_idle(&self, max_turns: usize) -> usize {
        let mut turns = 0;
        while turns < max_turns && self.run_turn() > 0 {
            turns += 1;
        }
        if !self.is_idle() {
            tracing::warn!(
                pending = self.pending(),
                max_turns,
                "portal: turn queue still busy after turn limit"
            );
        }
        turns
    }
}

impl TurnDispatcher for TurnQueue {
    fn post(&self, task: Box<dyn FnOnce()>) { self.pending.borrow_mut().push_back(task); }
}
