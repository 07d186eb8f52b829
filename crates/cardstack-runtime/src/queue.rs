#![forbid(unsafe_code)]

//! Serialized navigation queue.
//!
//! Operations run one at a time in enqueue order. An enqueue on an idle
//! queue starts immediately; operations that abort or commit instantly on
//! start are drained in the same call, so after any public call the queue is
//! either idle or has exactly one running operation.
//!
//! # Invariants
//!
//! 1. At most one operation is running.
//! 2. Completions fire in enqueue order.
//! 3. Queued operations cannot be cancelled from outside.
//!
//! # Failure Modes
//!
//! - **Stalled gesture**: an interactive operation that receives no input for
//!   the configured stall timeout is cancelled and rolled back, with a `warn`.

use std::collections::VecDeque;
use std::time::Duration;

use cardstack_core::PanDirection;

use crate::config::{QueueConfig, TransitionTimings};
use crate::navigation::NavigationState;
use crate::signal::Signal;
use crate::transition::{NavigationKind, OperationId, TransitionOperation, TransitionOutcome};

/// FIFO, concurrency-one queue of [`TransitionOperation`]s.
#[derive(Debug)]
pub struct NavigationQueue {
    pending: VecDeque<TransitionOperation>,
    running: Option<TransitionOperation>,
    next_id: u64,
    timings: TransitionTimings,
    stall_timeout: Option<Duration>,
    outcomes: Signal<TransitionOutcome>,
}

impl NavigationQueue {
    #[must_use]
    pub fn new(config: &QueueConfig, timings: TransitionTimings) -> Self {
        Self {
            pending: VecDeque::new(),
            running: None,
            next_id: 1,
            timings,
            stall_timeout: config.stall_timeout(),
            outcomes: Signal::new(),
        }
    }

    /// Fires for every operation that reaches a terminal state.
    #[must_use]
    pub fn outcomes(&self) -> &Signal<TransitionOutcome> {
        &self.outcomes
    }

    /// Nothing running and nothing waiting.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.running.is_none() && self.pending.is_empty()
    }

    #[must_use]
    pub fn running_id(&self) -> Option<OperationId> {
        self.running.as_ref().map(TransitionOperation::id)
    }

    #[must_use]
    pub fn running(&self) -> Option<&TransitionOperation> {
        self.running.as_ref()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether any running or waiting operation matches `pred`.
    pub fn contains_kind(&self, pred: impl Fn(NavigationKind) -> bool) -> bool {
        self.running
            .iter()
            .chain(self.pending.iter())
            .any(|op| pred(op.kind()))
    }

    /// Append `op` and start it if the queue was idle.
    pub fn enqueue(&mut self, mut op: TransitionOperation, nav: &mut NavigationState) -> OperationId {
        let id = OperationId::new(self.next_id);
        self.next_id += 1;
        op.mark_queued(id);
        tracing::debug!(
            target: "cardstack.queue",
            op = %id,
            kind = ?op.kind(),
            pending = self.pending.len(),
            "enqueued"
        );
        self.pending.push_back(op);
        self.dispatch(nav);
        id
    }

    /// Advance the running operation and start the next one when it ends.
    pub fn tick(&mut self, dt: Duration, nav: &mut NavigationState) {
        let Some(op) = self.running.as_mut() else {
            return;
        };

        let id = op.id();
        if let (Some(limit), Some(pct)) = (self.stall_timeout, op.interactive_mut()) {
            if pct.is_tracking() && pct.idle_time() >= limit {
                tracing::warn!(
                    target: "cardstack.queue",
                    op = %id,
                    idle_ms = pct.idle_time().as_millis() as u64,
                    "interactive transition stalled; cancelling"
                );
                pct.cancel();
            }
        }

        op.tick(dt, nav);
        if op.state().is_terminal() {
            self.complete_running();
            self.dispatch(nav);
        }
    }

    /// Scrub the running interactive operation. Returns `false` when there
    /// is none.
    pub fn update_interactive(&mut self, percent: f64, nav: &mut NavigationState) -> bool {
        let Some(op) = self.running.as_mut() else {
            return false;
        };
        let Some(pct) = op.interactive_mut() else {
            return false;
        };
        pct.update(percent);
        let progress = pct.percent();
        op.apply_frame(nav, progress);
        true
    }

    /// Play the running interactive operation to completion, recording the
    /// swipe direction for commit. Returns `false` when there is no
    /// interactive operation still tracking input.
    pub fn finish_interactive(&mut self, direction: Option<PanDirection>) -> bool {
        let Some(op) = self.running.as_mut() else {
            return false;
        };
        if !op.is_tracking() {
            return false;
        }
        if let Some(direction) = direction {
            op.set_swipe_direction(direction);
        }
        if let Some(pct) = op.interactive_mut() {
            pct.finish();
        }
        tracing::debug!(target: "cardstack.queue", op = %op.id(), ?direction, "interactive finish");
        true
    }

    /// Play the running interactive operation back to the start. Returns
    /// `false` when there is no interactive operation still tracking input.
    pub fn cancel_interactive(&mut self) -> bool {
        let Some(op) = self.running.as_mut() else {
            return false;
        };
        let id = op.id();
        let Some(pct) = op.interactive_mut().filter(|pct| pct.is_tracking()) else {
            return false;
        };
        pct.cancel();
        tracing::debug!(target: "cardstack.queue", op = %id, "interactive cancel");
        true
    }

    fn dispatch(&mut self, nav: &mut NavigationState) {
        while self.running.is_none() {
            let Some(mut op) = self.pending.pop_front() else {
                break;
            };
            let span = tracing::debug_span!(target: "cardstack.queue", "start", op = %op.id());
            let _enter = span.enter();
            op.start(nav, &self.timings);
            self.running = Some(op);
            if self.running.as_ref().is_some_and(|op| op.state().is_terminal()) {
                self.complete_running();
            }
        }
    }

    fn complete_running(&mut self) {
        let Some(op) = self.running.take() else {
            return;
        };
        if let Some(outcome) = op.outcome() {
            tracing::debug!(
                target: "cardstack.queue",
                op = %outcome.id,
                kind = ?outcome.kind,
                state = ?outcome.state,
                "transition finished"
            );
            self.outcomes.emit(outcome);
        }
    }
}
