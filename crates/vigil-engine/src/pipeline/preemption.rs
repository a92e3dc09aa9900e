//! Preemption controller: the retry state machine around the drain loop.
//!
//! Each drain attempt runs under a fresh dependent token. A pending corpus
//! mutation cancels that token (cause `Preempted`); the controller then
//! waits for the mutation to land and starts a new attempt over whatever is
//! left in the queue. Cancellation of the run itself aborts with no retry.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use vigil_core::errors::Cancelled;
use vigil_core::events::types::{PreemptedEvent, ResumedEvent};
use vigil_core::events::EventDispatcher;
use vigil_core::traits::{CancelCause, Cancellable, DependentToken, RunToken};

use crate::mutation::MutationGate;

use super::queue::FailedUnits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Draining,
    Preempted,
    Completed,
    Aborted,
}

pub struct PreemptionController<'a> {
    gate: &'a dyn MutationGate,
    run: &'a RunToken,
    events: &'a EventDispatcher,
    poll: Duration,
    trace: Vec<ControllerState>,
    preemptions: usize,
    blocked_by_caller: bool,
}

impl<'a> PreemptionController<'a> {
    pub fn new(
        gate: &'a dyn MutationGate,
        run: &'a RunToken,
        events: &'a EventDispatcher,
        poll: Duration,
    ) -> Self {
        Self {
            gate,
            run,
            events,
            poll,
            trace: Vec::new(),
            preemptions: 0,
            blocked_by_caller: false,
        }
    }

    /// Run `drain` until it completes or the run is cancelled.
    ///
    /// `drain` is invoked once per attempt with that attempt's token and
    /// must return `Ok` only after the queue sentinel was consumed.
    pub fn drive<F>(&mut self, failed: &FailedUnits, mut drain: F) -> Result<(), Cancelled>
    where
        F: FnMut(&DependentToken) -> Result<(), Cancelled>,
    {
        loop {
            self.transition(ControllerState::Draining);
            let outcome = self.attempt(&mut drain);

            match outcome {
                Ok(()) => {
                    self.transition(ControllerState::Completed);
                    return Ok(());
                }
                Err(Cancelled) if self.run.is_cancelled() => {
                    self.transition(ControllerState::Aborted);
                    return Err(Cancelled);
                }
                Err(Cancelled) => {
                    self.transition(ControllerState::Preempted);
                    self.preemptions += 1;
                    let attempt = self.preemptions;
                    tracing::debug!(attempt, pending_failed_units = failed.len(), "drain preempted by mutation");
                    self.events.emit_preempted(&PreemptedEvent {
                        attempt,
                        pending_failed_units: failed.len(),
                    });
                    if !self.wait_for_mutations() {
                        self.transition(ControllerState::Aborted);
                        return Err(Cancelled);
                    }
                    self.events.emit_resumed(&ResumedEvent { attempt });
                }
            }
        }
    }

    fn attempt<F>(&self, drain: &mut F) -> Result<(), Cancelled>
    where
        F: FnMut(&DependentToken) -> Result<(), Cancelled>,
    {
        let token = self.run.dependent();
        let handle = token.handle();
        let listener = self
            .gate
            .subscribe(Arc::new(move || handle.cancel_with(CancelCause::Preempted)));
        // A mutation that became pending before the listener was registered
        // would otherwise go unnoticed until its write lock blocked us.
        if self.gate.is_mutation_pending() {
            token.cancel_with(CancelCause::Preempted);
        }

        let outcome = drain(&token);

        self.gate.unsubscribe(listener);
        if outcome.is_err() {
            tracing::trace!(cause = ?token.cause(), "drain attempt interrupted");
        }
        outcome
    }

    /// Block until the pending mutation finishes. Returns false if the run
    /// was cancelled while waiting, or if the mutation can never land because
    /// the driving thread itself holds a read snapshot.
    fn wait_for_mutations(&mut self) -> bool {
        if self.gate.holds_read() {
            tracing::error!("pending mutation is blocked by a read snapshot held by the analysis caller");
            self.blocked_by_caller = true;
            return false;
        }
        loop {
            if self.run.is_cancelled() {
                return false;
            }
            if self.gate.wait_for_mutations(self.poll) {
                return true;
            }
        }
    }

    fn transition(&mut self, state: ControllerState) {
        tracing::trace!(?state, "controller transition");
        self.trace.push(state);
    }

    /// Every state entered, in order.
    pub fn trace(&self) -> &[ControllerState] {
        &self.trace
    }

    pub fn preemptions(&self) -> usize {
        self.preemptions
    }

    /// The run aborted because a mutation was waiting on the caller's own
    /// read snapshot.
    pub fn blocked_by_caller(&self) -> bool {
        self.blocked_by_caller
    }

    pub fn state(&self) -> Option<ControllerState> {
        self.trace.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::CorpusGate;
    use ControllerState::*;

    #[test]
    fn outer_cancellation_aborts_without_retry() {
        let gate = CorpusGate::new();
        let run = RunToken::new();
        let events = EventDispatcher::new();
        let mut controller = PreemptionController::new(&gate, &run, &events, Duration::from_millis(1));
        let mut attempts = 0;
        let result = controller.drive(&FailedUnits::new(), |_| {
            attempts += 1;
            run.cancel();
            Err(Cancelled)
        });
        assert_eq!(result, Err(Cancelled));
        assert_eq!(attempts, 1);
        assert_eq!(controller.trace(), &[Draining, Aborted]);
    }

    #[test]
    fn interrupted_attempt_is_retried() {
        let gate = CorpusGate::new();
        let run = RunToken::new();
        let events = EventDispatcher::new();
        let mut controller = PreemptionController::new(&gate, &run, &events, Duration::from_millis(1));
        let mut attempts = 0;
        let result = controller.drive(&FailedUnits::new(), |_| {
            attempts += 1;
            if attempts == 1 {
                Err(Cancelled)
            } else {
                Ok(())
            }
        });
        assert!(result.is_ok());
        assert_eq!(controller.trace(), &[Draining, Preempted, Draining, Completed]);
        assert_eq!(controller.preemptions(), 1);
        assert_eq!(run.live_dependents(), 0);
    }

    #[test]
    fn preemption_blocked_by_own_snapshot_aborts() {
        let gate = CorpusGate::new();
        let run = RunToken::new();
        let events = EventDispatcher::new();
        let _snapshot = gate.read();
        let mut controller = PreemptionController::new(&gate, &run, &events, Duration::from_millis(1));
        let result = controller.drive(&FailedUnits::new(), |_| Err(Cancelled));
        assert_eq!(result, Err(Cancelled));
        assert!(controller.blocked_by_caller());
        assert_eq!(controller.trace(), &[Draining, Preempted, Aborted]);
    }

    #[test]
    fn listener_cancels_attempt_with_preempted_cause() {
        let gate = CorpusGate::new();
        let run = RunToken::new();
        let events = EventDispatcher::new();
        let mut controller = PreemptionController::new(&gate, &run, &events, Duration::from_millis(1));
        let mut causes = Vec::new();
        controller
            .drive(&FailedUnits::new(), |token| {
                if causes.is_empty() {
                    gate.write(|| ()).unwrap();
                    causes.push(token.cause());
                    return Err(Cancelled);
                }
                causes.push(token.cause());
                Ok(())
            })
            .unwrap();
        assert_eq!(causes, vec![Some(CancelCause::Preempted), None]);
    }
}
