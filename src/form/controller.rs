use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    form::{
        form_model::{FieldMap, Phase, StateSnapshot, SubmissionState},
        outcome::{RemoteOutcome, SubmissionError},
    },
    remote::remote_model::RemoteAction,
    trace::{logger::TraceLogger, trace::TraceEvent},
    validate::validator::Validator,
};

/// State guarded by the controller's lock. The lock is never held across
/// an `.await`.
struct Shared<P> {
    state: SubmissionState<P>,
    /// Submit cycles that reached the remote action.
    cycle: u64,
    /// A remote action is running. Stays set after a `reset()` until that
    /// call resolves.
    outstanding: bool,
}

/// Drives one form through validate → request → outcome.
///
/// Cloning yields another handle onto the same form, so a view can keep
/// forwarding edits while a submit is awaiting its remote action.
pub struct SubmissionController<A: RemoteAction> {
    form: Arc<str>,
    shared: Arc<Mutex<Shared<A::Payload>>>,
    validator: Arc<dyn Validator>,
    action: Arc<A>,
    updates: Arc<watch::Sender<StateSnapshot<A::Payload>>>,
    tracer: Option<Arc<TraceLogger>>,
}

impl<A: RemoteAction> Clone for SubmissionController<A> {
    fn clone(&self) -> Self {
        Self {
            form: self.form.clone(),
            shared: self.shared.clone(),
            validator: self.validator.clone(),
            action: self.action.clone(),
            updates: self.updates.clone(),
            tracer: self.tracer.clone(),
        }
    }
}

impl<A: RemoteAction> SubmissionController<A> {
    pub fn new(form: &str, validator: impl Validator + 'static, action: A) -> Self {
        let state = SubmissionState::new();
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            form: Arc::from(form),
            shared: Arc::new(Mutex::new(Shared {
                state,
                cycle: 0,
                outstanding: false,
            })),
            validator: Arc::new(validator),
            action: Arc::new(action),
            updates: Arc::new(updates),
            tracer: None,
        }
    }

    /// Journal every transition to `tracer`.
    pub fn with_tracer(mut self, tracer: Arc<TraceLogger>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn form(&self) -> &str {
        &self.form
    }

    pub fn snapshot(&self) -> StateSnapshot<A::Payload> {
        self.shared.lock().state.snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().state.phase()
    }

    /// Receiver that sees a fresh snapshot after every transition.
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot<A::Payload>> {
        self.updates.subscribe()
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Record a field edit. A finished cycle is invalidated by new input.
    pub fn set_field(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut shared = self.shared.lock();
        let invalidated = shared.state.edit(name.into(), value.into());
        self.publish(&shared);
        let event = if invalidated {
            self.event(&shared, "edit_invalidated")
        } else {
            None
        };
        drop(shared);

        self.trace(event);
    }

    /// Back to `Idle` with no error or result. An outstanding remote call
    /// keeps running; its outcome is dropped when it arrives.
    pub fn reset(&self) {
        let mut shared = self.shared.lock();
        shared.state.reset();
        self.publish(&shared);
        let event = self.event(&shared, "reset");
        drop(shared);

        debug!(form = %self.form, "form reset");
        self.trace(event);
    }

    /// Run one submit cycle. A no-op while a remote call is outstanding.
    pub async fn submit(&self) {
        let Some((cycle, fields)) = self.begin() else {
            return;
        };
        let flight = Flight {
            controller: self,
            cycle,
            landed: false,
        };

        let outcome = match AssertUnwindSafe(self.action.perform(&fields))
            .catch_unwind()
            .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(form = %self.form, cycle, error = %e, "remote action failed unexpectedly");
                RemoteOutcome::TransportError
            }
            Err(_) => {
                warn!(form = %self.form, cycle, "remote action panicked");
                RemoteOutcome::TransportError
            }
        };

        flight.land(outcome);
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Validate and, if the snapshot passes, move to `InFlight`. Returns the
    /// cycle number and the snapshot to send.
    fn begin(&self) -> Option<(u64, FieldMap)> {
        let mut shared = self.shared.lock();

        if shared.outstanding || !shared.state.begin_validation() {
            debug!(form = %self.form, phase = %shared.state.phase(), "submit dropped while a request is in flight");
            return None;
        }
        self.publish(&shared);

        let violations = self.validator.validate(shared.state.fields());
        if !violations.is_empty() {
            debug!(form = %self.form, count = violations.len(), "validation failed");
            shared.state.fail(SubmissionError::Validation(violations));
            self.publish(&shared);
            let event = self.event(&shared, "validation_failed");
            drop(shared);
            self.trace(event);
            return None;
        }

        shared.cycle += 1;
        shared.outstanding = true;
        let fields = shared.state.start_flight();
        self.publish(&shared);

        let cycle = shared.cycle;
        let event = self.event(&shared, "dispatched");
        drop(shared);

        info!(form = %self.form, cycle, "submitting");
        self.trace(event);
        Some((cycle, fields))
    }

    fn finish(&self, cycle: u64, outcome: RemoteOutcome<A::Payload>) {
        let mut shared = self.shared.lock();
        shared.outstanding = false;

        if shared.state.phase() != Phase::InFlight {
            debug!(form = %self.form, cycle, "outcome discarded after reset");
            let event = self.event(&shared, "outcome_discarded");
            drop(shared);
            self.trace(event);
            return;
        }

        let succeeded = match outcome.into_result() {
            Ok(payload) => {
                shared.state.succeed(payload);
                true
            }
            Err(error) => {
                shared.state.fail(error);
                false
            }
        };
        self.publish(&shared);
        let event = self.event(&shared, if succeeded { "succeeded" } else { "failed" });
        drop(shared);

        info!(form = %self.form, cycle, succeeded, "submission finished");
        self.trace(event);
    }

    /// The submit future was dropped before its action resolved. Frees the
    /// guard and, unless a reset already moved on, fails the cycle.
    fn abandon(&self, cycle: u64) {
        let mut shared = self.shared.lock();
        shared.outstanding = false;

        if shared.state.phase() != Phase::InFlight {
            return;
        }

        shared.state.fail(SubmissionError::Transport);
        self.publish(&shared);
        let event = self.event(&shared, "abandoned");
        drop(shared);

        warn!(form = %self.form, cycle, "submit dropped before the remote action resolved");
        self.trace(event);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn publish(&self, shared: &Shared<A::Payload>) {
        self.updates.send_replace(shared.state.snapshot());
    }

    /// Journal entry for the current state; `None` without a tracer.
    fn event(&self, shared: &Shared<A::Payload>, name: &str) -> Option<TraceEvent> {
        self.tracer.as_ref()?;
        let mut event = TraceEvent::now(&self.form, shared.cycle, shared.state.phase())
            .with_event(name)
            .with_fields(shared.state.fields());
        if let Some(error) = shared.state.error() {
            event = event.with_error(error);
        }
        Some(event)
    }

    fn trace(&self, event: Option<TraceEvent>) {
        if let (Some(tracer), Some(event)) = (&self.tracer, event) {
            tracer.log(&event);
        }
    }
}

/// Held across the remote action's await. Dropping it without `land`
/// (timeout, `select!`, aborted task) resolves the cycle as abandoned.
struct Flight<'a, A: RemoteAction> {
    controller: &'a SubmissionController<A>,
    cycle: u64,
    landed: bool,
}

impl<A: RemoteAction> Flight<'_, A> {
    fn land(mut self, outcome: RemoteOutcome<A::Payload>) {
        self.landed = true;
        self.controller.finish(self.cycle, outcome);
    }
}

impl<A: RemoteAction> Drop for Flight<'_, A> {
    fn drop(&mut self) {
        if !self.landed {
            self.controller.abandon(self.cycle);
        }
    }
}
