use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::form::outcome::SubmissionError;

// ============================================================================
// Field values
// ============================================================================

/// Current value of every field on a form, keyed by field name.
///
/// Missing fields read as the empty string, the same way an untouched
/// input would.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// ============================================================================
// Phase
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Validating,
    InFlight,
    Succeeded,
    Failed,
}

impl Phase {
    /// Phases in which a submit intent starts a new cycle.
    pub fn accepts_submit(self) -> bool {
        matches!(self, Phase::Idle | Phase::Succeeded | Phase::Failed)
    }

    /// A cycle ended here; the next edit invalidates it.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Validating => "validating",
            Phase::InFlight => "in_flight",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Observable snapshot
// ============================================================================

/// Read-only copy of a controller's state, handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot<P> {
    pub fields: FieldMap,
    pub phase: Phase,
    pub error: Option<SubmissionError>,
    pub result: Option<P>,
}

impl<P> StateSnapshot<P> {
    /// The text shown to the user for the current error, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Validating | Phase::InFlight)
    }
}

// ============================================================================
// State machine
// ============================================================================

/// Per-form submission state. Only the transition methods below move
/// `phase`; every one of them keeps `error` and `result` mutually exclusive.
#[derive(Debug, Clone)]
pub(crate) struct SubmissionState<P> {
    fields: FieldMap,
    phase: Phase,
    error: Option<SubmissionError>,
    result: Option<P>,
}

impl<P: Clone> SubmissionState<P> {
    pub(crate) fn new() -> Self {
        Self {
            fields: FieldMap::new(),
            phase: Phase::Idle,
            error: None,
            result: None,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub(crate) fn error(&self) -> Option<&SubmissionError> {
        self.error.as_ref()
    }

    pub(crate) fn snapshot(&self) -> StateSnapshot<P> {
        StateSnapshot {
            fields: self.fields.clone(),
            phase: self.phase,
            error: self.error.clone(),
            result: self.result.clone(),
        }
    }

    /// Update one field. Returns true when the edit invalidated a finished
    /// cycle and moved the form back to `Idle`.
    pub(crate) fn edit(&mut self, name: String, value: String) -> bool {
        self.fields.set(name, value);
        if self.phase.is_terminal() {
            self.clear_outcome();
            self.phase = Phase::Idle;
            return true;
        }
        false
    }

    /// Enter `Validating`. Refused (returns false) unless the phase accepts
    /// a submit.
    pub(crate) fn begin_validation(&mut self) -> bool {
        if !self.phase.accepts_submit() {
            return false;
        }
        self.phase = Phase::Validating;
        true
    }

    /// Validation passed: clear the previous outcome, go `InFlight` and hand
    /// back the field snapshot the remote action will run with.
    pub(crate) fn start_flight(&mut self) -> FieldMap {
        debug_assert_eq!(self.phase, Phase::Validating);
        self.clear_outcome();
        self.phase = Phase::InFlight;
        self.fields.clone()
    }

    pub(crate) fn succeed(&mut self, payload: P) {
        self.error = None;
        self.result = Some(payload);
        self.phase = Phase::Succeeded;
    }

    pub(crate) fn fail(&mut self, error: SubmissionError) {
        self.result = None;
        self.error = Some(error);
        self.phase = Phase::Failed;
    }

    pub(crate) fn reset(&mut self) {
        self.clear_outcome();
        self.phase = Phase::Idle;
    }

    fn clear_outcome(&mut self) {
        self.error = None;
        self.result = None;
    }
}
