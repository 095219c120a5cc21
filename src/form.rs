//! Title verification form state
//!
//! The form is a snapshot (`FormState`) that only changes through the
//! transition functions below. Each transition returns the next snapshot;
//! `App` swaps it in whole.

use thiserror::Error;

use crate::verify::{RequestFailure, VerificationResult};

/// Shown to the user whenever a verification attempt fails, whatever the cause
pub const FAILURE_REASON: &str = "An error occurred while verifying the title. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("a verification is already in progress")]
    InFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub query: String,
    pub phase: Phase,
    /// Last verdict; replaced wholesale on every settlement
    pub result: Option<VerificationResult>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            query: String::new(),
            phase: Phase::Idle,
            result: None,
        }
    }
}

impl FormState {
    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    /// Replace the query text
    pub fn update_query(self, text: impl Into<String>) -> Self {
        Self {
            query: text.into(),
            ..self
        }
    }

    /// Enter the submitting phase and return the title to send.
    ///
    /// Refused while a previous submission is still in flight, no matter who
    /// triggered it. Blank titles are allowed.
    pub fn begin_submit(&self) -> Result<(Self, String), SubmitRejected> {
        if self.is_submitting() {
            return Err(SubmitRejected::InFlight);
        }
        let next = Self {
            phase: Phase::Submitting,
            ..self.clone()
        };
        Ok((next, self.query.clone()))
    }

    /// Record the outcome of the outbound call and leave the submitting phase
    pub fn settle(self, outcome: Result<VerificationResult, RequestFailure>) -> Self {
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Error verifying title: {}", e);
                failure_result()
            }
        };

        Self {
            phase: Phase::Settled,
            result: Some(result),
            ..self
        }
    }
}

/// Placeholder verdict standing in for any failed attempt
pub fn failure_result() -> VerificationResult {
    VerificationResult {
        verified: false,
        probability: 0.0,
        reason: FAILURE_REASON.to_string(),
        similar_titles: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(verified: bool, probability: f64, reason: &str) -> VerificationResult {
        VerificationResult {
            verified,
            probability,
            reason: reason.to_string(),
            similar_titles: None,
        }
    }

    #[test]
    fn test_update_query_replaces_text() {
        let state = FormState::default().update_query("Dawn").update_query("Dusk");
        assert_eq!(state.query, "Dusk");
        assert_eq!(state.phase, Phase::Idle);
    }

    #[test]
    fn test_begin_submit_allows_blank_title() {
        let (state, title) = FormState::default().begin_submit().unwrap();
        assert_eq!(title, "");
        assert!(state.is_submitting());
    }

    #[test]
    fn test_second_submit_rejected_while_in_flight() {
        let (state, _) = FormState::default().update_query("Dawn").begin_submit().unwrap();
        assert_eq!(state.begin_submit().unwrap_err(), SubmitRejected::InFlight);
        // Rejection leaves the in-flight state alone
        assert!(state.is_submitting());
    }

    #[test]
    fn test_settle_success_clears_in_flight() {
        let (state, _) = FormState::default().update_query("Dawn").begin_submit().unwrap();
        let state = state.settle(Ok(verdict(true, 0.87, "ok")));

        assert_eq!(state.phase, Phase::Settled);
        assert!(!state.is_submitting());
        assert_eq!(state.result, Some(verdict(true, 0.87, "ok")));
        assert_eq!(state.query, "Dawn");
    }

    #[test]
    fn test_settle_failure_collapses_to_placeholder() {
        let (state, _) = FormState::default().begin_submit().unwrap();
        let state = state.settle(Err(RequestFailure::Status(500)));

        assert!(!state.is_submitting());
        assert_eq!(
            state.result,
            Some(VerificationResult {
                verified: false,
                probability: 0.0,
                reason: "An error occurred while verifying the title. Please try again.".to_string(),
                similar_titles: None,
            })
        );
    }

    #[test]
    fn test_resubmit_after_settle_replaces_result() {
        let mut titles = verdict(false, 0.1, "Similar to existing titles: a");
        titles.similar_titles = Some(vec!["a".to_string()]);

        let (state, _) = FormState::default().update_query("A").begin_submit().unwrap();
        let state = state.settle(Ok(titles));

        let (state, title) = state.update_query("B").begin_submit().unwrap();
        assert_eq!(title, "B");
        let state = state.settle(Ok(verdict(true, 0.95, "")));

        assert_eq!(state.result, Some(verdict(true, 0.95, "")));
    }
}
