/// Prediction result and request lifecycle
///
/// The result slot and the in-flight request state are tracked separately:
/// a failed retry must not wipe a previously displayed prediction, and a
/// reset must wipe both. Submissions are keyed by a monotonically
/// increasing attempt number; only the completion matching the pending
/// attempt is applied, so whichever submission the user made last is the
/// one that ends up on screen, and responses that straggle in after a
/// reset (or after the file was replaced) are dropped.

/// Where the current (or last) request stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Pending {
        attempt: u64,
    },
    Failed(String),
}

/// The prediction slot shown in the result pane.
#[derive(Debug, Clone, Default)]
pub struct Prediction {
    result: Option<String>,
    request: RequestState,
    attempts: u64,
}

impl Prediction {
    /// The text returned by the last applied successful round trip.
    pub fn text(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// The user-visible message of the last failed request, if it has not
    /// been superseded.
    pub fn failure(&self) -> Option<&str> {
        match &self.request {
            RequestState::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.request, RequestState::Pending { .. })
    }

    /// Total submissions dispatched so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Register a new submission and return its attempt number.
    pub fn begin_attempt(&mut self) -> u64 {
        self.attempts += 1;
        self.request = RequestState::Pending {
            attempt: self.attempts,
        };
        self.attempts
    }

    /// Apply a finished round trip. Returns false when the completion is
    /// stale (an older attempt, or the slot was cleared meanwhile) and was
    /// discarded.
    pub fn apply(&mut self, attempt: u64, outcome: Result<String, String>) -> bool {
        if self.request != (RequestState::Pending { attempt }) {
            return false;
        }
        match outcome {
            Ok(text) => {
                self.result = Some(text);
                self.request = RequestState::Idle;
            }
            Err(message) => {
                // Keep any previously displayed result; the failure is
                // surfaced alongside it as a retryable state.
                self.request = RequestState::Failed(message);
            }
        }
        true
    }

    /// Drop the result and any request state. The attempt counter keeps
    /// counting so in-flight completions cannot repopulate the slot.
    pub fn clear(&mut self) {
        self.result = None;
        self.request = RequestState::Idle;
    }
}
