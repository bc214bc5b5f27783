//! Operation polling state machine
//!
//! Pure state machine: receives the outcome of one fetch (or one
//! re-authentication) and returns `(new_state, action)`. The driver executes
//! the I/O implied by each action. All counters live in `PollState`, which
//! belongs to one operation and is threaded through every attempt, so
//! concurrent operations never share retry budgets.

use task_api::{ErrorClass, OperationState, OperationStatus};

use crate::error::PollError;

/// Consecutive "service temporarily unavailable" replies tolerated per operation
pub const MAX_UNAVAILABLE_RETRIES: u32 = 20;

/// Consecutive auth-expired fetches tolerated after successful re-authentication
pub const MAX_CONSECUTIVE_REAUTHS: u32 = 3;

/// Retry bounds applied by `handle_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollLimits {
    pub max_unavailable_retries: u32,
    pub max_consecutive_reauths: u32,
}

impl Default for PollLimits {
    fn default() -> Self {
        Self {
            max_unavailable_retries: MAX_UNAVAILABLE_RETRIES,
            max_consecutive_reauths: MAX_CONSECUTIVE_REAUTHS,
        }
    }
}

/// Per-operation polling state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    /// Prefix for wrapped fetch errors, e.g. "error while waiting for server creation"
    pub context: String,
    /// Consecutive unavailable replies; reset by any successful fetch
    pub unavailable_retries: u32,
    /// Consecutive auth-expired fetches; reset by any successful fetch
    pub consecutive_reauths: u32,
    /// Last snapshot obtained, default (empty) until the first successful fetch
    pub last: OperationState,
}

impl PollState {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            ..Self::default()
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug)]
pub enum PollEvent {
    /// The fetch returned a snapshot
    Fetched(OperationState),
    /// The fetch failed
    FetchFailed { class: ErrorClass, message: String },
    /// Re-authentication minted a new token
    Reauthenticated,
    /// Re-authentication failed
    ReauthFailed(String),
}

/// What the driver should do next.
#[derive(Debug)]
pub enum PollAction {
    /// Poll again. `immediate` skips the inter-attempt delay.
    Retry { message: String, immediate: bool },
    /// Mint a new token, then report `Reauthenticated` or `ReauthFailed`
    Reauthenticate,
    /// The operation finished; `PollState::last` holds the final snapshot
    Complete,
    /// Terminal failure
    Fail(PollError),
}

/// Handle one event. Pure function: no I/O.
pub fn handle_event(
    mut state: PollState,
    event: PollEvent,
    limits: &PollLimits,
) -> (PollState, PollAction) {
    match event {
        PollEvent::FetchFailed {
            class: ErrorClass::AuthExpired,
            ..
        } => {
            state.consecutive_reauths += 1;
            if state.consecutive_reauths > limits.max_consecutive_reauths {
                (
                    state,
                    PollAction::Fail(PollError::ReauthLoop(limits.max_consecutive_reauths)),
                )
            } else {
                (state, PollAction::Reauthenticate)
            }
        }

        PollEvent::Reauthenticated => (
            state,
            PollAction::Retry {
                message: "re-authenticated, polling again".into(),
                immediate: true,
            },
        ),

        PollEvent::ReauthFailed(message) => (state, PollAction::Fail(PollError::Auth(message))),

        PollEvent::FetchFailed {
            class: ErrorClass::Unavailable,
            ..
        } => {
            state.unavailable_retries += 1;
            if state.unavailable_retries > limits.max_unavailable_retries {
                (state, PollAction::Fail(PollError::MaxRetriesReached))
            } else {
                let message = format!(
                    "service temporarily unavailable, retry {} from {}",
                    state.unavailable_retries, limits.max_unavailable_retries
                );
                (
                    state,
                    PollAction::Retry {
                        message,
                        immediate: false,
                    },
                )
            }
        }

        PollEvent::FetchFailed {
            class: ErrorClass::Other,
            message,
        } => {
            let context = state.context.clone();
            (state, PollAction::Fail(PollError::Fetch { context, message }))
        }

        PollEvent::Fetched(snapshot) => {
            state.unavailable_retries = 0;
            state.consecutive_reauths = 0;
            state.last = snapshot;

            let action = match &state.last.status {
                OperationStatus::Unknown => PollAction::Fail(PollError::EmptyStatus),
                OperationStatus::Failed => PollAction::Fail(PollError::OperationFailed {
                    operation_type: state.last.operation_type.clone(),
                    message: state
                        .last
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "no error message returned".into()),
                }),
                OperationStatus::Finished => PollAction::Complete,
                status => PollAction::Retry {
                    message: format!("{} is {}", state.last.operation_type, status),
                    immediate: false,
                },
            };
            (state, action)
        }
    }
}
