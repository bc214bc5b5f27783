//! Bounded retry driver
//!
//! Runs fetch → `handle_event` → action until the state machine reaches a
//! terminal action or the caller's deadline expires. Fetches are strictly
//! sequential: the next attempt starts only after the previous one and its
//! delay have completed. The driver never spawns tasks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use task_api::{ClassifyError, OperationState};
use tracing::{debug, info, warn};

use crate::auth::Authenticator;
use crate::error::{PollError, Result};
use crate::poller::{PollAction, PollEvent, PollLimits, PollState, handle_event};

/// Delay between non-immediate attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls one operation at a time to completion.
///
/// Cheap to share: every `wait` call gets its own `PollState`.
#[derive(Clone)]
pub struct Poller {
    authenticator: Arc<dyn Authenticator>,
    limits: PollLimits,
    interval: Duration,
}

impl Poller {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            limits: PollLimits::default(),
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_limits(mut self, limits: PollLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn limits(&self) -> &PollLimits {
        &self.limits
    }

    /// Poll until the operation finishes, fails, or `timeout` elapses.
    ///
    /// `context` prefixes unclassified fetch errors, e.g.
    /// "error while waiting for server creation".
    pub async fn wait<F, Fut, E>(
        &self,
        context: &str,
        timeout: Duration,
        fetch: F,
    ) -> Result<OperationState>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<OperationState, E>>,
        E: ClassifyError,
    {
        self.wait_with_finish(context, timeout, fetch, |_| {}).await
    }

    /// Like `wait`, and runs `finish` exactly once with the last known
    /// snapshot when polling stops, whatever the outcome. The snapshot is
    /// the empty default if no fetch ever succeeded.
    pub async fn wait_with_finish<F, Fut, E, Fin>(
        &self,
        context: &str,
        timeout: Duration,
        fetch: F,
        finish: Fin,
    ) -> Result<OperationState>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<OperationState, E>>,
        E: ClassifyError,
        Fin: FnOnce(&OperationState),
    {
        let mut state = PollState::new(context);

        let outcome = tokio::time::timeout(timeout, self.drive(&mut state, fetch))
            .await
            .unwrap_or(Err(PollError::Timeout(timeout)));

        finish(&state.last);

        match outcome {
            Ok(()) => {
                metrics::counter!("operation_polls_total", "outcome" => "finished").increment(1);
                info!(
                    operation_type = %state.last.operation_type,
                    resource_id = ?state.last.resource_id,
                    "operation finished"
                );
                Ok(state.last)
            }
            Err(e) => {
                metrics::counter!("operation_polls_total", "outcome" => "failed").increment(1);
                warn!(
                    context = %state.context,
                    last_status = %state.last.status,
                    error = %e,
                    "operation polling stopped"
                );
                Err(e)
            }
        }
    }

    async fn drive<F, Fut, E>(&self, state: &mut PollState, mut fetch: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<OperationState, E>>,
        E: ClassifyError,
    {
        loop {
            let mut event = match fetch().await {
                Ok(snapshot) => PollEvent::Fetched(snapshot),
                Err(e) => PollEvent::FetchFailed {
                    class: e.class(),
                    message: e.to_string(),
                },
            };

            loop {
                // Take and put back synchronously so a cancelled wait still
                // leaves the last snapshot in place
                let (next, action) = handle_event(std::mem::take(state), event, &self.limits);
                *state = next;

                match action {
                    PollAction::Reauthenticate => {
                        metrics::counter!("operation_reauth_total").increment(1);
                        debug!("access token expired, re-authenticating");
                        event = match self.authenticator.authenticate().await {
                            Ok(()) => PollEvent::Reauthenticated,
                            Err(msg) => PollEvent::ReauthFailed(msg),
                        };
                    }
                    PollAction::Retry { message, immediate } => {
                        metrics::counter!("operation_polls_total", "outcome" => "retry")
                            .increment(1);
                        debug!(retry = %message, immediate, "operation not done yet");
                        if !immediate {
                            tokio::time::sleep(self.interval).await;
                        }
                        break;
                    }
                    PollAction::Complete => return Ok(()),
                    PollAction::Fail(e) => return Err(e),
                }
            }
        }
    }
}
