//! Call-site orchestration
//!
//! Bundles the steps every resource handler repeats: make sure a token
//! exists, take the resource's lock, start the remote operation, poll it to a
//! terminal state. The lock guard lives for the whole operation and is
//! dropped on every exit path, including timeouts and start failures.

use std::fmt::{self, Display};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use task_api::{OperationState, TaskApi};
use tracing::{Instrument, info, info_span};

use crate::auth::Authenticator;
use crate::driver::Poller;
use crate::error::{PollError, Result};
use crate::lock::{KeyGuard, KeyedLock};

/// Lifecycle step an operation belongs to; selects its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!(
                "unknown operation kind {other:?}, expected create, update or delete"
            )),
        }
    }
}

/// Per-kind deadlines for tracked operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTimeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl OperationTimeouts {
    pub fn for_kind(&self, kind: OperationKind) -> Duration {
        match kind {
            OperationKind::Create => self.create,
            OperationKind::Update => self.update,
            OperationKind::Delete => self.delete,
        }
    }
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            update: Duration::from_secs(20 * 60),
            delete: Duration::from_secs(20 * 60),
        }
    }
}

/// Runs operations against one control plane.
pub struct Tracker {
    api: Arc<dyn TaskApi>,
    authenticator: Arc<dyn Authenticator>,
    locks: Arc<KeyedLock>,
    poller: Poller,
}

impl Tracker {
    pub fn new(
        api: Arc<dyn TaskApi>,
        authenticator: Arc<dyn Authenticator>,
        locks: Arc<KeyedLock>,
    ) -> Self {
        let poller = Poller::new(authenticator.clone());
        Self {
            api,
            authenticator,
            locks,
            poller,
        }
    }

    /// Replace the poller, e.g. to change limits or the poll interval.
    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.poller = poller;
        self
    }

    pub fn locks(&self) -> &Arc<KeyedLock> {
        &self.locks
    }

    /// Wait for an already-started operation.
    ///
    /// With `lock_key`, the resource lock is held until polling stops.
    pub async fn track(
        &self,
        lock_key: Option<&str>,
        operation_id: &str,
        context: &str,
        timeout: Duration,
    ) -> Result<OperationState> {
        let span = info_span!("track_operation", operation_id, lock_key);
        async move {
            let _guard = self.acquire(lock_key).await;
            self.ensure_authenticated().await?;
            self.poll(operation_id, context, timeout).await
        }
        .instrument(span)
        .await
    }

    /// Take the lock, start an operation with `start`, then wait for it.
    ///
    /// `start` returns the operation id assigned by the control plane. The
    /// lock is acquired before `start` runs, so conflicting operations on the
    /// same resource never interleave.
    pub async fn run<S, Fut, E>(
        &self,
        lock_key: Option<&str>,
        context: &str,
        timeout: Duration,
        start: S,
    ) -> Result<OperationState>
    where
        S: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<String, E>>,
        E: Display,
    {
        let span = info_span!("run_operation", lock_key);
        async move {
            let _guard = self.acquire(lock_key).await;
            self.ensure_authenticated().await?;

            let operation_id = start().await.map_err(|e| PollError::Start {
                context: context.to_owned(),
                message: e.to_string(),
            })?;
            info!(operation_id = %operation_id, "operation started");

            self.poll(&operation_id, context, timeout).await
        }
        .instrument(span)
        .await
    }

    async fn acquire(&self, lock_key: Option<&str>) -> Option<KeyGuard> {
        match lock_key {
            Some(key) => Some(self.locks.lock(key).await),
            None => None,
        }
    }

    async fn ensure_authenticated(&self) -> Result<()> {
        self.authenticator
            .ensure_authenticated()
            .await
            .map_err(PollError::Auth)
    }

    async fn poll(
        &self,
        operation_id: &str,
        context: &str,
        timeout: Duration,
    ) -> Result<OperationState> {
        self.poller
            .wait(context, timeout, || self.api.get_operation(operation_id))
            .await
    }
}
