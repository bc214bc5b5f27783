//! Remote operation tracking and per-resource serialization
//!
//! Drives long-running control-plane operations to a terminal state while
//! keeping conflicting operations on the same resource apart.
//!
//! Operation lifecycle:
//! 1. Call site acquires the resource's `KeyGuard` from `KeyedLock`
//! 2. Call site starts the remote operation and gets an operation id
//! 3. `Poller` fetches the operation, feeds the outcome to `poller::handle_event`
//!    and executes the returned action (retry, re-authenticate, finish, fail)
//! 4. On any terminal outcome the guard is dropped and the finish hook runs once
//!
//! `Tracker` bundles those steps for callers that own a `TaskApi`.

pub mod auth;
pub mod driver;
pub mod error;
pub mod lock;
pub mod poller;
pub mod tracker;

pub use auth::Authenticator;
pub use driver::{DEFAULT_POLL_INTERVAL, Poller};
pub use error::{PollError, Result};
pub use lock::{KeyGuard, KeyedLock, Retention};
pub use poller::{PollAction, PollEvent, PollLimits, PollState, handle_event};
pub use tracker::{OperationKind, OperationTimeouts, Tracker};
