//! Polling and backoff for diffi.
//!
//! [`Poller`] resolves a repository's changes on a fixed interval, keeps a
//! single resolution in flight, and backs off along a [`BackoffLadder`] when
//! resolutions fail. [`PollingSession`] holds the state machine on its own so
//! it can be tested without a runtime.

mod backoff;
mod clock;
mod error;
mod poller;
mod resolver;
mod session;

pub use backoff::{BackoffLadder, FailureStep, DEFAULT_INTERVAL};
pub use clock::{Clock, TokioClock};
pub use error::PollError;
pub use poller::{PollConfig, PollEvent, Poller, PollerHandle};
pub use resolver::{ChangeResolver, WorkingTreeResolver};
pub use session::{Attempt, FailureOutcome, PollingSession};
