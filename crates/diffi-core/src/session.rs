use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backoff::{BackoffLadder, FailureStep};
use crate::error::PollError;

/// Ticket for one resolution. A result only counts if its ticket is still
/// current when it comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    path: PathBuf,
    generation: u64,
}

impl Attempt {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Result of recording a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    pub step: FailureStep,
    pub consecutive_failures: usize,
}

/// Polling state for one watched repository.
///
/// Pure state machine: it decides what should happen next but never sleeps
/// or touches the repository itself. [`crate::Poller`] drives it.
#[derive(Debug, Clone)]
pub struct PollingSession {
    interval: Duration,
    ladder: BackoffLadder,
    target: Option<PathBuf>,
    running: bool,
    consecutive_failures: usize,
    current_step: Option<FailureStep>,
    last_error: Option<PollError>,
    generation: u64,
}

impl PollingSession {
    pub fn new(interval: Duration, ladder: BackoffLadder) -> Self {
        Self {
            interval,
            ladder,
            target: None,
            running: false,
            consecutive_failures: 0,
            current_step: None,
            last_error: None,
            generation: 0,
        }
    }

    /// Begin polling `path`. The returned attempt should run right away.
    pub fn start(&mut self, path: PathBuf) -> Attempt {
        self.generation += 1;
        self.running = true;
        self.clear_failures();
        self.target = Some(path.clone());
        Attempt {
            path,
            generation: self.generation,
        }
    }

    /// Go idle. Results of attempts issued before this call are ignored.
    pub fn stop(&mut self) {
        self.generation += 1;
        self.running = false;
        self.clear_failures();
    }

    /// Returns the delay before the next attempt, or `None` if the attempt
    /// is stale.
    pub fn record_success(&mut self, attempt: &Attempt) -> Option<Duration> {
        if !self.is_current(attempt) {
            return None;
        }
        self.clear_failures();
        Some(self.interval)
    }

    /// Returns the ladder step for this failure, or `None` if the attempt is
    /// stale.
    pub fn record_failure(
        &mut self,
        attempt: &Attempt,
        error: PollError,
    ) -> Option<FailureOutcome> {
        if !self.is_current(attempt) {
            return None;
        }

        let step = self.ladder.step_for(self.consecutive_failures);
        self.consecutive_failures += 1;
        self.current_step = Some(step);
        self.last_error = Some(error);

        Some(FailureOutcome {
            step,
            consecutive_failures: self.consecutive_failures,
        })
    }

    /// The retry delay elapsed. Stops the session if there is nothing to poll.
    pub fn timer_fired(&mut self) -> Option<Attempt> {
        let attempt = self.resume();
        if attempt.is_none() {
            self.stop();
        }
        attempt
    }

    /// A fresh attempt for the current target, if the session is running.
    pub fn resume(&self) -> Option<Attempt> {
        if !self.running {
            return None;
        }
        self.target.as_ref().map(|path| Attempt {
            path: path.clone(),
            generation: self.generation,
        })
    }

    pub fn is_current(&self, attempt: &Attempt) -> bool {
        self.running && attempt.generation == self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures
    }

    pub fn current_step(&self) -> Option<FailureStep> {
        self.current_step
    }

    pub fn last_error(&self) -> Option<&PollError> {
        self.last_error.as_ref()
    }

    fn clear_failures(&mut self) {
        self.consecutive_failures = 0;
        self.current_step = None;
        self.last_error = None;
    }
}
