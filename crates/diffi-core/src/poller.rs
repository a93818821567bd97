use std::future::{self, Future};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use diffi_git::{FileChange, GitError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backoff::{BackoffLadder, DEFAULT_INTERVAL};
use crate::clock::Clock;
use crate::error::PollError;
use crate::resolver::ChangeResolver;
use crate::session::{Attempt, PollingSession};

/// Events emitted after every resolution that still belongs to the session.
#[derive(Debug, Clone)]
pub enum PollEvent {
    Changes {
        path: PathBuf,
        changes: Vec<FileChange>,
    },
    Failed {
        path: PathBuf,
        error: PollError,
        consecutive_failures: usize,
        retry_in: Duration,
        /// Set once the ladder reaches an alerting step
        user_visible: bool,
    },
}

/// Timing for a poller
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub ladder: BackoffLadder,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            ladder: BackoffLadder::default(),
        }
    }
}

impl PollConfig {
    /// Base interval with the default ladder scaled to it.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ladder: BackoffLadder::default_for(interval),
        }
    }

    pub fn with_ladder(mut self, ladder: BackoffLadder) -> Self {
        self.ladder = ladder;
        self
    }
}

#[derive(Debug)]
enum Command {
    Start(PathBuf),
    Stop,
    Shutdown,
}

/// Cloneable control side of a [`Poller`]
#[derive(Debug, Clone)]
pub struct PollerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl PollerHandle {
    /// Watch `path`, resolving right away. Replaces any previous target.
    pub fn start(&self, path: impl Into<PathBuf>) {
        let _ = self.commands.send(Command::Start(path.into()));
    }

    /// Cancel the pending retry and go idle. Safe to call repeatedly.
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }
}

/// Runs a [`ChangeResolver`] on a timer with single-flight execution and
/// backoff on failure.
pub struct Poller {
    handle: PollerHandle,
    events: broadcast::Sender<PollEvent>,
    task: JoinHandle<()>,
}

impl Poller {
    /// Spawn the driver task on the current tokio runtime.
    pub fn spawn(
        resolver: Arc<dyn ChangeResolver>,
        clock: Arc<dyn Clock>,
        config: PollConfig,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);

        let driver = Driver {
            session: PollingSession::new(config.interval, config.ladder),
            resolver,
            clock,
            events: events.clone(),
        };
        let task = tokio::spawn(driver.run(commands_rx));

        Self {
            handle: PollerHandle {
                commands: commands_tx,
            },
            events,
            task,
        }
    }

    pub fn start(&self, path: impl Into<PathBuf>) {
        self.handle.start(path);
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    pub fn handle(&self) -> PollerHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.events.subscribe()
    }

    /// Stop the driver task and wait for it to exit. A resolution still
    /// running on the blocking pool finishes on its own; its result is dropped.
    /// Outstanding [`PollerHandle`]s become no-ops.
    pub async fn shutdown(self) {
        let _ = self.handle.commands.send(Command::Shutdown);
        let _ = self.task.await;
    }
}

type Timer = Pin<Box<dyn Future<Output = ()> + Send>>;

struct InFlight {
    attempt: Attempt,
    task: JoinHandle<Result<Vec<FileChange>, GitError>>,
}

struct Driver {
    session: PollingSession,
    resolver: Arc<dyn ChangeResolver>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<PollEvent>,
}

impl Driver {
    /// At most one of `in_flight` and `timer` is armed at a time, except
    /// right after a restart, when the stale resolution is still running and
    /// no timer exists.
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut in_flight: Option<InFlight> = None;
        let mut timer: Option<Timer> = None;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Start(path)) => {
                        timer = None;
                        info!(path = %path.display(), "Polling started");
                        let attempt = self.session.start(path);
                        if in_flight.is_none() {
                            in_flight = Some(self.launch(attempt));
                        }
                    }
                    Some(Command::Stop) => {
                        timer = None;
                        if self.session.is_running() {
                            info!(path = ?self.session.target(), "Polling stopped");
                        }
                        self.session.stop();
                    }
                    Some(Command::Shutdown) | None => break,
                },
                (attempt, outcome) = finished(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    timer = self.settle(&attempt, outcome);
                    if timer.is_none() {
                        in_flight = self.session.resume().map(|next| self.launch(next));
                    }
                }
                _ = elapsed(&mut timer), if timer.is_some() => {
                    timer = None;
                    in_flight = self.session.timer_fired().map(|next| self.launch(next));
                }
            }
        }

        debug!("Poller driver exited");
    }

    fn launch(&self, attempt: Attempt) -> InFlight {
        let resolver = Arc::clone(&self.resolver);
        let path = attempt.path().to_path_buf();
        debug!(path = %path.display(), "Resolving changes");

        let task = tokio::task::spawn_blocking(move || resolver.resolve(&path));
        InFlight { attempt, task }
    }

    /// Apply a finished resolution and arm the next timer. `None` means the
    /// result was stale and nothing was scheduled.
    fn settle(
        &mut self,
        attempt: &Attempt,
        outcome: Result<Vec<FileChange>, PollError>,
    ) -> Option<Timer> {
        let path = attempt.path().to_path_buf();

        match outcome {
            Ok(changes) => {
                let Some(delay) = self.session.record_success(attempt) else {
                    debug!(path = %path.display(), "Discarding stale result");
                    return None;
                };
                debug!(changes = changes.len(), "Resolution succeeded");
                let _ = self.events.send(PollEvent::Changes { path, changes });
                Some(self.arm(delay))
            }
            Err(error) => {
                let Some(failure) = self.session.record_failure(attempt, error.clone()) else {
                    debug!(path = %path.display(), "Discarding stale failure");
                    return None;
                };
                warn!(
                    error = %error,
                    consecutive_failures = failure.consecutive_failures,
                    retry_in_secs = failure.step.delay.as_secs_f64(),
                    "Resolution failed"
                );
                let _ = self.events.send(PollEvent::Failed {
                    path,
                    error,
                    consecutive_failures: failure.consecutive_failures,
                    retry_in: failure.step.delay,
                    user_visible: failure.step.user_visible,
                });
                Some(self.arm(failure.step.delay))
            }
        }
    }

    fn arm(&self, delay: Duration) -> Timer {
        let clock = Arc::clone(&self.clock);
        Box::pin(async move { clock.sleep(delay).await })
    }
}

async fn finished(
    in_flight: &mut Option<InFlight>,
) -> (Attempt, Result<Vec<FileChange>, PollError>) {
    let Some(flight) = in_flight.as_mut() else {
        return future::pending().await;
    };

    let outcome = match (&mut flight.task).await {
        Ok(Ok(changes)) => Ok(changes),
        Ok(Err(e)) => Err(PollError::Git(e)),
        Err(e) => Err(PollError::TaskFailed(e.to_string())),
    };

    (flight.attempt.clone(), outcome)
}

async fn elapsed(timer: &mut Option<Timer>) {
    match timer.as_mut() {
        Some(timer) => timer.await,
        None => future::pending().await,
    }
}
