use std::time::Duration;

use crate::error::PollError;

/// Delay between successful resolutions.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// What to do after a failed resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureStep {
    pub delay: Duration,
    /// Whether the failure should be shown to the user
    pub user_visible: bool,
}

impl FailureStep {
    pub fn wait(delay: Duration) -> Self {
        Self {
            delay,
            user_visible: false,
        }
    }

    pub fn alert(delay: Duration) -> Self {
        Self {
            delay,
            user_visible: true,
        }
    }
}

/// Escalating retry steps indexed by the number of failures seen so far.
///
/// Past the end, the last step repeats forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffLadder {
    steps: Vec<FailureStep>,
}

impl BackoffLadder {
    pub fn new(steps: Vec<FailureStep>) -> Result<Self, PollError> {
        if steps.is_empty() {
            return Err(PollError::ConfigError(
                "backoff ladder needs at least one step".to_string(),
            ));
        }
        Ok(Self { steps })
    }

    /// wait 1x, wait 1x, alert 2x, alert 4x, alert 8x. Delays saturate at
    /// `Duration::MAX`.
    pub fn default_for(base: Duration) -> Self {
        Self {
            steps: vec![
                FailureStep::wait(base),
                FailureStep::wait(base),
                FailureStep::alert(base.saturating_mul(2)),
                FailureStep::alert(base.saturating_mul(4)),
                FailureStep::alert(base.saturating_mul(8)),
            ],
        }
    }

    /// Step for the failure that follows `previous_failures` earlier ones.
    pub fn step_for(&self, previous_failures: usize) -> FailureStep {
        let index = previous_failures.min(self.steps.len() - 1);
        self.steps[index]
    }

    pub fn steps(&self) -> &[FailureStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for BackoffLadder {
    fn default() -> Self {
        Self::default_for(DEFAULT_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder_shape() {
        let ladder = BackoffLadder::default();
        let delays: Vec<u64> = ladder.steps().iter().map(|s| s.delay.as_secs()).collect();
        let visible: Vec<bool> = ladder.steps().iter().map(|s| s.user_visible).collect();

        assert_eq!(delays, vec![5, 5, 10, 20, 40]);
        assert_eq!(visible, vec![false, false, true, true, true]);
    }

    #[test]
    fn test_index_clamps_to_last_step() {
        let ladder = BackoffLadder::default();
        let last = *ladder.steps().last().unwrap();

        assert_eq!(ladder.step_for(4), last);
        assert_eq!(ladder.step_for(5), last);
        assert_eq!(ladder.step_for(10_000), last);
    }

    #[test]
    fn test_delay_never_decreases() {
        let ladder = BackoffLadder::default();
        let max = ladder.steps().last().unwrap().delay;

        let mut previous = Duration::ZERO;
        for failures in 0..50 {
            let step = ladder.step_for(failures);
            assert!(step.delay >= previous);
            assert!(step.delay <= max);
            previous = step.delay;
        }
    }

    #[test]
    fn test_empty_ladder_is_rejected() {
        assert!(matches!(
            BackoffLadder::new(Vec::new()),
            Err(PollError::ConfigError(_))
        ));
    }

    #[test]
    fn test_single_step_ladder_repeats() {
        let ladder = BackoffLadder::new(vec![FailureStep::alert(Duration::from_secs(1))]).unwrap();
        assert_eq!(ladder.step_for(0), ladder.step_for(7));
    }

    #[test]
    fn test_huge_base_saturates() {
        let base = Duration::from_secs(u64::MAX / 4);
        let ladder = BackoffLadder::default_for(base);

        assert_eq!(ladder.step_for(0).delay, base);
        assert_eq!(ladder.step_for(2).delay, base * 2);
        assert_eq!(ladder.step_for(3).delay, Duration::MAX);
        assert_eq!(ladder.step_for(4).delay, Duration::MAX);
    }
}
