//! Event pacing
//!
//! The pacer suspends a stream for a requested duration. Timer-based sleeps
//! have a granularity of roughly one scheduler quantum (~16ms on common
//! platforms), so at high event rates a plain sleep stretches every
//! inter-event gap and skews the generated rate. Short waits therefore spin
//! on a monotonic clock instead, yielding to the async scheduler between
//! checks so that a concurrently running stream keeps making progress.

use crate::config::PacingMode;
use std::time::{Duration, Instant};

/// Waits at or below this duration spin in adaptive mode
pub const SHORT_WAIT_THRESHOLD: Duration = Duration::from_millis(16);

/// Duration-aware waiter
#[derive(Debug, Clone, Copy, Default)]
pub struct Pacer {
    mode: PacingMode,
}

impl Pacer {
    pub fn new(mode: PacingMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> PacingMode {
        self.mode
    }

    /// Whether a wait of `duration` spins rather than sleeps
    pub fn spins_for(&self, duration: Duration) -> bool {
        match self.mode {
            PacingMode::Adaptive => duration <= SHORT_WAIT_THRESHOLD,
            PacingMode::Sleep => false,
            PacingMode::Spin => true,
        }
    }

    /// Suspend the calling task for at least `duration`
    ///
    /// A zero duration returns immediately without yielding.
    pub async fn wait(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }

        if self.spins_for(duration) {
            spin(duration).await;
        } else {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Busy-wait on the monotonic clock, yielding between checks
async fn spin(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_is_noop() {
        let pacer = Pacer::default();
        let start = Instant::now();
        pacer.wait(Duration::ZERO).await;
        assert!(start.elapsed() < Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_short_wait_spins_at_least_requested() {
        let pacer = Pacer::new(PacingMode::Adaptive);
        assert!(pacer.spins_for(Duration::from_millis(2)));

        let start = Instant::now();
        pacer.wait(Duration::from_millis(2)).await;
        assert!(start.elapsed() >= Duration::from_millis(2));
    }

    #[tokio::test]
    async fn test_long_wait_sleeps_at_least_requested() {
        let pacer = Pacer::new(PacingMode::Adaptive);
        assert!(!pacer.spins_for(Duration::from_millis(30)));

        let start = Instant::now();
        pacer.wait(Duration::from_millis(30)).await;
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_threshold_boundary() {
        let pacer = Pacer::new(PacingMode::Adaptive);
        assert!(pacer.spins_for(SHORT_WAIT_THRESHOLD));
        assert!(!pacer.spins_for(SHORT_WAIT_THRESHOLD + Duration::from_micros(1)));
    }

    #[test]
    fn test_forced_modes() {
        assert!(!Pacer::new(PacingMode::Sleep).spins_for(Duration::from_micros(10)));
        assert!(Pacer::new(PacingMode::Spin).spins_for(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_spin_does_not_starve_other_tasks() {
        let pacer = Pacer::new(PacingMode::Spin);
        let other = tokio::spawn(async { 42 });

        pacer.wait(Duration::from_millis(5)).await;

        // On a current-thread runtime the spawned task only runs if the spin yields
        assert!(other.is_finished());
        assert_eq!(other.await.unwrap(), 42);
    }
}
