//! # Retry Backoff
//!
//! Exponential backoff used by the error policy: the delay starts at the
//! configured minimum, doubles after every consecutive failure and is capped
//! at the maximum. A success drops the state entirely.

/// Exponential backoff calculator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentialBackoff {
    max_secs: u64,
    current_secs: u64,
}

impl ExponentialBackoff {
    /// `min_secs` is raised to 1 and `max_secs` to `min_secs` when inconsistent.
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let min_secs = min_secs.max(1);
        let max_secs = max_secs.max(min_secs);
        Self {
            max_secs,
            current_secs: min_secs,
        }
    }

    /// Delay to apply now, advancing the sequence for the next call
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let delay = self.current_secs;
        self.current_secs = self.current_secs.saturating_mul(2).min(self.max_secs);
        delay
    }
}

/// Backoff state for a specific resource
///
/// Tracks the consecutive error count alongside the backoff calculator.
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: ExponentialBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: ExponentialBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_until_capped() {
        let mut backoff = ExponentialBackoff::new(5, 60);
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_backoff_seconds()).collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 60, 60]);
    }

    #[test]
    fn test_large_bounds_saturate() {
        let mut backoff = ExponentialBackoff::new(u64::MAX / 2 + 1, u64::MAX);
        backoff.next_backoff_seconds();
        assert_eq!(backoff.next_backoff_seconds(), u64::MAX);
        assert_eq!(backoff.next_backoff_seconds(), u64::MAX);
    }

    #[test]
    fn test_inconsistent_bounds_are_clamped() {
        let mut backoff = ExponentialBackoff::new(0, 0);
        assert_eq!(backoff.next_backoff_seconds(), 1);
        assert_eq!(backoff.next_backoff_seconds(), 1);
    }

    #[test]
    fn test_backoff_state_tracks_errors() {
        let mut state = BackoffState::new(1, 10);
        state.increment_error();
        state.increment_error();
        assert_eq!(state.error_count, 2);
        assert_eq!(state.backoff.next_backoff_seconds(), 1);
        assert_eq!(state.backoff.next_backoff_seconds(), 2);
    }
}
