//! Multi-window rate budget for outbound proxy calls.
//!
//! A [`RateLedger`] keeps the timestamps of recent calls and a ladder of
//! [`RateRule`]s (per second, minute, hour, day, week). A call is permitted
//! only while every rule's usage inside its window is below the rule's
//! threshold (nominal limit minus a safety buffer). Otherwise the caller
//! suspends until the oldest blocking timestamp ages out.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// One `(window, limit)` step of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateRule {
    pub window: Duration,
    pub limit: u32,
    /// Subtracted from `limit` to stay clear of the vendor's hard cap.
    pub buffer: u32,
}

impl RateRule {
    #[must_use]
    pub const fn new(window: Duration, limit: u32, buffer: u32) -> Self {
        Self {
            window,
            limit,
            buffer,
        }
    }

    /// Calls allowed per window. Never below one.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.limit.saturating_sub(self.buffer).max(1) as usize
    }
}

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Ladder used when the caller does not configure one.
#[must_use]
pub fn default_ladder() -> Vec<RateRule> {
    vec![
        RateRule::new(Duration::from_secs(1), 10, 2),
        RateRule::new(MINUTE, 300, 10),
        RateRule::new(HOUR, 5_000, 100),
        RateRule::new(DAY, 50_000, 500),
        RateRule::new(WEEK, 250_000, 2_500),
    ]
}

#[derive(Debug)]
pub struct RateLedger {
    rules: Vec<RateRule>,
    horizon: Duration,
    stamps: Mutex<VecDeque<Instant>>,
}

impl RateLedger {
    #[must_use]
    pub fn new(rules: Vec<RateRule>) -> Self {
        let horizon = rules
            .iter()
            .map(|r| r.window)
            .max()
            .unwrap_or(Duration::ZERO);
        Self {
            rules,
            horizon,
            stamps: Mutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub fn rules(&self) -> &[RateRule] {
        &self.rules
    }

    /// Suspends until every rule permits a call, then records it.
    pub async fn acquire(&self) {
        loop {
            match self.try_acquire_at(Instant::now()) {
                Ok(()) => return,
                Err(wait) => {
                    tracing::debug!(
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        "rate budget exhausted, waiting for window to clear"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Records a call at `now` if permitted; otherwise returns how long to
    /// wait before the earliest blocking rule clears.
    ///
    /// # Errors
    ///
    /// Returns the required wait when any rule is at its threshold.
    pub fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut stamps = self.stamps.lock().unwrap_or_else(PoisonError::into_inner);
        while stamps
            .front()
            .is_some_and(|oldest| now.saturating_duration_since(*oldest) >= self.horizon)
        {
            stamps.pop_front();
        }

        match self.required_wait(&stamps, now) {
            None => {
                stamps.push_back(now);
                Ok(())
            }
            Some(wait) => Err(wait),
        }
    }

    /// Number of recorded calls inside `window` as of `now`.
    #[must_use]
    pub fn usage_at(&self, window: Duration, now: Instant) -> usize {
        let stamps = self.stamps.lock().unwrap_or_else(PoisonError::into_inner);
        stamps
            .iter()
            .filter(|s| now.saturating_duration_since(**s) < window)
            .count()
    }

    fn required_wait(&self, stamps: &VecDeque<Instant>, now: Instant) -> Option<Duration> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let in_window: Vec<Instant> = stamps
                    .iter()
                    .copied()
                    .filter(|s| now.saturating_duration_since(*s) < rule.window)
                    .collect();
                let threshold = rule.threshold();
                if in_window.len() < threshold {
                    return None;
                }
                // Enough of the oldest stamps must age out to drop below threshold.
                let blocking = in_window[in_window.len() - threshold];
                Some((blocking + rule.window).saturating_duration_since(now))
            })
            .max()
    }
}

impl Default for RateLedger {
    fn default() -> Self {
        Self::new(default_ladder())
    }
}
