//! Outbound request gate for marketplace scraping.
//!
//! Every navigation asks the gate first. The gate enforces a jittered minimum
//! interval between requests of the same session key and a hard ceiling on
//! requests per rolling hour. Exceeding the ceiling is fatal for the run:
//! [`OutboundGate::acquire`] returns [`ScraperError::QuotaExceeded`] instead of
//! waiting, so a run can never retry forever against a closed quota.
//!
//! State lives inside the gate. Share one gate across sessions with an `Arc`;
//! dropping it (or restarting the process) resets every quota.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::error::ScraperError;

const HOUR: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundGateConfig {
    /// Lower bound of the randomized gap between two requests.
    pub min_interval_ms: u64,
    /// Upper bound of the randomized gap; equal to `min_interval_ms` for a fixed gap.
    pub max_interval_ms: u64,
    /// Maximum requests per session key in any rolling hour.
    pub hourly_cap: usize,
}

#[derive(Debug, Default)]
struct SessionState {
    /// Earliest instant the next request may start.
    next_allowed: Option<Instant>,
    /// Start instants of requests granted within the last hour.
    granted: VecDeque<Instant>,
}

#[derive(Debug)]
pub struct OutboundGate {
    config: OutboundGateConfig,
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl OutboundGate {
    #[must_use]
    pub fn new(config: OutboundGateConfig) -> Self {
        let config = OutboundGateConfig {
            max_interval_ms: config.max_interval_ms.max(config.min_interval_ms),
            ..config
        };
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> OutboundGateConfig {
        self.config
    }

    /// Reserves the next request slot for `key` and returns how long the
    /// caller must wait before issuing it.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::QuotaExceeded`] when `key` already used its
    /// hourly cap. No slot is reserved in that case.
    pub fn acquire(&self, key: &str) -> Result<Duration, ScraperError> {
        self.acquire_at(key, Instant::now())
    }

    /// [`Self::acquire`] with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::QuotaExceeded`] when the hourly cap is used up.
    pub fn acquire_at(&self, key: &str, now: Instant) -> Result<Duration, ScraperError> {
        let gap = self.next_gap();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.entry(key.to_owned()).or_default();

        if let Some(horizon) = now.checked_sub(HOUR) {
            while session.granted.front().is_some_and(|&t| t <= horizon) {
                session.granted.pop_front();
            }
        }

        if session.granted.len() >= self.config.hourly_cap {
            return Err(ScraperError::QuotaExceeded {
                key: key.to_owned(),
                limit: self.config.hourly_cap,
            });
        }

        let start = session.next_allowed.map_or(now, |t| t.max(now));
        session.granted.push_back(start);
        session.next_allowed = Some(start + gap);

        Ok(start.saturating_duration_since(now))
    }

    /// Acquires a slot for `key` and sleeps until it opens.
    ///
    /// # Errors
    ///
    /// Propagates [`ScraperError::QuotaExceeded`] from [`Self::acquire`].
    pub async fn wait(&self, key: &str) -> Result<(), ScraperError> {
        let delay = self.acquire(key)?;
        if !delay.is_zero() {
            tracing::debug!(
                key,
                wait_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "outbound gate delaying request"
            );
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    /// Number of requests granted to `key` in the hour before `now`.
    #[must_use]
    pub fn granted_in_last_hour(&self, key: &str, now: Instant) -> usize {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.get(key).map_or(0, |s| {
            s.granted
                .iter()
                .filter(|&&t| now.checked_sub(HOUR).is_none_or(|h| t > h))
                .count()
        })
    }

    fn next_gap(&self) -> Duration {
        let OutboundGateConfig {
            min_interval_ms,
            max_interval_ms,
            ..
        } = self.config;
        let ms = if min_interval_ms == max_interval_ms {
            min_interval_ms
        } else {
            rand::rng().random_range(min_interval_ms..=max_interval_ms)
        };
        Duration::from_millis(ms)
    }
}
