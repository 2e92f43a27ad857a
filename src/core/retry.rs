use std::time::Duration;

use tracing::warn;

use crate::error::ResolveError;

/// Fixed-backoff retry for resolution calls hitting a rate-limited index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(30 * 60),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds, fails with anything but
    /// `ResolveError::Unavailable`, or the attempt budget is spent.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T, ResolveError>
    where
        F: FnMut() -> Result<T, ResolveError>,
    {
        let mut attempt: u32 = 1;
        loop {
            match op() {
                Err(ResolveError::Unavailable(reason)) => {
                    if self.max_attempts.is_some_and(|max| attempt >= max) {
                        return Err(ResolveError::Unavailable(reason));
                    }
                    warn!(
                        "{} unavailable ({}), attempt {}, sleeping {:?}",
                        what, reason, attempt, self.backoff
                    );
                    std::thread::sleep(self.backoff);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
