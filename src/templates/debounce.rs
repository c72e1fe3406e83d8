// src/templates/debounce.rs
//! Write debouncer: rapid successive submissions coalesce into one
//! settled value taken after a quiet period.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
    settled: Option<T>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            settled: None,
        }
    }

    /// Replace any pending value and restart the quiet period.
    pub fn submit(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.delay));
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait until the newest submission has been quiet for the full
    /// delay, then return the settled value. Resolves immediately when
    /// nothing is pending.
    pub async fn settled(&mut self) -> Option<&T> {
        if let Some((_, deadline)) = &self.pending {
            sleep_until(*deadline).await;
            let (value, _) = self.pending.take().expect("pending checked above");
            self.settled = Some(value);
        }
        self.settled.as_ref()
    }

    /// Last settled value without waiting.
    pub fn last_settled(&self) -> Option<&T> {
        self.settled.as_ref()
    }
}
