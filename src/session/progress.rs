// src/session/progress.rs
//! Cosmetic progress ticker shown while an analysis request is in
//! flight. It advances through a fixed message sequence on its own
//! timer and never gates the result: the real request promise is the
//! only thing that decides when results render.

use std::time::Duration;
use tokio::task::JoinHandle;

pub const ANALYSIS_STAGES: &[&str] = &[
    "Uploading resume",
    "Scanning for keywords",
    "Comparing against the job description",
    "Scoring ATS compatibility",
    "Writing recommendations",
];

/// Stage label for the nth timer tick; holds on the last stage once the
/// sequence is exhausted.
pub fn stage_for_tick(tick: usize) -> &'static str {
    let index = tick.min(ANALYSIS_STAGES.len() - 1);
    ANALYSIS_STAGES[index]
}

pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Spawn the ticker on its own task. Runs until `finish` aborts it;
    /// the request racing alongside is entirely independent.
    pub fn spawn(interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            for tick in 0..ANALYSIS_STAGES.len() {
                timer.tick().await;
                println!("  … {}", stage_for_tick(tick));
            }
            // Hold silently; the response decides when we are done.
            std::future::pending::<()>().await;
        });

        Self { handle }
    }

    pub fn finish(self) {
        self.handle.abort();
    }
}
