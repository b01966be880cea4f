//! The single suspension point of the retry controller.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Waits out a retry delay.
#[async_trait]
pub trait Sleeper: Send + Sync + fmt::Debug {
    /// Suspends the current call for `delay`.
    async fn sleep(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
