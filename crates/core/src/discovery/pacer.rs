use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Fixed delay awaited before every call except the first.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    started: AtomicBool,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicBool::new(false),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits the configured delay scaled by `factor`.
    pub async fn wait_scaled(&self, factor: f64) {
        if !self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let delay = self.delay.mul_f64(factor.max(0.0));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    pub async fn wait(&self) {
        self.wait_scaled(1.0).await
    }
}
