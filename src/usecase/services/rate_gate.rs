use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);

/// Enforces a minimum spacing between provider calls. One gate is shared by
/// every assistant handle in the process; waiters queue on the lock.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.min_interval;
            if Instant::now() < ready_at {
                debug!(
                    wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                    "rate gate holding call"
                );
                sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn second_call_waits_for_interval() {
        let gate = RateGate::new(Duration::from_millis(1000));
        let start = Instant::now();

        gate.wait().await;
        gate.wait().await;

        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(start.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_calls_do_not_wait() {
        let gate = RateGate::new(Duration::from_millis(1000));

        gate.wait().await;
        tokio::time::advance(Duration::from_millis(1500)).await;
        let before = Instant::now();
        gate.wait().await;

        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn shared_gate_serializes_concurrent_callers() {
        let gate = Arc::new(RateGate::new(Duration::from_millis(1000)));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move { gate.wait().await })
            })
            .collect();
        for handle in handles {
            handle.await.expect("waiter should finish");
        }

        assert!(start.elapsed() >= Duration::from_millis(2000));
    }
}
