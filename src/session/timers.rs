//! Timer tasks owned by the session controller.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

/// Holds at most one spawned task. Arming aborts the previous one.
#[derive(Debug)]
pub struct TaskSlot {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    pub fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    pub fn arm(&mut self, handle: JoinHandle<()>) {
        self.stop();
        self.handle = Some(handle);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::trace!(slot = self.name, "Task aborted");
        }
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Send `event` every `period`, first after one full period.
pub fn every<E>(period: Duration, events: mpsc::UnboundedSender<E>, event: E) -> JoinHandle<()>
where
    E: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if events.send(event.clone()).is_err() {
                break;
            }
        }
    })
}

/// Send `event` once after `delay`.
pub fn after<E>(delay: Duration, events: mpsc::UnboundedSender<E>, event: E) -> JoinHandle<()>
where
    E: Send + 'static,
{
    tokio::spawn(async move {
        sleep(delay).await;
        let _ = events.send(event);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_every_ticks_after_each_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let _handle = every(Duration::from_secs(1), tx, 7u8);

        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_arming_aborts_previous_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = TaskSlot::new("test");

        slot.arm(after(Duration::from_secs(5), tx.clone(), "first"));
        slot.arm(after(Duration::from_secs(1), tx.clone(), "second"));
        drop(tx);

        assert_eq!(rx.recv().await, Some("second"));
        // The aborted task dropped its sender without sending.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_silences_slot() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = TaskSlot::new("test");
        slot.arm(every(Duration::from_secs(1), tx, ()));
        slot.stop();

        assert_eq!(rx.recv().await, None);
    }
}
