use std::{future::Future, ops::ControlFlow, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// One cycle of a periodic task.
///
/// Returning `ControlFlow::Break(())` ends the task from the inside; the
/// driving [`PeriodicTask`] does not re-arm after a break.
pub trait Tick: Send + 'static {
    fn tick(&mut self) -> impl Future<Output = ControlFlow<()>> + Send;
}

/// A fixed-period background task with an explicit owner-side handle.
///
/// The tick is re-armed by the task itself after each execution; cancellation
/// happens either through [`PeriodicTask::cancel`] or by the ticker breaking
/// out. A missed period is skipped rather than burst-executed.
pub struct PeriodicTask {
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    pub fn spawn<T: Tick>(period: Duration, mut ticker: T) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                if ticker.tick().await.is_break() {
                    break;
                }
            }
        });

        Self { handle }
    }

    /// True once the task has stopped, whether broken out or cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task without waiting for the current tick to finish.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Wait for the task to end on its own (the ticker returning `Break`).
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        ops::ControlFlow,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use super::*;

    struct CountTicker {
        count: Arc<AtomicUsize>,
        stop_after: usize,
    }

    impl Tick for CountTicker {
        async fn tick(&mut self) -> ControlFlow<()> {
            let ticks = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            if ticks >= self.stop_after {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn breaks_out_after_requested_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let task = PeriodicTask::spawn(
            Duration::from_millis(10),
            CountTicker {
                count: count.clone(),
                stop_after: 3,
            },
        );

        task.join().await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_rearming() {
        let count = Arc::new(AtomicUsize::new(0));
        let task = PeriodicTask::spawn(
            Duration::from_millis(10),
            CountTicker {
                count: count.clone(),
                stop_after: usize::MAX,
            },
        );

        tokio::time::sleep(Duration::from_millis(35)).await;
        task.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let ticks = count.load(Ordering::SeqCst);
        assert!(ticks >= 1);
        assert!(ticks <= 5, "task kept ticking after cancel: {ticks}");
    }
}
