// src/controller/scheduler.rs
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Spawn a task that runs `job` every `period`, first one period from now.
///
/// Only a weak reference to `owner` is held; the loop ends once the
/// owner is dropped. Runs never overlap: a slow run delays the next one.
pub fn spawn_recurring<T, F, Fut>(
    name: &'static str,
    period: Duration,
    owner: Weak<T>,
    job: F,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fn(Arc<T>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(owner) = owner.upgrade() else {
                tracing::debug!(target: "scheduler", task = name, "owner dropped; stopping");
                break;
            };
            job(owner).await;
        }
    })
}

/// The two recurring controller tasks. Aborted on `shutdown` or drop.
#[derive(Debug)]
pub struct PollingTasks {
    price_tick: JoinHandle<()>,
    news_poll: JoinHandle<()>,
}

impl PollingTasks {
    pub fn new(price_tick: JoinHandle<()>, news_poll: JoinHandle<()>) -> Self {
        Self {
            price_tick,
            news_poll,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.price_tick.is_finished() && self.news_poll.is_finished()
    }

    pub fn shutdown(&self) {
        self.price_tick.abort();
        self.news_poll.abort();
    }
}

impl Drop for PollingTasks {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn fires_after_each_period_and_stops_when_owner_drops() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = spawn_recurring(
            "test",
            Duration::from_secs(3),
            Arc::downgrade(&counter),
            |c| async move {
                c.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0, "no immediate first run");

        tokio::time::sleep(Duration::from_millis(6_200)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        drop(counter);
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(handle.is_finished());
    }
}
