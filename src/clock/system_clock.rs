use crate::clock::SchedulerClock;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::SystemTime;

/// [`SystemClock`] is the default [`SchedulerClock`], backed directly by [`SystemTime::now`]
/// and [`tokio::time::sleep`]
#[derive(Default)]
pub struct SystemClock;

impl Debug for SystemClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SystemClock").field(&SystemTime::now()).finish()
    }
}

#[async_trait]
impl SchedulerClock for SystemClock {
    async fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn idle_to(&self, to: SystemTime) {
        let now = SystemTime::now();
        let duration = match to.duration_since(now) {
            Ok(duration) => duration,
            Err(_) => return,
        };

        tokio::time::sleep(duration).await;
    }
}
