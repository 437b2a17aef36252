pub mod system_clock;

use std::fmt::Debug;
use std::ops::Deref;
pub use system_clock::SystemClock;

use async_trait::async_trait;
use std::time::SystemTime;

/// [`SchedulerClock`] abstracts the source of wall-clock time used by the main loop, so that
/// the planner and the loop's interruptible sleep never call [`SystemTime::now`] directly
///
/// # Required Methods
/// Implementors provide [`SchedulerClock::now`] and [`SchedulerClock::idle_to`]; both are used
/// by [`crate::scheduler::Scheduler`]'s main loop
///
/// # See Also
/// - [`SystemClock`]
#[async_trait]
pub trait SchedulerClock: Debug + Send + Sync {
    /// Returns the current time
    async fn now(&self) -> SystemTime;

    /// Idles until `to` is reached; if `to` is already in the past or present, returns
    /// immediately
    async fn idle_to(&self, to: SystemTime);
}

#[async_trait]
impl<T> SchedulerClock for T
where
    T: Deref + Send + Sync + Debug,
    T::Target: SchedulerClock,
{
    async fn now(&self) -> SystemTime {
        self.deref().now().await
    }

    async fn idle_to(&self, to: SystemTime) {
        self.deref().idle_to(to).await
    }
}
