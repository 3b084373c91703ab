use std::future::Future;
use tokio::time::{sleep_until, Instant};

/// Cancellable one-shot timer for the pending single tap.
///
/// `fired()` resolves at the deadline with the generation it was armed with,
/// and never resolves while the timer is disarmed.
#[derive(Debug, Default)]
pub struct SingleTapTimer {
    armed: Option<(Instant, u64)>,
}

impl SingleTapTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer; any earlier deadline is discarded
    pub fn arm(&mut self, deadline: Instant, generation: u64) {
        self.armed = Some((deadline, generation));
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Future for the current arming. The future does not borrow the timer,
    /// so the timer can be re-armed or cancelled in a `select!` handler.
    pub fn fired(&self) -> impl Future<Output = u64> + 'static {
        let armed = self.armed;
        async move {
            match armed {
                Some((deadline, generation)) => {
                    sleep_until(deadline).await;
                    generation
                }
                None => std::future::pending().await,
            }
        }
    }
}
