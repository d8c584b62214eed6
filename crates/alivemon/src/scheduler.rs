use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, trace};

/// Work run on every tick of a monitor's timer
pub type ProbeTask = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Probe scheduler - fires a recurring task per active monitor.
///
/// Pausing is expressed as [`cancel`](Self::cancel) followed by a later
/// [`schedule`](Self::schedule); the timer itself has no paused state.
/// Tick bodies run on a bounded pool so a slow probe never holds up the
/// timers of other monitors.
pub struct ProbeScheduler {
    runtime: Handle,
    workers: Arc<Semaphore>,
    timers: Mutex<HashMap<u32, JoinHandle<()>>>,
}

impl ProbeScheduler {
    /// Create a new scheduler spawning onto `runtime` with `workers` tick slots
    pub fn new(runtime: Handle, workers: usize) -> Self {
        Self {
            runtime,
            workers: Arc::new(Semaphore::new(workers.max(1))),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Arm a recurring timer for `monitor_id`; the first tick fires immediately.
    ///
    /// Re-scheduling an armed monitor replaces its timer.
    pub fn schedule(&self, monitor_id: u32, period: Duration, task: ProbeTask) {
        let workers = self.workers.clone();
        let period = period.max(Duration::from_millis(1));

        let timer = self.runtime.spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;

                let Ok(permit) = workers.clone().acquire_owned().await else {
                    break;
                };
                trace!(monitor_id, "Dispatching probe tick");
                let probe = task();
                tokio::spawn(async move {
                    probe.await;
                    drop(permit);
                });
            }
        });

        debug!(monitor_id, period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX), "Scheduled monitor");
        if let Some(previous) = self.timers().insert(monitor_id, timer) {
            previous.abort();
        }
    }

    /// Stop and forget the timer of `monitor_id`.
    ///
    /// A tick already dispatched to the pool runs to completion.
    pub fn cancel(&self, monitor_id: u32) -> bool {
        match self.timers().remove(&monitor_id) {
            Some(timer) => {
                timer.abort();
                debug!(monitor_id, "Cancelled monitor schedule");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, monitor_id: u32) -> bool {
        self.timers().contains_key(&monitor_id)
    }

    pub fn scheduled_count(&self) -> usize {
        self.timers().len()
    }

    fn timers(&self) -> std::sync::MutexGuard<'_, HashMap<u32, JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ProbeScheduler {
    fn drop(&mut self) {
        for (_, timer) in self.timers().drain() {
            timer.abort();
        }
    }
}
