use crate::{Error, Result};

use log::{debug, error};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, RecvTimeoutError, Sender},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// One tick at 60 Hz
pub const TIMER_PERIOD: Duration = Duration::from_nanos(1_000_000_000 / 60);

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct Counters {
    delay: u8,
    sound: u8,
    /// Task currently ticking these counters
    owner: Option<u64>,
}

impl Counters {
    /// Decrements counters only if they are not 0
    fn decrement(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }
}

/// Delay and sound timers, shared between the CPU and the timer thread
#[derive(Default)]
pub struct Timers {
    counters: Mutex<Counters>,
}

impl Timers {
    fn lock(&self) -> MutexGuard<'_, Counters> {
        // Counters stay consistent even if a holder panicked
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn delay(&self) -> u8 {
        self.lock().delay
    }

    pub fn set_delay(&self, value: u8) {
        self.lock().delay = value;
    }

    pub fn sound(&self) -> u8 {
        self.lock().sound
    }

    /// Returns the previous sound timer value
    pub fn set_sound(&self, value: u8) -> u8 {
        std::mem::replace(&mut self.lock().sound, value)
    }

    /// True while any [`TimerTask`] is ticking these timers
    pub fn is_running(&self) -> bool {
        self.lock().owner.is_some()
    }

    /// Single 60 Hz tick
    pub fn tick(&self) {
        self.lock().decrement();
    }
}

struct Worker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives [`Timers::tick`] from a background thread.
///
/// Ticks are scheduled against fixed deadlines (`start + n * period`) so a
/// late wakeup does not push every following tick back. Only one task at a
/// time may drive a given [`Timers`].
pub struct TimerTask {
    id: u64,
    timers: Arc<Timers>,
    period: Duration,
    worker: Option<Worker>,
}

impl TimerTask {
    pub fn new(timers: Arc<Timers>) -> Self {
        Self::with_period(timers, TIMER_PERIOD)
    }

    pub fn with_period(timers: Arc<Timers>, period: Duration) -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            timers,
            period,
            worker: None,
        }
    }

    /// Starts ticking; no-op if this task is already running.
    /// Fails with [`Error::TimerBusy`] if another task drives the same timers.
    pub fn start(&mut self) -> Result<()> {
        {
            let mut counters = self.timers.lock();

            match counters.owner {
                Some(owner) if owner == self.id => return Ok(()),
                Some(_) => return Err(Error::TimerBusy),
                None => counters.owner = Some(self.id),
            }
        }

        let (stop, stop_rx) = mpsc::channel();
        let timers = Arc::clone(&self.timers);
        let period = self.period;

        let spawned = thread::Builder::new()
            .name("chip8-timer".into())
            .spawn(move || {
                let mut deadline = Instant::now() + period;

                loop {
                    let timeout = deadline.saturating_duration_since(Instant::now());

                    match stop_rx.recv_timeout(timeout) {
                        Err(RecvTimeoutError::Timeout) => {
                            timers.tick();
                            deadline += period;
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                debug!("Timer started, period {:?}", self.period);
                self.worker = Some(Worker { stop, handle });

                Ok(())
            }
            Err(err) => {
                self.release();

                Err(Error::TimerSpawn(err))
            }
        }
    }

    /// Stops ticking and waits for the thread to exit; no tick fires after this returns
    pub fn stop(&mut self) {
        let Worker { stop, handle } = match self.worker.take() {
            Some(worker) => worker,
            None => return,
        };

        // A send error means the thread is already gone
        let _ = stop.send(());

        if handle.join().is_err() {
            error!("Timer thread panicked");
        }

        self.release();
        debug!("Timer stopped");
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn release(&self) {
        let mut counters = self.timers.lock();

        if counters.owner == Some(self.id) {
            counters.owner = None;
        }
    }

    pub fn timers(&self) -> &Arc<Timers> {
        &self.timers
    }
}

impl Drop for TimerTask {
    fn drop(&mut self) {
        self.stop();
    }
}
