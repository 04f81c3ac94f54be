//! Foreground tick driver.
//!
//! # Responsibility
//! - Publish a `Tick` on a fixed cadence or at each wall-clock minute.
//! - Stop promptly when the owning screen goes away.
//!
//! # Invariants
//! - Ticks carry strictly increasing sequence numbers starting at 1; the
//!   initial value seen by subscribers has sequence 0.
//! - A tick only signals "recompute now"; it never reads or writes the store.

use super::next_minute_boundary;
use super::time_source::Clock;
use crate::observe::{Observable, Subscription};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Cadence used by foreground screens.
pub const FOREGROUND_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// One refresh signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub sequence: u64,
    pub at: DateTime<Utc>,
}

/// How the ticker spaces its ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMode {
    /// Fire every `Duration`, counted from the previous tick.
    FixedInterval(Duration),
    /// Fire at the start of every wall-clock minute.
    MinuteAligned,
}

impl Default for TickMode {
    fn default() -> Self {
        Self::FixedInterval(FOREGROUND_TICK_INTERVAL)
    }
}

/// Background thread publishing ticks until stopped or dropped.
pub struct Ticker {
    mode: TickMode,
    ticks: Arc<Observable<Tick>>,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Starts ticking on a dedicated thread.
    ///
    /// # Errors
    /// - Returns the OS error when the thread cannot be spawned.
    pub fn start(clock: Arc<dyn Clock>, mode: TickMode) -> std::io::Result<Self> {
        let ticks = Arc::new(Observable::new(Tick {
            sequence: 0,
            at: clock.now(),
        }));
        let (stop, stop_signal) = mpsc::channel::<()>();

        let published = Arc::clone(&ticks);
        let worker = thread::Builder::new()
            .name("worldclock-tick".to_string())
            .spawn(move || {
                let mut sequence = 0_u64;
                loop {
                    let wait = wait_for_next_tick(clock.as_ref(), mode);
                    match stop_signal.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            sequence += 1;
                            let at = clock.now();
                            debug!("event=tick module=refresh status=ok sequence={sequence}");
                            published.publish(Tick { sequence, at });
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        info!("event=tick_start module=refresh status=ok mode={mode:?}");
        Ok(Self {
            mode,
            ticks,
            stop: Some(stop),
            worker: Some(worker),
        })
    }

    pub fn mode(&self) -> TickMode {
        self.mode
    }

    /// Subscribes to ticks; the latest tick is delivered first.
    pub fn subscribe(&self) -> Subscription<Tick> {
        self.ticks.subscribe()
    }

    /// Stops the worker thread and waits for it to exit. Idempotent.
    pub fn stop(&mut self) {
        let Some(stop) = self.stop.take() else {
            return;
        };
        let _ = stop.send(());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        info!("event=tick_stop module=refresh status=ok");
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn wait_for_next_tick(clock: &dyn Clock, mode: TickMode) -> Duration {
    match mode {
        TickMode::FixedInterval(interval) => interval,
        TickMode::MinuteAligned => {
            let now = clock.now();
            (next_minute_boundary(now) - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
        }
    }
}
