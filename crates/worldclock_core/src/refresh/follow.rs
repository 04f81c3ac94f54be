//! Widget redraw on committed list/home changes.
//!
//! # Responsibility
//! - Ask the host to redraw widget surfaces right after an edit commits,
//!   instead of waiting for the next alarm.
//!
//! # Invariants
//! - One redraw per distinct committed `ZoneState`; no-op edits redraw nothing.
//! - The state present at start is not redrawn.
//! - The worker holds a service handle, so the followed store outlives it.

use super::widget_refresh::SurfaceRefresher;
use crate::observe::Subscription;
use crate::service::timezone_service::{TimezoneService, ZoneState};
use crate::store::PreferenceStore;
use log::{error, info};
use std::sync::mpsc::{self, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Upper bound on how long `stop` waits for the worker to notice.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Background worker redrawing surfaces on every zone state change.
pub struct SurfaceFollower {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl SurfaceFollower {
    /// Starts following `service`'s list and home zone.
    ///
    /// # Errors
    /// - Returns the OS error when the thread cannot be spawned.
    pub fn start<S, R>(service: &TimezoneService<S>, surfaces: R) -> std::io::Result<Self>
    where
        S: PreferenceStore + 'static,
        R: SurfaceRefresher + Send + 'static,
    {
        let service = service.clone();
        let changes = service.subscribe_state();
        // Current state is what the surfaces already show.
        let _ = changes.try_recv();
        let (stop, stop_signal) = mpsc::channel::<()>();

        let worker = thread::Builder::new()
            .name("worldclock-widget-follow".to_string())
            .spawn(move || follow(service, changes, surfaces, stop_signal))?;

        info!("event=widget_follow module=refresh status=start");
        Ok(Self {
            stop: Some(stop),
            worker: Some(worker),
        })
    }

    /// Stops the worker and waits for it to exit. Idempotent.
    pub fn stop(&mut self) {
        let Some(stop) = self.stop.take() else {
            return;
        };
        let _ = stop.send(());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        info!("event=widget_follow module=refresh status=stop");
    }
}

impl Drop for SurfaceFollower {
    fn drop(&mut self) {
        self.stop();
    }
}

fn follow<S: PreferenceStore, R: SurfaceRefresher>(
    _service: TimezoneService<S>,
    changes: Subscription<ZoneState>,
    surfaces: R,
    stop_signal: mpsc::Receiver<()>,
) {
    loop {
        match stop_signal.try_recv() {
            Err(TryRecvError::Empty) => {}
            Ok(()) | Err(TryRecvError::Disconnected) => break,
        }

        let Some(state) = changes.recv_timeout(STOP_POLL_INTERVAL) else {
            continue;
        };
        match surfaces.refresh_all() {
            Ok(()) => info!(
                "event=widget_refresh module=refresh status=ok reason=state_change zones={}",
                state.zones.len()
            ),
            Err(err) => error!(
                "event=widget_refresh module=refresh status=error reason=state_change error={err}"
            ),
        }
    }
}
