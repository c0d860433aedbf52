//! Periodic discovery and update loops
//!
//! A single task owns the [`Observer`] and waits on two jittered deadlines;
//! whichever expires first runs to completion before the next wait. Each
//! deadline is re-drawn after its tick. Stopping is observed between ticks.

use crate::notify::Notifier;
use crate::pipeline::Observer;
use gdlo_common::config::JitterPeriod;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct ObserverService {
    observer: Observer,
    notifier: Notifier,
    discovery_period: JitterPeriod,
    update_period: JitterPeriod,
    max_pages: Option<u32>,
}

/// Handle to a running [`ObserverService`]
pub struct ServiceHandle {
    cancel: CancellationToken,
    task: JoinHandle<Observer>,
}

impl ServiceHandle {
    /// Ask the loops to stop after the current tick
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop and wait for the loop task; returns the observer state
    pub async fn shutdown(self) -> Option<Observer> {
        self.stop();
        match self.task.await {
            Ok(observer) => Some(observer),
            Err(e) => {
                error!("Observer task ended abnormally: {}", e);
                None
            }
        }
    }
}

impl ObserverService {
    pub fn new(observer: Observer, notifier: Notifier) -> Self {
        let settings = observer.settings();
        let discovery_period = settings.discovery.interval;
        let update_period = settings.update.interval;
        let max_pages = settings.discovery.max_pages;
        Self {
            observer,
            notifier,
            discovery_period,
            update_period,
            max_pages,
        }
    }

    /// Spawn the loop task
    pub fn start(self) -> ServiceHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        ServiceHandle { cancel, task }
    }

    /// Run both loops until `cancel` fires
    pub async fn run(mut self, cancel: CancellationToken) -> Observer {
        info!(
            "Starting observer loops (discovery {:.0}s ± {:.0}s, update {:.0}s ± {:.0}s)",
            self.discovery_period.period_secs,
            self.discovery_period.random_secs,
            self.update_period.period_secs,
            self.update_period.random_secs
        );

        let mut next_discovery = Instant::now() + self.discovery_period.sample();
        let mut next_update = Instant::now() + self.update_period.sample();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Observer loops stopped");
                    break;
                }
                _ = sleep_until(next_discovery) => {
                    let report = self.observer.discover(self.max_pages).await;
                    self.notifier.publish(&report).await;
                    next_discovery = Instant::now() + self.discovery_period.sample();
                }
                _ = sleep_until(next_update) => {
                    let report = self.observer.update_tick().await;
                    self.notifier.publish(&report).await;
                    next_update = Instant::now() + self.update_period.sample();
                }
            }
        }

        self.observer
    }
}
