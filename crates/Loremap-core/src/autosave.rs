use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::config::{SyncConfig, clamp_interval};
use crate::persistence::{PersistenceBridge, StoredSettings};
use crate::sync::{SaveOutcome, SyncCoordinator};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutoSaveSettings {
    pub enabled: bool,
    pub interval: Duration,
}

impl AutoSaveSettings {
    /// Persisted user choices win over configured defaults.
    pub fn resolve(config: &SyncConfig, stored: &StoredSettings) -> Self {
        Self {
            enabled: stored.auto_save_enabled.unwrap_or(config.auto_save_enabled),
            interval: clamp_interval(stored.auto_save_interval.unwrap_or(config.auto_save_interval())),
        }
    }
}

pub struct AutoSaveScheduler;

impl AutoSaveScheduler {
    /// Starts the timer task. Each tick saves only while enabled, only with unsaved
    /// changes and only when no save is already running.
    pub fn spawn(coordinator: Arc<SyncCoordinator>, settings: AutoSaveSettings) -> AutoSaveHandle {
        let settings = AutoSaveSettings {
            interval: clamp_interval(settings.interval),
            ..settings
        };
        let (tx, mut rx) = watch::channel(settings);
        let bridge = coordinator.session().bridge().clone();

        let task = tokio::spawn(async move {
            loop {
                let current = *rx.borrow_and_update();
                let mut ticker = time::interval_at(Instant::now() + current.interval, current.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                // Runs until the settings change, then reschedules from scratch.
                loop {
                    tokio::select! {
                        changed = rx.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            break;
                        }
                        _ = ticker.tick(), if current.enabled => {
                            if coordinator.is_saving() {
                                continue;
                            }
                            match coordinator.save().await {
                                Ok(SaveOutcome::Saved(report)) => {
                                    debug!(nodes = report.nodes_written, "Auto-save completed");
                                }
                                Ok(SaveOutcome::Skipped(_)) => {}
                                // Already logged and broadcast by the coordinator.
                                Err(_) => {}
                            }
                        }
                    }
                }
            }
        });

        AutoSaveHandle { tx, task, bridge }
    }
}

/// Controls a running auto-save task. Dropping the handle stops it.
pub struct AutoSaveHandle {
    tx: watch::Sender<AutoSaveSettings>,
    task: JoinHandle<()>,
    bridge: Arc<PersistenceBridge>,
}

impl AutoSaveHandle {
    pub fn settings(&self) -> AutoSaveSettings {
        *self.tx.borrow()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.update(|s| s.enabled = enabled);
    }

    pub fn set_interval(&self, interval: Duration) {
        self.update(|s| s.interval = clamp_interval(interval));
    }

    fn update(&self, f: impl FnOnce(&mut AutoSaveSettings)) {
        self.tx.send_modify(f);
        let settings = self.settings();
        self.bridge.save_auto_save(settings.enabled, settings.interval);
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}
