//! Periodic re-persistence of the forest while a document is open.
//!
//! [`Autosave::start`] and [`AutosaveHandle::stop`] are the schedule/cancel
//! pair: start it when a session attaches, stop it when the session goes away.
//! A tick saves the whole forest whenever the selection is a document, whether
//! or not anything changed, and does nothing otherwise.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::notebook::Notebook;

/// Interval used when none is configured.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(3);

/// Counters and the most recent failure, for surfacing save problems.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutosaveStatus {
    pub saves: u64,
    pub skipped: u64,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub struct Autosave;

impl Autosave {
    /// Spawn the autosave task. The first tick fires one full `period` after start.
    pub fn start(notebook: Notebook, period: Duration) -> AutosaveHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let status = Arc::new(Mutex::new(AutosaveStatus::default()));

        tracing::debug!("Autosave every {:?}", period);
        let task = tokio::spawn(run(notebook, period, shutdown_rx, Arc::clone(&status)));

        AutosaveHandle {
            shutdown: shutdown_tx,
            task: Some(task),
            status,
        }
    }
}

/// Owner of a running autosave task. Dropping it aborts the task.
pub struct AutosaveHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    status: Arc<Mutex<AutosaveStatus>>,
}

impl AutosaveHandle {
    pub fn status(&self) -> AutosaveStatus {
        self.status.lock().expect("autosave lock poisoned").clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.status().last_error
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the schedule and wait for an in-progress save to finish.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Autosave task ended abnormally: {}", e);
            }
        }
        tracing::debug!("Autosave stopped");
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    notebook: Notebook,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    status: Arc<Mutex<AutosaveStatus>>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !notebook.has_open_document() {
                    status.lock().expect("autosave lock poisoned").skipped += 1;
                    continue;
                }

                let result = notebook.save().await;
                let mut status = status.lock().expect("autosave lock poisoned");
                match result {
                    Ok(()) => {
                        status.saves += 1;
                        status.last_saved_at = Some(Utc::now());
                        status.last_error = None;
                    }
                    Err(e) => {
                        tracing::error!("Autosave failed: {}", e);
                        status.last_error = Some(e.to_string());
                    }
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
