//! Progress monitor for long-running scan tasks.
//!
//! A [`ProgressMonitor`] owns at most one polling session at a time. Each
//! session polls the task-progress endpoint on a fixed period, mirrors running
//! snapshots into the [`Notification`], and stops on the first terminal
//! snapshot. Sessions are numbered by a generation counter; every spawned
//! continuation checks its generation under the state lock before touching
//! anything, so results from a stopped or replaced session are dropped.

mod notification;

pub use notification::{BarPalette, Notification, NotificationView};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::{is_dot_segment, ClientError, ScanClient};
use crate::models::ProgressSnapshot;

/// Default period between progress polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Default delay before a successful completion is hidden.
pub const DEFAULT_AUTO_HIDE: Duration = Duration::from_secs(5);

/// Where snapshots come from.
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn fetch_progress(&self, task_id: &str) -> Result<ProgressSnapshot, ClientError>;
}

#[async_trait]
impl ProgressSource for ScanClient {
    async fn fetch_progress(&self, task_id: &str) -> Result<ProgressSnapshot, ClientError> {
        self.progress(task_id).await
    }
}

/// Callback invoked with a snapshot.
pub type SnapshotCallback = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Task id must not be empty")]
    EmptyTaskId,

    #[error("Task id {0:?} cannot be used in a progress URL")]
    InvalidTaskId(String),

    #[error("Progress monitoring must be started from within a Tokio runtime")]
    NoRuntime,
}

/// Timing and drawing options.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub auto_hide_after: Duration,
    /// Draw the notification on the terminal while visible.
    pub draw: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            auto_hide_after: DEFAULT_AUTO_HIDE,
            draw: true,
        }
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    generation: u64,
    active_task: Option<String>,
    poll_handle: Option<JoinHandle<()>>,
    hide_handle: Option<JoinHandle<()>>,
    notification: Option<Notification>,
}

impl MonitorState {
    /// Abort the poll task and forget the task id. Advances the generation only
    /// if something was active.
    fn stop_session(&mut self) {
        let handle = self.poll_handle.take();
        let task = self.active_task.take();
        if let Some(handle) = &handle {
            handle.abort();
        }
        if handle.is_some() || task.is_some() {
            self.generation += 1;
            debug!(task_id = ?task, "Stopped progress monitoring");
        }
    }

    fn cancel_auto_hide(&mut self) {
        if let Some(handle) = self.hide_handle.take() {
            handle.abort();
        }
    }
}

struct MonitorInner {
    source: Arc<dyn ProgressSource>,
    settings: MonitorSettings,
    state: Mutex<MonitorState>,
}

impl MonitorInner {
    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Render a running snapshot if the session is still current.
    fn apply_progress(&self, generation: u64, snapshot: &ProgressSnapshot) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        if let Some(notification) = state.notification.as_mut() {
            notification.render_progress(snapshot);
        }
        true
    }

    /// End the session on a terminal snapshot if it is still current.
    fn finish(self: &Arc<Self>, generation: u64, snapshot: &ProgressSnapshot) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }

        // Called from the poll task itself, so the handle is dropped rather than aborted.
        state.poll_handle = None;
        let task = state.active_task.take();
        info!(
            task_id = ?task,
            status = %snapshot.status,
            "Task reached terminal state"
        );

        self.render_completion(&mut state, snapshot);
        true
    }

    fn render_completion(self: &Arc<Self>, state: &mut MonitorState, snapshot: &ProgressSnapshot) {
        let Some(notification) = state.notification.as_mut() else {
            return;
        };
        notification.render_completion(snapshot.status);

        state.cancel_auto_hide();
        if snapshot.status.is_success() {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let delay = self.settings.auto_hide_after;
                    let task = auto_hide(Arc::clone(self), state.generation, delay);
                    state.hide_handle = Some(runtime.spawn(task));
                }
                Err(_) => warn!("No runtime available, completion notification stays visible"),
            }
        }
    }
}

/// Polls a task's progress and renders it as a notification.
#[derive(Clone)]
pub struct ProgressMonitor {
    inner: Arc<MonitorInner>,
}

impl std::fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressMonitor")
            .field("settings", &self.inner.settings)
            .field("state", &*self.inner.lock())
            .finish()
    }
}

impl ProgressMonitor {
    pub fn new(source: Arc<dyn ProgressSource>, settings: MonitorSettings) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                source,
                settings,
                state: Mutex::new(MonitorState::default()),
            }),
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.inner.settings
    }

    /// Start polling `task_id`, replacing any session already running.
    ///
    /// `on_update` sees every running snapshot, `on_complete` the terminal one.
    /// Returns the generation of the new session.
    pub fn start_monitoring(
        &self,
        task_id: &str,
        on_update: Option<SnapshotCallback>,
        on_complete: Option<SnapshotCallback>,
    ) -> Result<u64, MonitorError> {
        if task_id.trim().is_empty() {
            return Err(MonitorError::EmptyTaskId);
        }
        if is_dot_segment(task_id) {
            return Err(MonitorError::InvalidTaskId(task_id.to_string()));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;

        let mut state = self.inner.lock();
        if let Some(previous) = state.poll_handle.take() {
            debug!(task_id = ?state.active_task, "Replacing active monitoring session");
            previous.abort();
        }
        state.cancel_auto_hide();

        state.generation += 1;
        let generation = state.generation;
        state.active_task = Some(task_id.to_string());

        let draw = self.inner.settings.draw;
        state
            .notification
            .get_or_insert_with(|| Notification::new(draw));

        let poll = poll_loop(
            Arc::clone(&self.inner),
            generation,
            task_id.to_string(),
            on_update,
            on_complete,
        );
        state.poll_handle = Some(runtime.spawn(poll));

        info!(task_id, generation, "Started monitoring task progress");
        Ok(generation)
    }

    /// Stop polling. Safe to call when idle.
    pub fn stop_monitoring(&self) {
        self.inner.lock().stop_session();
    }

    /// Hide the notification and stop polling. Safe to call at any time.
    pub fn hide(&self) {
        let mut state = self.inner.lock();
        state.cancel_auto_hide();
        if let Some(notification) = state.notification.as_mut() {
            notification.hide();
        }
        state.stop_session();
    }

    /// Render a running snapshot. No-op before the notification exists.
    pub fn update_progress(&self, snapshot: &ProgressSnapshot) {
        if let Some(notification) = self.inner.lock().notification.as_mut() {
            notification.render_progress(snapshot);
        }
    }

    /// Render a terminal snapshot, scheduling auto-hide on success. No-op before
    /// the notification exists.
    pub fn show_completion(&self, snapshot: &ProgressSnapshot) {
        let mut state = self.inner.lock();
        self.inner.render_completion(&mut state, snapshot);
    }

    /// Whether a poll task is alive.
    pub fn is_polling(&self) -> bool {
        self.inner
            .lock()
            .poll_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn active_task_id(&self) -> Option<String> {
        self.inner.lock().active_task.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Snapshot of what the notification shows, if it has been created.
    pub fn notification(&self) -> Option<NotificationView> {
        self.inner
            .lock()
            .notification
            .as_ref()
            .map(|n| n.view().clone())
    }
}

async fn poll_loop(
    inner: Arc<MonitorInner>,
    generation: u64,
    task_id: String,
    on_update: Option<SnapshotCallback>,
    on_complete: Option<SnapshotCallback>,
) {
    let period = inner.settings.poll_interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        // Keep polling through failures: the task may still be progressing server-side.
        let snapshot = match inner.source.fetch_progress(&task_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(task_id = %task_id, "Error polling task progress: {}", e);
                continue;
            }
        };
        debug!(
            task_id = %task_id,
            status = %snapshot.status,
            percent = snapshot.percent,
            "Progress snapshot"
        );

        if snapshot.status.is_running() {
            if !inner.apply_progress(generation, &snapshot) {
                return;
            }
            if let Some(callback) = &on_update {
                callback(&snapshot);
            }
            continue;
        }

        if inner.finish(generation, &snapshot) {
            if let Some(callback) = &on_complete {
                callback(&snapshot);
            }
        }
        return;
    }
}

async fn auto_hide(inner: Arc<MonitorInner>, generation: u64, delay: Duration) {
    tokio::time::sleep(delay).await;

    let mut state = inner.lock();
    if state.generation != generation {
        return;
    }
    // This task's own handle; dropping it detaches.
    state.hide_handle = None;
    if let Some(notification) = state.notification.as_mut() {
        notification.hide();
    }
    state.stop_session();
    debug!(generation, "Auto-hid completed notification");
}
