//! Progress snapshots reported by the task-progress endpoint.

use serde::{Deserialize, Deserializer};

/// Lifecycle state of a server-side task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
    /// Any status string the client does not recognise. Treated as terminal.
    Unknown,
}

impl TaskStatus {
    pub fn is_running(self) -> bool {
        self == TaskStatus::Running
    }

    /// Everything except `running` ends the session.
    pub fn is_terminal(self) -> bool {
        !self.is_running()
    }

    pub fn is_success(self) -> bool {
        self == TaskStatus::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Unknown => "unknown",
        }
    }
}

impl From<String> for TaskStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "running" => TaskStatus::Running,
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            _ => TaskStatus::Unknown,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the task's log.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogEntry {
    pub message: String,
    /// Server timestamp, passed through as sent.
    #[serde(default)]
    pub time: Option<String>,
}

/// One progress report for a task at a point in time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressSnapshot {
    pub status: TaskStatus,
    /// Percent complete, rounded and clamped into 0..=100.
    #[serde(default, deserialize_with = "deserialize_percent")]
    pub percent: u8,
    /// Label for the current phase.
    #[serde(default)]
    pub description: String,
    /// Latest log lines. Always the full set the server chose to send.
    #[serde(default)]
    pub messages: Vec<LogEntry>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub current_step: Option<u64>,
    #[serde(default)]
    pub total_steps: Option<u64>,
    /// Seconds since the task started.
    #[serde(default)]
    pub elapsed_time: Option<f64>,
}

impl ProgressSnapshot {
    /// Build a snapshot without going through JSON.
    pub fn new(status: TaskStatus, percent: u8, description: impl Into<String>) -> Self {
        Self {
            status,
            percent: percent.min(100),
            description: description.into(),
            messages: Vec::new(),
            task_id: None,
            current_step: None,
            total_steps: None,
            elapsed_time: None,
        }
    }

    pub fn with_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.messages = messages
            .into_iter()
            .map(|m| LogEntry {
                message: m.into(),
                time: None,
            })
            .collect();
        self
    }
}

/// Round a raw percentage to the nearest integer inside 0..=100.
pub fn clamp_percent(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

// The backend sends `round(step / total * 100, 1)`, so fractional values are normal.
fn deserialize_percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.map(clamp_percent).unwrap_or(0))
}
