//! Persistent on-screen progress notification.
//!
//! The notification keeps a plain view model of what it shows (title, bar
//! width, percent label, palette, log lines) and mirrors it to an `indicatif`
//! bar on stderr while visible. Hiding clears the bar from the terminal; the
//! view model stays so the same notification is reused by the next session.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::models::{ProgressSnapshot, TaskStatus};

const DEFAULT_TITLE: &str = "Processing...";

/// Bar color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarPalette {
    Running,
    Success,
    Failure,
}

impl BarPalette {
    /// Web color of the bar.
    pub fn hex(self) -> &'static str {
        match self {
            BarPalette::Running => "#4a90e2",
            BarPalette::Success => "#28a745",
            BarPalette::Failure => "#dc3545",
        }
    }

    fn term_color(self) -> &'static str {
        match self {
            BarPalette::Running => "blue",
            BarPalette::Success => "green",
            BarPalette::Failure => "red",
        }
    }
}

/// What the notification currently displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationView {
    pub visible: bool,
    pub title: String,
    /// Bar fill, e.g. `"42%"`.
    pub bar_width: String,
    /// Text next to the bar, e.g. `"42%"`.
    pub percent_label: String,
    pub palette: BarPalette,
    /// Rendered log lines, latest full set.
    pub log: Vec<String>,
}

impl Default for NotificationView {
    fn default() -> Self {
        Self {
            visible: false,
            title: DEFAULT_TITLE.to_string(),
            bar_width: "0%".to_string(),
            percent_label: "0%".to_string(),
            palette: BarPalette::Running,
            log: Vec::new(),
        }
    }
}

/// The notification element. Created hidden.
pub struct Notification {
    view: NotificationView,
    position: u64,
    draw: bool,
    bar: Option<ProgressBar>,
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("view", &self.view)
            .field("draw", &self.draw)
            .field("drawn", &self.bar.is_some())
            .finish()
    }
}

impl Notification {
    /// `draw` selects whether a terminal bar is drawn while visible.
    pub fn new(draw: bool) -> Self {
        Self {
            view: NotificationView::default(),
            position: 0,
            draw,
            bar: None,
        }
    }

    pub fn view(&self) -> &NotificationView {
        &self.view
    }

    pub fn is_visible(&self) -> bool {
        self.view.visible
    }

    pub fn show(&mut self) {
        if self.view.visible {
            return;
        }
        self.view.visible = true;
        if self.draw {
            let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stderr());
            self.bar = Some(bar);
        }
        self.redraw();
    }

    /// Hide without forgetting what was displayed.
    pub fn hide(&mut self) {
        self.view.visible = false;
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    /// Show a running snapshot: phase label, percent, and the full log.
    pub fn render_progress(&mut self, snapshot: &ProgressSnapshot) {
        let percent = format!("{}%", snapshot.percent);
        self.view.title = snapshot.description.clone();
        self.view.bar_width = percent.clone();
        self.view.percent_label = percent;
        self.view.palette = BarPalette::Running;
        self.position = u64::from(snapshot.percent);

        if !snapshot.messages.is_empty() {
            self.view.log = snapshot
                .messages
                .iter()
                .map(|m| format!("• {}", m.message))
                .collect();
        }

        self.show();
        self.redraw();
    }

    /// Show the terminal state of a task. The bar is forced full.
    pub fn render_completion(&mut self, status: TaskStatus) {
        let success = status.is_success();
        self.view.title = if success {
            "✅ Completed".to_string()
        } else {
            "❌ Failed".to_string()
        };
        self.view.bar_width = "100%".to_string();
        self.view.palette = if success {
            BarPalette::Success
        } else {
            BarPalette::Failure
        };
        self.position = 100;

        self.show();
        self.redraw();
    }

    fn redraw(&self) {
        let Some(bar) = &self.bar else {
            return;
        };

        let template = format!(
            "{{prefix:.bold}} [{{bar:30.{}}}] {{msg}}",
            self.view.palette.term_color()
        );
        let style = ProgressStyle::with_template(&template)
            .map(|s| s.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_prefix(self.view.title.clone());
        bar.set_position(self.position);

        let mut message = self.view.percent_label.clone();
        for line in &self.view.log {
            message.push('\n');
            message.push_str(line);
        }
        bar.set_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_notification_is_hidden() {
        let notification = Notification::new(false);
        assert!(!notification.is_visible());
        assert_eq!(notification.view().title, DEFAULT_TITLE);
    }

    #[test]
    fn test_render_progress() {
        let mut notification = Notification::new(false);
        let snapshot = ProgressSnapshot::new(TaskStatus::Running, 42, "Escaneando página 3")
            .with_messages(["Página 1 lista", "Página 2 lista"]);

        notification.render_progress(&snapshot);

        let view = notification.view();
        assert!(view.visible);
        assert_eq!(view.title, "Escaneando página 3");
        assert_eq!(view.percent_label, "42%");
        assert_eq!(view.bar_width, "42%");
        assert_eq!(view.log, vec!["• Página 1 lista", "• Página 2 lista"]);
    }

    #[test]
    fn test_log_replaced_not_appended() {
        let mut notification = Notification::new(false);
        notification.render_progress(
            &ProgressSnapshot::new(TaskStatus::Running, 10, "a").with_messages(["one", "two"]),
        );
        notification.render_progress(
            &ProgressSnapshot::new(TaskStatus::Running, 20, "b").with_messages(["three"]),
        );
        assert_eq!(notification.view().log, vec!["• three"]);
    }

    #[test]
    fn test_empty_messages_keep_previous_log() {
        let mut notification = Notification::new(false);
        notification.render_progress(
            &ProgressSnapshot::new(TaskStatus::Running, 10, "a").with_messages(["one"]),
        );
        notification.render_progress(&ProgressSnapshot::new(TaskStatus::Running, 30, "b"));
        assert_eq!(notification.view().log, vec!["• one"]);
        assert_eq!(notification.view().percent_label, "30%");
    }

    #[test]
    fn test_completion_palettes() {
        let mut notification = Notification::new(false);
        notification.render_completion(TaskStatus::Completed);
        assert_eq!(notification.view().palette, BarPalette::Success);
        assert_eq!(notification.view().bar_width, "100%");
        assert!(notification.view().title.starts_with('✅'));

        notification.render_completion(TaskStatus::Failed);
        assert_eq!(notification.view().palette, BarPalette::Failure);
        assert_eq!(notification.view().palette.hex(), "#dc3545");
        assert!(notification.view().title.starts_with('❌'));
    }

    #[test]
    fn test_hide_keeps_view() {
        let mut notification = Notification::new(false);
        notification.render_progress(&ProgressSnapshot::new(TaskStatus::Running, 55, "x"));
        notification.hide();
        assert!(!notification.is_visible());
        assert_eq!(notification.view().percent_label, "55%");
    }
}
