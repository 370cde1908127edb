use serde::Serialize;

use crate::models::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Failure,
}

/// User-facing popup raised by the board. The host platform decides how to show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
    pub task_id: Option<TaskId>,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Fallback notifier for hosts without a popup surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => log::info!(
                "notice: {} task_id={:?} message={}",
                notice.title,
                notice.task_id,
                notice.message
            ),
            NoticeKind::Failure => log::warn!(
                "notice: {} task_id={:?} message={}",
                notice.title,
                notice.task_id,
                notice.message
            ),
        }
    }
}
