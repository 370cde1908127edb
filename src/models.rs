use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ClientError;

pub type TaskId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    #[serde(alias = "medium")]
    Normal,
    High,
}

impl Priority {
    /// Display rank used by the priority sort: high first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "wall_clock")]
    pub date_time: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: i64,
    #[serde(default, with = "wall_clock", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl Task {
    pub fn date(&self) -> Option<NaiveDate> {
        self.date_time.map(|dt| dt.date())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

/// Opaque to the client: forwarded to the store on create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Recurrence {
    pub kind: RecurrenceKind,
    pub interval: u32,
}

impl Default for Recurrence {
    fn default() -> Self {
        Self {
            kind: RecurrenceKind::None,
            interval: 1,
        }
    }
}

/// Opaque to the client: forwarded to the store on create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Reminder {
    pub enabled: bool,
    pub minutes_before: u32,
}

impl Default for Reminder {
    fn default() -> Self {
        Self {
            enabled: false,
            minutes_before: 30,
        }
    }
}

/// User input for a new task (or the full content of an edit).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "wall_clock")]
    pub date_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub reminder: Reminder,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.title.trim().is_empty() {
            return Err(ClientError::Validation("title is required".to_string()));
        }
        if self.recurrence.kind != RecurrenceKind::None && self.recurrence.interval == 0 {
            return Err(ClientError::Validation(
                "recurrence interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Wire body for `POST /tasks/`. New tasks are appended at `position`.
    pub fn to_create_body(&self, position: i64) -> CreateTaskBody<'_> {
        let recurring = self.recurrence.kind != RecurrenceKind::None;
        CreateTaskBody {
            title: self.title.trim(),
            description: non_blank(self.description.as_deref()),
            date_time: self.date_time,
            priority: self.priority,
            category: non_blank(self.category.as_deref()),
            status: false,
            position,
            recurrence_type: recurring.then_some(self.recurrence.kind),
            recurrence_interval: recurring.then_some(self.recurrence.interval),
            reminder_enabled: self.reminder.enabled,
            reminder_minutes_before: self
                .reminder
                .enabled
                .then_some(self.reminder.minutes_before),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateTaskBody<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    #[serde(with = "wall_clock")]
    pub date_time: Option<NaiveDateTime>,
    pub priority: Priority,
    pub category: Option<&'a str>,
    pub status: bool,
    pub position: i64,
    pub recurrence_type: Option<RecurrenceKind>,
    pub recurrence_interval: Option<u32>,
    pub reminder_enabled: bool,
    pub reminder_minutes_before: Option<u32>,
}

/// Partial update for `PUT /tasks/{id}`. Unset fields are omitted from the body;
/// `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "wall_clock::serialize_patch"
    )]
    pub date_time: Option<Option<NaiveDateTime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl TaskPatch {
    pub fn status(status: bool) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn position(position: i64) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// The edit form submits every editable field at once.
    pub fn from_draft(draft: &TaskDraft) -> Self {
        Self {
            title: Some(draft.title.trim().to_string()),
            description: Some(non_blank(draft.description.as_deref()).map(str::to_string)),
            date_time: Some(draft.date_time),
            priority: Some(draft.priority),
            category: Some(non_blank(draft.category.as_deref()).map(str::to_string)),
            status: None,
            position: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub struct TaskFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: StatusFilter,
    /// `None` means any priority.
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tag: String,
}

impl TaskFilter {
    pub fn is_active(&self) -> bool {
        !self.search.trim().is_empty()
            || self.status != StatusFilter::All
            || self.priority.is_some()
            || !self.category.trim().is_empty()
            || !self.tag.trim().is_empty()
    }

    pub fn cleared() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Position,
    Date,
    Priority,
    Title,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Position => "position",
            SortMode::Date => "date",
            SortMode::Priority => "priority",
            SortMode::Title => "title",
        }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<TaskId, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    use serde_json::Value;

    match Value::deserialize(deserializer)? {
        Value::String(id) if !id.is_empty() => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(D::Error::custom(format!("invalid task id: {other}"))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Local wall-clock timestamps: `YYYY-MM-DDTHH:MM:SS`, never converted between zones.
pub mod wall_clock {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn format(value: &NaiveDateTime) -> String {
        value.format(FORMAT).to_string()
    }

    /// Accepts second, fractional and minute precision. A zone marker, if the store ever
    /// sends one, is dropped and the clock-face reading kept.
    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_local())
            })
    }

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&format(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn serialize_patch<S>(
        value: &Option<Option<NaiveDateTime>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize(&value.flatten(), serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error as _;

        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid wall-clock timestamp: {raw}"))),
        }
    }
}
