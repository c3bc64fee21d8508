//! Core types for vidgrab

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a job
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Generate a fresh random, strictly positive id
    pub fn generate() -> Self {
        Self(rand::thread_rng().gen_range(1..=i64::MAX))
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<JobId> for i64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for JobId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for JobId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for JobId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Opaque identifier handed out by an identity provider
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Namespace used when no identity is required and none is available
    pub const LOCAL: &'static str = "local";

    /// Create a new UserId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The shared namespace for sessions without a signed-in user
    pub fn local() -> Self {
        Self(Self::LOCAL.to_string())
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Nothing in progress
    #[default]
    Idle,
    /// Link accepted, waiting for the simulated analysis
    Analyzing,
    /// Analysis done, waiting for a format choice and download request
    Ready,
    /// Simulated transfer in progress
    Downloading,
    /// Simulated transfer finished
    Complete,
    /// Failed with error
    Error,
}

impl Status {
    /// Convert integer status code to Status enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => Status::Idle,
            1 => Status::Analyzing,
            2 => Status::Ready,
            3 => Status::Downloading,
            4 => Status::Complete,
            5 => Status::Error,
            _ => Status::Error, // Default to Error for unknown status
        }
    }

    /// Convert Status enum to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            Status::Idle => 0,
            Status::Analyzing => 1,
            Status::Ready => 2,
            Status::Downloading => 3,
            Status::Complete => 4,
            Status::Error => 5,
        }
    }

    /// Lowercase name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Analyzing => "analyzing",
            Status::Ready => "ready",
            Status::Downloading => "downloading",
            Status::Complete => "complete",
            Status::Error => "error",
        }
    }

    /// `complete` and `error` only leave through a reset
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Complete | Status::Error)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a renderer needs to draw the current job
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobState {
    /// Job id (None while idle or after a rejected link)
    pub id: Option<JobId>,
    /// Source link as entered
    pub url: String,
    /// Selected catalog entry
    pub format: Option<String>,
    /// Current status
    pub status: Status,
    /// Progress percentage (0.0 to 100.0)
    pub progress: f32,
    /// Synthetic result locator, only when complete
    pub result_url: Option<String>,
    /// Error message, only when status is error
    pub error: Option<String>,
    /// When the job was created
    pub created_at: Option<DateTime<Utc>>,
    /// Owning user (persisted variant)
    pub user_id: Option<UserId>,
}

impl JobState {
    /// Apply a stored record on top of this state
    pub fn apply_record(&mut self, record: &JobRecord) {
        self.id = Some(record.id);
        self.url = record.url.clone();
        self.format = record.format.clone();
        self.status = record.status;
        self.progress = record.progress;
        self.result_url = record.result_url.clone();
        self.error = record.error.clone();
        self.created_at = Some(record.created_at);
        self.user_id = Some(record.user_id.clone());
    }
}

/// Job document as kept by a [`JobStore`](crate::store::JobStore)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct JobRecord {
    /// Job id
    pub id: JobId,
    /// Owning user (namespace)
    pub user_id: UserId,
    /// Source link
    pub url: String,
    /// Selected catalog entry
    pub format: Option<String>,
    /// Current status
    pub status: Status,
    /// Progress percentage (0.0 to 100.0)
    pub progress: f32,
    /// Synthetic result locator
    pub result_url: Option<String>,
    /// Error message
    pub error: Option<String>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Empty record for a key that has never been written
    pub fn empty(user_id: UserId, id: JobId) -> Self {
        Self {
            id,
            user_id,
            url: String::new(),
            format: None,
            status: Status::Idle,
            progress: 0.0,
            result_url: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Merge a patch: `Some` fields overwrite, `None` fields are kept
    ///
    /// `result_url` and `error` are cleared by `Some(None)`.
    pub fn merge(&mut self, patch: &JobPatch) {
        if let Some(url) = &patch.url {
            self.url = url.clone();
        }
        if let Some(format) = &patch.format {
            self.format = Some(format.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
        if let Some(result_url) = &patch.result_url {
            self.result_url = result_url.clone();
        }
        if let Some(error) = &patch.error {
            self.error = error.clone();
        }
        if let Some(created_at) = patch.created_at {
            self.created_at = created_at;
        }
    }
}

/// Create-or-merge write for one job record
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    /// Source link
    pub url: Option<String>,
    /// Selected catalog entry
    pub format: Option<String>,
    /// Status
    pub status: Option<Status>,
    /// Progress percentage
    pub progress: Option<f32>,
    /// Result locator (`Some(None)` clears it)
    pub result_url: Option<Option<String>>,
    /// Error message (`Some(None)` clears it)
    pub error: Option<Option<String>>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    /// Full initial document for a job that is starting to download
    pub fn from_state(state: &JobState) -> Self {
        Self {
            url: Some(state.url.clone()),
            format: state.format.clone(),
            status: Some(state.status),
            progress: Some(state.progress),
            result_url: Some(state.result_url.clone()),
            error: Some(state.error.clone()),
            created_at: state.created_at,
        }
    }

    /// Progress-only update
    pub fn progress(progress: f32) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Link accepted, analysis started
    Analyzing {
        /// Job ID
        id: JobId,
        /// Source link
        url: String,
    },

    /// Analysis finished
    Ready {
        /// Job ID
        id: JobId,
    },

    /// Format selection changed
    FormatSelected {
        /// Job ID, if a job exists yet
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<JobId>,
        /// Catalog entry id
        format: String,
    },

    /// Progress update
    Downloading {
        /// Job ID
        id: JobId,
        /// Progress percentage (0.0 to 100.0)
        percent: f32,
    },

    /// Simulated download finished
    Complete {
        /// Job ID
        id: JobId,
        /// Synthetic result locator
        #[serde(skip_serializing_if = "Option::is_none")]
        result_url: Option<String>,
    },

    /// Job failed
    Failed {
        /// Job ID, absent when the link was rejected before a job existed
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<JobId>,
        /// Error message
        error: String,
    },

    /// Machine returned to idle
    Reset,
}

impl Event {
    /// Name used as the SSE event type
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Analyzing { .. } => "analyzing",
            Event::Ready { .. } => "ready",
            Event::FormatSelected { .. } => "format_selected",
            Event::Downloading { .. } => "downloading",
            Event::Complete { .. } => "complete",
            Event::Failed { .. } => "failed",
            Event::Reset => "reset",
        }
    }
}

/// Events implied by moving from `prev` to `next`
pub(crate) fn transition_events(prev: &JobState, next: &JobState) -> Vec<Event> {
    let mut events = Vec::new();

    if next.format != prev.format
        && let Some(format) = &next.format
    {
        events.push(Event::FormatSelected {
            id: next.id,
            format: format.clone(),
        });
    }

    let status_changed = next.status != prev.status || next.id != prev.id;

    match next.status {
        Status::Idle => {
            if prev.status != Status::Idle {
                events.push(Event::Reset);
            }
        }
        Status::Analyzing => {
            if status_changed && let Some(id) = next.id {
                events.push(Event::Analyzing {
                    id,
                    url: next.url.clone(),
                });
            }
        }
        Status::Ready => {
            if status_changed && let Some(id) = next.id {
                events.push(Event::Ready { id });
            }
        }
        Status::Downloading => {
            if (status_changed || next.progress != prev.progress)
                && let Some(id) = next.id
            {
                events.push(Event::Downloading {
                    id,
                    percent: next.progress,
                });
            }
        }
        Status::Complete => {
            if status_changed && let Some(id) = next.id {
                events.push(Event::Complete {
                    id,
                    result_url: next.result_url.clone(),
                });
            }
        }
        Status::Error => {
            if status_changed || next.error != prev.error {
                events.push(Event::Failed {
                    id: next.id,
                    error: next.error.clone().unwrap_or_default(),
                });
            }
        }
    }

    events
}
