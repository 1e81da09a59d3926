use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::{Error, Result};

/// Message used when the provider reports `failed` without saying why.
pub const TASK_FAILED_WITHOUT_MESSAGE: &str = "research task failed without an error message";

/// Opaque research task identifier assigned by the provider. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Returns `None` for empty or whitespace-only ids. Any other value is kept exactly
    /// as given; the id is opaque and never normalized.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Provider-owned task status, as observed by a status read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    #[serde(alias = "running", alias = "in_progress")]
    Processing,
    Completed,
    Failed,
    /// Any status string we do not recognise. Treated as non-terminal.
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a completed task. Exactly one variant is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Report(String),
    Data(serde_json::Value),
}

impl TaskResult {
    /// Picks the report when present, otherwise the structured data.
    ///
    /// Blank reports and JSON `null` data count as absent; `None` means the provider sent
    /// neither.
    pub fn from_parts(report: Option<String>, data: Option<serde_json::Value>) -> Option<Self> {
        if let Some(r) = report.filter(|r| !r.trim().is_empty()) {
            return Some(Self::Report(r));
        }
        data.filter(|d| !d.is_null()).map(Self::Data)
    }
}

/// Whether the structured output followed a caller-supplied schema or one the provider
/// generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSource {
    Custom,
    #[default]
    Inferred,
}

impl SchemaSource {
    pub fn is_custom(self) -> bool {
        matches!(self, Self::Custom)
    }
}

/// Decoded view of a single status read.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    /// Not terminal yet; carries the raw status for reporting.
    Pending(TaskStatus),
    Completed(TaskResult),
    Failed(String),
}

impl TaskState {
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Pending(s) => *s,
            Self::Completed(_) => TaskStatus::Completed,
            Self::Failed(_) => TaskStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub task_id: TaskId,
    pub state: TaskState,
    /// The originating query, when the provider echoes it back.
    pub instructions: Option<String>,
    pub schema_source: SchemaSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTask {
    pub task_id: TaskId,
    pub result: TaskResult,
    pub schema_source: SchemaSource,
    pub instructions: Option<String>,
}

impl CompletedTask {
    /// Hands the snapshot back unchanged unless it is in the completed state.
    pub fn from_snapshot(snapshot: TaskSnapshot) -> std::result::Result<Self, TaskSnapshot> {
        match snapshot.state {
            TaskState::Completed(result) => Ok(Self {
                task_id: snapshot.task_id,
                result,
                schema_source: snapshot.schema_source,
                instructions: snapshot.instructions,
            }),
            state => Err(TaskSnapshot { state, ..snapshot }),
        }
    }
}

/// Result of waiting on a task. Only transport/contract problems are errors; everything here
/// is a normal outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(CompletedTask),
    Failed {
        task_id: TaskId,
        message: String,
    },
    /// The deadline passed with no terminal status. The task may still finish later.
    TimedOut {
        task_id: TaskId,
        last_status: TaskStatus,
        elapsed: Duration,
        polls: u32,
    },
    Canceled {
        task_id: TaskId,
        polls: u32,
    },
}

impl PollOutcome {
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::Completed(c) => &c.task_id,
            Self::Failed { task_id, .. }
            | Self::TimedOut { task_id, .. }
            | Self::Canceled { task_id, .. } => task_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Canceled { .. } => "canceled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub enum ResearchModel {
    #[default]
    #[serde(rename = "exa-research")]
    ExaResearch,
    #[serde(rename = "exa-research-pro")]
    ExaResearchPro,
}

impl ResearchModel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExaResearch => "exa-research",
            Self::ExaResearchPro => "exa-research-pro",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResearchRequest {
    pub query: String,
    pub model: ResearchModel,
    pub num_results: Option<u32>,
    /// Caller-supplied JSON schema for structured output. `None` lets the provider infer one.
    pub output_schema: Option<serde_json::Value>,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            model: ResearchModel::default(),
            num_results: None,
            output_schema: None,
        }
    }

    pub fn schema_source(&self) -> SchemaSource {
        if self.output_schema.is_some() {
            SchemaSource::Custom
        } else {
            SchemaSource::Inferred
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::InvalidParams(
                "query must be a non-empty string".to_string(),
            ));
        }
        if let Some(n) = self.num_results {
            if !(1..=100).contains(&n) {
                return Err(Error::InvalidParams(format!(
                    "num_results must be between 1 and 100 (got {n})"
                )));
            }
        }
        if let Some(schema) = &self.output_schema {
            if !schema.is_object() {
                return Err(Error::InvalidParams(
                    "output_schema must be a JSON object".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// The two provider operations the poller depends on.
#[async_trait::async_trait]
pub trait ResearchBackend: Send + Sync {
    async fn submit(&self, req: &ResearchRequest) -> Result<TaskId>;

    /// One status read. Implementations must decode every response the same way, so the
    /// poll loop and one-off status checks never disagree.
    async fn status(&self, task_id: &TaskId) -> Result<TaskSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn task_id_rejects_blank_values() {
        assert!(TaskId::new("").is_none());
        assert!(TaskId::new("   ").is_none());
        assert!(TaskId::new("\t\n").is_none());
        // Opaque: surrounding whitespace is part of a provider-assigned id.
        assert_eq!(TaskId::new(" t1 ").unwrap().as_str(), " t1 ");
        assert_ne!(TaskId::new(" t1 "), TaskId::new("t1"));
    }

    #[test]
    fn status_accepts_provider_spellings() {
        let s: TaskStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(s, TaskStatus::Processing);
        let s: TaskStatus = serde_json::from_str("\"completed\"").unwrap();
        assert!(s.is_terminal());
        let s: TaskStatus = serde_json::from_str("\"queued\"").unwrap();
        assert_eq!(s, TaskStatus::Unknown);
        assert!(!s.is_terminal());
    }

    #[test]
    fn report_wins_over_data() {
        let r = TaskResult::from_parts(
            Some("# findings".to_string()),
            Some(serde_json::json!({"a": 1})),
        );
        assert_eq!(r, Some(TaskResult::Report("# findings".to_string())));
    }

    #[test]
    fn blank_report_and_null_data_are_absent() {
        assert_eq!(
            TaskResult::from_parts(Some("  ".to_string()), Some(serde_json::Value::Null)),
            None
        );
        assert_eq!(
            TaskResult::from_parts(Some(String::new()), Some(serde_json::json!([1, 2]))),
            Some(TaskResult::Data(serde_json::json!([1, 2])))
        );
    }

    #[test]
    fn research_request_validation() {
        assert!(ResearchRequest::new("X").validate().is_ok());
        assert!(matches!(
            ResearchRequest::new("  ").validate(),
            Err(Error::InvalidParams(_))
        ));

        let mut req = ResearchRequest::new("X");
        req.num_results = Some(0);
        assert!(req.validate().is_err());

        let mut req = ResearchRequest::new("X");
        req.output_schema = Some(serde_json::json!("not an object"));
        assert!(req.validate().is_err());

        req.output_schema = Some(serde_json::json!({"type": "object"}));
        assert!(req.validate().is_ok());
        assert_eq!(req.schema_source(), SchemaSource::Custom);
    }

    #[test]
    fn completed_task_only_from_completed_snapshot() {
        let snap = TaskSnapshot {
            task_id: TaskId::new("t1").unwrap(),
            state: TaskState::Pending(TaskStatus::Processing),
            instructions: None,
            schema_source: SchemaSource::Inferred,
        };
        let back = CompletedTask::from_snapshot(snap.clone()).unwrap_err();
        assert_eq!(back, snap);

        let done = TaskSnapshot {
            state: TaskState::Completed(TaskResult::Report("r".into())),
            instructions: Some("X".into()),
            ..snap
        };
        let c = CompletedTask::from_snapshot(done).unwrap();
        assert_eq!(c.task_id.as_str(), "t1");
        assert_eq!(c.result, TaskResult::Report("r".into()));
        assert_eq!(c.instructions.as_deref(), Some("X"));
    }

    proptest! {
        #[test]
        fn non_blank_ids_are_kept_verbatim(s in "[ ]{0,2}[A-Za-z0-9_-]{1,40}[ \n]{0,2}") {
            let id = TaskId::new(s.clone()).unwrap();
            prop_assert_eq!(id.as_str(), s.as_str());
        }
    }
}
