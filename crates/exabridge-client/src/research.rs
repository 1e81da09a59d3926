//! Research task submission and status decoding.
//!
//! `decode_status` is the only place a provider status body becomes a [`TaskSnapshot`]; the
//! poll loop and the one-off status check both go through it.

use exabridge_core::task::TASK_FAILED_WITHOUT_MESSAGE;
use exabridge_core::{
    Error, ResearchBackend, ResearchRequest, Result, SchemaSource, TaskId, TaskResult,
    TaskSnapshot, TaskState, TaskStatus,
};
use serde::{Deserialize, Serialize};

use crate::ExaClient;

const TASKS_PATH: [&str; 3] = ["research", "v0", "tasks"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    instructions: &'a str,
    model: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_results: Option<u32>,
    output: OutputSpec<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputSpec<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    infer_schema: bool,
}

impl<'a> SubmitBody<'a> {
    fn from_request(req: &'a ResearchRequest) -> Self {
        Self {
            instructions: req.query.trim(),
            model: req.model.as_str(),
            num_results: req.num_results,
            output: OutputSpec {
                schema: req.output_schema.as_ref(),
                infer_schema: req.output_schema.is_none(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default, alias = "taskId")]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(default, alias = "taskId")]
    id: Option<String>,
    status: TaskStatus,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    output: Option<OutputEcho>,
    #[serde(default)]
    result: Option<ResultBody>,
    /// Some provider versions put structured output at the top level.
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputEcho {
    #[serde(default)]
    schema: Option<serde_json::Value>,
    #[serde(default)]
    infer_schema: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultBody {
    #[serde(default)]
    report: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Maps one provider status body to a snapshot.
///
/// `completed` without a report or data is a [`Error::MalformedResult`].
pub fn decode_status(requested: &TaskId, body: serde_json::Value) -> Result<TaskSnapshot> {
    let raw: StatusResponse = serde_json::from_value(body)
        .map_err(|e| Error::Decode(format!("research status for {requested}: {e}")))?;

    let task_id = raw
        .id
        .and_then(TaskId::new)
        .unwrap_or_else(|| requested.clone());

    let schema_source = match &raw.output {
        Some(o)
            if o.schema.as_ref().is_some_and(|s| !s.is_null())
                && o.infer_schema != Some(true) =>
        {
            SchemaSource::Custom
        }
        _ => SchemaSource::Inferred,
    };

    let state = match raw.status {
        TaskStatus::Completed => {
            let ResultBody { report, data } = raw.result.unwrap_or_default();
            let result = TaskResult::from_parts(report, data.or(raw.data)).ok_or_else(|| {
                Error::MalformedResult {
                    task_id: task_id.to_string(),
                    message: "task reported completed but carried neither a report nor data"
                        .to_string(),
                }
            })?;
            TaskState::Completed(result)
        }
        TaskStatus::Failed => TaskState::Failed(
            raw.error
                .as_ref()
                .and_then(error_text)
                .unwrap_or_else(|| TASK_FAILED_WITHOUT_MESSAGE.to_string()),
        ),
        other => TaskState::Pending(other),
    };

    Ok(TaskSnapshot {
        task_id,
        state,
        instructions: raw.instructions.filter(|s| !s.trim().is_empty()),
        schema_source,
    })
}

/// Error payloads arrive either as a bare string or as `{ "message": ... }`.
fn error_text(v: &serde_json::Value) -> Option<String> {
    let s = match v {
        serde_json::Value::String(s) => s.as_str(),
        serde_json::Value::Object(m) => m.get("message").and_then(|m| m.as_str())?,
        _ => return None,
    };
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[async_trait::async_trait]
impl ResearchBackend for ExaClient {
    async fn submit(&self, req: &ResearchRequest) -> Result<TaskId> {
        req.validate()?;
        let body = SubmitBody::from_request(req);
        let resp: SubmitResponse = self
            .post_json("research_submit", &TASKS_PATH, &body)
            .await
            .map_err(|e| match e {
                Error::Http { status, message } => Error::Submission {
                    message: format!("HTTP {status}: {message}"),
                    status: Some(status),
                },
                Error::Transport(m) | Error::Decode(m) => Error::Submission {
                    message: m,
                    status: None,
                },
                other => other,
            })?;

        let task_id = resp.id.and_then(TaskId::new).ok_or_else(|| Error::Submission {
            message: "provider response did not include a task id".to_string(),
            status: None,
        })?;
        tracing::info!(task_id = %task_id, model = req.model.as_str(), "research task submitted");
        Ok(task_id)
    }

    async fn status(&self, task_id: &TaskId) -> Result<TaskSnapshot> {
        let [a, b, c] = TASKS_PATH;
        let body: serde_json::Value = self
            .get_json("research_status", &[a, b, c, task_id.as_str()])
            .await?;
        decode_status(task_id, body)
    }
}
