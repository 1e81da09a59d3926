//! Provider-agnostic types for `exabridge`.
//!
//! Nothing in this crate performs IO. The reqwest-backed client, the research task poller
//! and the result formatter live in `exabridge-client`.

pub mod search;
pub mod task;

pub use search::{
    AnswerCitation, AnswerRequest, AnswerResponse, ContentsRequest, ContentsResponse,
    ContentsStatus, ContextOptions, Extras, FindSimilarRequest, HighlightsOptions, Livecrawl,
    SearchCategory, SearchContents, SearchHit, SearchRequest, SearchResponse, SearchType,
    SummaryOptions, TextOptions, Toggle,
};
pub use task::{
    CompletedTask, PollOutcome, ResearchBackend, ResearchModel, ResearchRequest, SchemaSource,
    TaskId, TaskResult, TaskSnapshot, TaskState, TaskStatus,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    /// Research submission failed: no task id came back, or the call itself failed.
    #[error("submission failed: {message}")]
    Submission {
        message: String,
        status: Option<u16>,
    },
    /// The provider reported `completed` without an interpretable result.
    #[error("malformed result for task {task_id}: {message}")]
    MalformedResult { task_id: String, message: String },
    #[error("provider HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl Error {
    /// HTTP status code attached to this error, when the provider answered at all.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Submission { status, .. } => *status,
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the same call unchanged could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Submission { status, .. } => status.is_some_and(status_is_transient),
            Self::Http { status, .. } => status_is_transient(*status),
            Self::InvalidParams(_)
            | Self::NotConfigured(_)
            | Self::MalformedResult { .. }
            | Self::Decode(_) => false,
        }
    }
}

fn status_is_transient(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification_follows_status_codes() {
        assert!(Error::Transport("reset".into()).is_transient());
        assert!(Error::Http {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(Error::Submission {
            message: "rate limited".into(),
            status: Some(429)
        }
        .is_transient());
        assert!(!Error::Submission {
            message: "no task id".into(),
            status: None
        }
        .is_transient());
        assert!(!Error::Http {
            status: 401,
            message: String::new()
        }
        .is_transient());
        assert!(!Error::MalformedResult {
            task_id: "t1".into(),
            message: "empty".into()
        }
        .is_transient());
    }

    #[test]
    fn http_status_is_exposed_for_provider_errors_only() {
        assert_eq!(
            Error::Http {
                status: 404,
                message: "missing".into()
            }
            .http_status(),
            Some(404)
        );
        assert_eq!(Error::Decode("bad json".into()).http_status(), None);
    }
}
