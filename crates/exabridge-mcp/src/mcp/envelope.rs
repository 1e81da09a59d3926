use exabridge_core::Error;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    NotConfigured,
    SubmissionFailed,
    MalformedResult,
    TaskFailed,
    ProviderError,
    TransportError,
    DecodeError,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::NotConfigured => "not_configured",
            Self::SubmissionFailed => "submission_failed",
            Self::MalformedResult => "malformed_result",
            Self::TaskFailed => "task_failed",
            Self::ProviderError => "provider_error",
            Self::TransportError => "transport_error",
            Self::DecodeError => "decode_error",
        }
    }

    /// Retryability when nothing more specific is known (no HTTP status at hand).
    pub(crate) fn retryable(self) -> bool {
        match self {
            Self::TransportError => true,
            // Same input, same answer.
            Self::InvalidParams
            | Self::NotConfigured
            | Self::SubmissionFailed
            | Self::MalformedResult
            | Self::TaskFailed
            | Self::ProviderError
            | Self::DecodeError => false,
        }
    }

    pub(crate) fn for_error(e: &Error) -> Self {
        match e {
            Error::InvalidParams(_) => Self::InvalidParams,
            Error::NotConfigured(_) => Self::NotConfigured,
            Error::Submission { .. } => Self::SubmissionFailed,
            Error::MalformedResult { .. } => Self::MalformedResult,
            Error::Http { .. } => Self::ProviderError,
            Error::Transport(_) => Self::TransportError,
            Error::Decode(_) => Self::DecodeError,
        }
    }
}

fn hint_for(code: ErrorCode, e: &Error) -> String {
    match (code, e.http_status()) {
        (_, Some(401 | 403)) => {
            "The provider rejected the API key. Check EXABRIDGE_EXA_API_KEY (or EXA_API_KEY).".to_string()
        }
        (_, Some(429)) => "The provider is rate-limiting (HTTP 429). Retry later.".to_string(),
        (_, Some(s)) if s >= 500 => format!("The provider returned HTTP {s}. Retry later."),
        (ErrorCode::InvalidParams, _) => "Fix the arguments and call again.".to_string(),
        (ErrorCode::NotConfigured, _) => {
            "Set EXABRIDGE_EXA_API_KEY (or EXA_API_KEY) in the server environment.".to_string()
        }
        (ErrorCode::SubmissionFailed, _) => {
            "No research task was created; it is safe to submit again.".to_string()
        }
        (ErrorCode::MalformedResult, _) => {
            "The task completed without a report or data; resubmit the research request.".to_string()
        }
        (ErrorCode::TransportError, _) => {
            "Network failure talking to the provider. Check connectivity and retry.".to_string()
        }
        (ErrorCode::DecodeError, _) => {
            "The provider response had an unexpected shape. Check EXABRIDGE_EXA_BASE_URL.".to_string()
        }
        (ErrorCode::ProviderError | ErrorCode::TaskFailed, _) => String::new(),
    }
}

pub(crate) fn add_envelope_fields(payload: &mut serde_json::Value, kind: &str, elapsed_ms: u128) {
    payload["schema_version"] = serde_json::json!(super::SCHEMA_VERSION);
    payload["kind"] = serde_json::json!(kind);
    payload["elapsed_ms"] = serde_json::json!(elapsed_ms);
    // Keep `request` present on every payload so clients never branch on missing vs null.
    if payload.get("request").is_none() {
        payload["request"] = serde_json::Value::Null;
    }
}

pub(crate) fn error_obj(
    code: ErrorCode,
    message: impl ToString,
    hint: impl ToString,
) -> serde_json::Value {
    error_obj_retry(code, message, hint, code.retryable())
}

fn error_obj_retry(
    code: ErrorCode,
    message: impl ToString,
    hint: impl ToString,
    retryable: bool,
) -> serde_json::Value {
    #[derive(Serialize)]
    struct ErrorObject {
        code: &'static str,
        message: String,
        hint: String,
        retryable: bool,
    }

    let e = ErrorObject {
        code: code.as_str(),
        message: message.to_string(),
        hint: hint.to_string(),
        retryable,
    };
    serde_json::to_value(e).unwrap_or_else(|_| {
        serde_json::json!({
            "code": code.as_str(),
            "message": message.to_string(),
            "hint": hint.to_string(),
            "retryable": retryable
        })
    })
}

/// Error object for a client error; retryable follows the error's own transience.
pub(crate) fn error_from(e: &Error) -> serde_json::Value {
    let code = ErrorCode::for_error(e);
    error_obj_retry(code, e, hint_for(code, e), e.is_transient())
}

/// Structured content for machines plus one text block for humans.
pub(crate) fn tool_result(payload: serde_json::Value, text: String) -> CallToolResult {
    let mut r = CallToolResult::structured(payload);
    r.content = vec![Content::text(text)];
    r
}

/// Text for a failed call: the error message and its hint, one per line.
pub(crate) fn error_text(payload: &serde_json::Value) -> String {
    let err = &payload["error"];
    let mut s = format!(
        "Error ({}): {}",
        err["code"].as_str().unwrap_or("unknown"),
        err["message"].as_str().unwrap_or("")
    );
    if let Some(h) = err["hint"].as_str().filter(|h| !h.is_empty()) {
        s.push('\n');
        s.push_str(h);
    }
    s
}
