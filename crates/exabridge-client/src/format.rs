//! Reshapes provider responses into the text and JSON shapes handed back to tool callers.

use exabridge_core::{
    AnswerResponse, CompletedTask, ContentsResponse, SearchHit, SearchResponse, TaskId,
    TaskResult, TaskStatus,
};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// A rendered tool result: human-facing text plus the machine payload it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub text: String,
    pub payload: Value,
}

/// Renders a completed research task.
///
/// `query` overrides the instructions echoed by the provider; with neither, the report
/// title carries no query and the footer omits the `Query:` line.
pub fn render_completed(task: &CompletedTask, query: Option<&str>) -> Rendered {
    let query = query
        .or(task.instructions.as_deref())
        .map(str::trim)
        .filter(|q| !q.is_empty());

    match &task.result {
        TaskResult::Report(report) => {
            let mut text = match query {
                Some(q) => format!("# Research Report: {q}\n\n"),
                None => "# Research Report\n\n".to_string(),
            };
            text.push_str(report.trim_end());
            text.push_str("\n\n---\n");
            if let Some(q) = query {
                text.push_str(&format!("Query: {q}\n"));
            }
            text.push_str(&format!("Task ID: {}\n", task.task_id));
            Rendered {
                text,
                payload: json!({
                    "format": "report",
                    "task_id": task.task_id,
                    "query": query,
                    "report": report,
                }),
            }
        }
        TaskResult::Data(data) => {
            let doc = json!({
                "taskId": task.task_id,
                "usedCustomSchema": task.schema_source.is_custom(),
                "data": data,
            });
            let text = serde_json::to_string_pretty(&doc).unwrap_or_else(|_| doc.to_string());
            Rendered {
                text,
                payload: json!({
                    "format": "data",
                    "task_id": task.task_id,
                    "query": query,
                    "used_custom_schema": task.schema_source.is_custom(),
                    "data": data,
                }),
            }
        }
    }
}

/// Notice for a wait that ended before the task did. The id lets the caller resume.
pub fn render_timed_out(task_id: &TaskId, last_status: TaskStatus, elapsed: Duration) -> String {
    format!(
        "Research task {task_id} is still {last_status} after {}.\n\
         The task keeps running on the provider side. Call deep_researcher_check with \
         task_id=\"{task_id}\" to fetch the result later.\n",
        human_elapsed(elapsed)
    )
}

/// Whole seconds, or milliseconds below one second so short waits never read as `0s`.
fn human_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{}s", elapsed.as_secs())
    }
}

pub fn render_pending(task_id: &TaskId, status: TaskStatus) -> String {
    format!(
        "Research task {task_id} is {status}.\n\
         Call deep_researcher_check again with task_id=\"{task_id}\" in a few seconds.\n"
    )
}

pub fn render_failed(task_id: &TaskId, message: &str) -> String {
    format!("Research task {task_id} failed: {message}\n")
}

pub fn render_canceled(task_id: &TaskId) -> String {
    format!(
        "Stopped waiting for research task {task_id} (request canceled).\n\
         The task may still finish; call deep_researcher_check with task_id=\"{task_id}\".\n"
    )
}

fn put_opt<T: serde::Serialize>(m: &mut Map<String, Value>, k: &str, v: &Option<T>) {
    if let Some(v) = v {
        m.insert(k.to_string(), json!(v));
    }
}

/// One result, with absent fields omitted rather than null.
pub fn hit(h: &SearchHit) -> Value {
    let mut m = Map::new();
    put_opt(&mut m, "title", &h.title);
    m.insert("url".to_string(), json!(h.url));
    put_opt(&mut m, "published_date", &h.published_date);
    put_opt(&mut m, "author", &h.author);
    put_opt(&mut m, "score", &h.score);
    put_opt(&mut m, "text", &h.text);
    if let Some(hl) = h.highlights.as_ref().filter(|v| !v.is_empty()) {
        m.insert("highlights".to_string(), json!(hl));
    }
    put_opt(&mut m, "summary", &h.summary);
    put_opt(&mut m, "image", &h.image);
    if let Some(sub) = h.subpages.as_ref().filter(|v| !v.is_empty()) {
        m.insert(
            "subpages".to_string(),
            Value::Array(sub.iter().map(hit).collect()),
        );
    }
    put_opt(&mut m, "extras", &h.extras);
    Value::Object(m)
}

pub fn search_results(resp: &SearchResponse) -> Value {
    let mut m = Map::new();
    put_opt(&mut m, "request_id", &resp.request_id);
    put_opt(&mut m, "search_type", &resp.resolved_search_type);
    m.insert("result_count".to_string(), json!(resp.results.len()));
    m.insert(
        "results".to_string(),
        Value::Array(resp.results.iter().map(hit).collect()),
    );
    put_opt(&mut m, "context", &resp.context);
    put_opt(&mut m, "cost_dollars", &resp.cost_dollars);
    Value::Object(m)
}

pub fn contents_results(resp: &ContentsResponse) -> Value {
    let mut m = Map::new();
    put_opt(&mut m, "request_id", &resp.request_id);
    m.insert(
        "results".to_string(),
        Value::Array(resp.results.iter().map(hit).collect()),
    );
    if let Some(statuses) = &resp.statuses {
        let failed: Vec<Value> = statuses
            .iter()
            .filter(|s| s.status != "success")
            .map(|s| json!({ "id": s.id, "status": s.status, "error": s.error }))
            .collect();
        if !failed.is_empty() {
            m.insert("failed".to_string(), Value::Array(failed));
        }
    }
    put_opt(&mut m, "cost_dollars", &resp.cost_dollars);
    Value::Object(m)
}

pub fn answer(resp: &AnswerResponse) -> Value {
    let citations: Vec<Value> = resp
        .citations
        .iter()
        .map(|c| {
            let mut m = Map::new();
            put_opt(&mut m, "title", &c.title);
            m.insert("url".to_string(), json!(c.url));
            put_opt(&mut m, "published_date", &c.published_date);
            put_opt(&mut m, "author", &c.author);
            put_opt(&mut m, "text", &c.text);
            Value::Object(m)
        })
        .collect();
    let mut m = Map::new();
    m.insert("answer".to_string(), resp.answer.clone());
    m.insert("citations".to_string(), Value::Array(citations));
    put_opt(&mut m, "cost_dollars", &resp.cost_dollars);
    Value::Object(m)
}

/// Pretty JSON for the text channel.
pub fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use exabridge_core::SchemaSource;

    fn task(result: TaskResult) -> CompletedTask {
        CompletedTask {
            task_id: TaskId::new("t1").unwrap(),
            result,
            schema_source: SchemaSource::Inferred,
            instructions: None,
        }
    }

    #[test]
    fn report_renders_titled_block_with_traceability_footer() {
        let r = render_completed(&task(TaskResult::Report("Body text.".into())), Some("X"));
        assert!(r.text.starts_with("# Research Report: X\n\n"), "{}", r.text);
        assert!(r.text.contains("Body text."));
        assert!(r.text.contains("Query: X"));
        assert!(r.text.contains("Task ID: t1"));
        assert_eq!(r.payload["format"], "report");
    }

    #[test]
    fn report_without_known_query_omits_query_line() {
        let r = render_completed(&task(TaskResult::Report("Body.".into())), None);
        assert!(r.text.starts_with("# Research Report\n\n"));
        assert!(!r.text.contains("Query:"));
        assert!(r.text.contains("Task ID: t1"));
    }

    #[test]
    fn echoed_instructions_title_the_report() {
        let mut t = task(TaskResult::Report("Body.".into()));
        t.instructions = Some("Echoed".into());
        let r = render_completed(&t, None);
        assert!(r.text.starts_with("# Research Report: Echoed"));
    }

    #[test]
    fn data_renders_json_document_verbatim_without_report_text() {
        let data = json!({"companies": [{"name": "A", "founded": 1999}], "note": null});
        let mut t = task(TaskResult::Data(data.clone()));
        t.schema_source = SchemaSource::Custom;
        let r = render_completed(&t, Some("X"));
        let doc: Value = serde_json::from_str(&r.text).unwrap();
        assert_eq!(doc["taskId"], "t1");
        assert_eq!(doc["usedCustomSchema"], true);
        assert_eq!(doc["data"], data);
        assert!(!r.text.contains("Research Report"));
    }

    #[test]
    fn timed_out_notice_carries_resumable_id() {
        let s = render_timed_out(
            &TaskId::new("t9").unwrap(),
            TaskStatus::Processing,
            Duration::from_secs(120),
        );
        assert!(s.contains("t9"));
        assert!(s.contains("processing after 120s"));
        assert!(s.contains("deep_researcher_check"));
    }

    #[test]
    fn search_results_omit_absent_fields() {
        let resp: SearchResponse = serde_json::from_value(json!({
            "requestId": "r1",
            "resolvedSearchType": "neural",
            "results": [
                { "url": "https://a.example", "title": "A", "text": "alpha", "highlights": [] },
                { "url": "https://b.example", "subpages": [{ "url": "https://b.example/x" }] }
            ],
            "costDollars": { "total": 0.005 }
        }))
        .unwrap();
        let v = search_results(&resp);
        assert_eq!(v["result_count"], 2);
        assert_eq!(v["search_type"], "neural");
        assert_eq!(v["results"][0]["text"], "alpha");
        assert!(v["results"][0].get("highlights").is_none());
        assert!(v["results"][1].get("title").is_none());
        assert_eq!(v["results"][1]["subpages"][0]["url"], "https://b.example/x");
        assert_eq!(v["cost_dollars"]["total"], 0.005);
    }

    #[test]
    fn contents_lists_only_failed_statuses() {
        let resp: ContentsResponse = serde_json::from_value(json!({
            "results": [{ "url": "https://a.example", "text": "a" }],
            "statuses": [
                { "id": "https://a.example", "status": "success" },
                { "id": "https://b.example", "status": "error", "error": { "tag": "CRAWL_NOT_FOUND" } }
            ]
        }))
        .unwrap();
        let v = contents_results(&resp);
        assert_eq!(v["results"].as_array().unwrap().len(), 1);
        assert_eq!(v["failed"][0]["id"], "https://b.example");
    }

    #[test]
    fn answer_keeps_structured_answers() {
        let resp: AnswerResponse = serde_json::from_value(json!({
            "answer": { "capital": "Paris" },
            "citations": [{ "url": "https://fr.example", "title": "France" }]
        }))
        .unwrap();
        let v = answer(&resp);
        assert_eq!(v["answer"]["capital"], "Paris");
        assert_eq!(v["citations"][0]["title"], "France");
    }

    #[test]
    fn notices_name_the_task_and_how_to_resume() {
        let id = TaskId::new("t9").unwrap();
        let s = render_timed_out(&id, TaskStatus::Processing, Duration::from_millis(2_500));
        assert!(s.contains("t9 is still processing after 2s"));
        assert!(s.contains("task_id=\"t9\""));
        assert!(render_pending(&id, TaskStatus::Pending).contains("t9 is pending"));
        assert_eq!(render_failed(&id, "boom"), "Research task t9 failed: boom\n");
        assert!(render_canceled(&id).contains("deep_researcher_check"));
    }

    #[test]
    fn sub_second_waits_report_milliseconds() {
        let id = TaskId::new("t9").unwrap();
        let s = render_timed_out(&id, TaskStatus::Processing, Duration::from_millis(300));
        assert!(s.contains("after 300ms."), "got: {s:?}");
        let s = render_timed_out(&id, TaskStatus::Pending, Duration::from_secs(1));
        assert!(s.contains("after 1s."), "got: {s:?}");
    }
}
