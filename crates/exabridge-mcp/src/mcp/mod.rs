//! MCP stdio server: one tool per provider capability, every result wrapped in the same
//! JSON envelope.

use exabridge_client::format;
use exabridge_client::poller::{validate_policy, PollPolicy, TaskPoller};
use exabridge_client::ExaClient;
use exabridge_core::{
    AnswerRequest, AnswerResponse, CompletedTask, ContentsRequest, Error, FindSimilarRequest,
    Livecrawl, PollOutcome, ResearchRequest, Result as ExaResult, SearchCategory,
    SearchContents, SearchRequest, SearchResponse, SearchType, TaskId, TaskState,
};
use rmcp::{
    handler::server::router::tool::ToolRouter as RmcpToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    service::{RequestContext, RoleServer},
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, ServiceExt,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::settings::Settings;

mod args;
mod envelope;
use args::*;
use envelope::*;

pub(crate) const SCHEMA_VERSION: u64 = 1;

const DEFAULT_NUM_RESULTS: u32 = 5;
const DEFAULT_COMPETITOR_RESULTS: u32 = 10;
const DEFAULT_MAX_CHARACTERS: u32 = 3000;
const MAX_RESEARCH_DEADLINE_MS: u64 = 600_000;
const MIN_POLL_INTERVAL_MS: u64 = 100;

fn finish(kind: &str, t0: Instant, mut payload: Value, text: String) -> CallToolResult {
    add_envelope_fields(&mut payload, kind, t0.elapsed().as_millis());
    tool_result(payload, text)
}

fn fail(kind: &str, t0: Instant, mut payload: Value, error: Value) -> CallToolResult {
    payload["ok"] = json!(false);
    payload["error"] = error;
    let text = error_text(&payload);
    finish(kind, t0, payload, text)
}

fn task_failed(message: &str) -> Value {
    error_obj(
        ErrorCode::TaskFailed,
        message,
        "The provider gave up on this task; submit a new one.",
    )
}

fn required(field: &str, v: Option<String>) -> ExaResult<String> {
    v.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidParams(format!("{field} must be a non-empty string")))
}

fn capped_text(max_characters: Option<u32>) -> SearchContents {
    SearchContents::text_capped(max_characters.unwrap_or(DEFAULT_MAX_CHARACTERS))
}

fn web_search_request(args: WebSearchArgs) -> SearchRequest {
    let mut contents = capped_text(args.max_characters);
    contents.livecrawl = Some(args.livecrawl.unwrap_or(Livecrawl::Fallback));
    SearchRequest {
        query: args.query.unwrap_or_default(),
        search_type: Some(args.search_type.unwrap_or(SearchType::Auto)),
        num_results: Some(args.num_results.unwrap_or(DEFAULT_NUM_RESULTS)),
        contents: Some(contents),
        ..SearchRequest::default()
    }
}

fn exa_search_request(args: ExaSearchArgs) -> SearchRequest {
    let mut contents = SearchContents {
        text: args.text,
        highlights: args.highlights,
        summary: args.summary,
        context: args.context,
        livecrawl: args.livecrawl,
        livecrawl_timeout: args.livecrawl_timeout_ms,
        subpages: args.subpages,
        subpage_target: args.subpage_target,
        extras: args.extras,
    };
    // Without any content option the provider returns bare links.
    if contents == SearchContents::default() {
        contents = capped_text(None);
    }
    SearchRequest {
        query: args.query.unwrap_or_default(),
        search_type: args.search_type,
        num_results: args.num_results,
        category: args.category,
        include_domains: args.include_domains.unwrap_or_default(),
        exclude_domains: args.exclude_domains.unwrap_or_default(),
        start_published_date: args.start_published_date,
        end_published_date: args.end_published_date,
        start_crawl_date: args.start_crawl_date,
        end_crawl_date: args.end_crawl_date,
        include_text: args.include_text.unwrap_or_default(),
        exclude_text: args.exclude_text.unwrap_or_default(),
        user_location: args.user_location,
        contents: Some(contents),
    }
}

fn scoped_search_request(
    args: ScopedSearchArgs,
    category: Option<SearchCategory>,
    domain: Option<&str>,
) -> SearchRequest {
    SearchRequest {
        query: args.query.unwrap_or_default(),
        num_results: Some(args.num_results.unwrap_or(DEFAULT_NUM_RESULTS)),
        category,
        include_domains: domain.map(|d| vec![d.to_string()]).unwrap_or_default(),
        contents: Some(capped_text(args.max_characters)),
        ..SearchRequest::default()
    }
}

fn company_research_request(args: CompanyResearchArgs) -> ExaResult<SearchRequest> {
    let name = required("company_name", args.company_name)?;
    Ok(SearchRequest {
        query: format!("{name} company"),
        num_results: Some(args.num_results.unwrap_or(DEFAULT_NUM_RESULTS)),
        category: Some(SearchCategory::Company),
        contents: Some(capped_text(None)),
        ..SearchRequest::default()
    })
}

fn competitor_request(args: CompetitorFinderArgs) -> ExaResult<SearchRequest> {
    let name = required("company_name", args.company_name)?;
    let description = required("description", args.description)?;
    let mut exclude_domains = Vec::new();
    if let Some(raw) = args.company_url.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let parsed = url::Url::parse(raw)
            .map_err(|e| Error::InvalidParams(format!("invalid company_url {raw:?}: {e}")))?;
        let host = parsed.host_str().ok_or_else(|| {
            Error::InvalidParams(format!("company_url {raw:?} has no host"))
        })?;
        exclude_domains.push(host.trim_start_matches("www.").to_string());
    }
    Ok(SearchRequest {
        query: format!("companies like {name}: {description}"),
        num_results: Some(args.num_results.unwrap_or(DEFAULT_COMPETITOR_RESULTS)),
        category: Some(SearchCategory::Company),
        exclude_domains,
        contents: Some(capped_text(None)),
        ..SearchRequest::default()
    })
}

fn crawling_request(args: CrawlingArgs) -> ExaResult<ContentsRequest> {
    let url = required("url", args.url)?;
    let mut contents = capped_text(args.max_characters);
    contents.livecrawl = Some(args.livecrawl.unwrap_or(Livecrawl::Preferred));
    Ok(ContentsRequest {
        urls: vec![url],
        contents,
    })
}

fn find_similar_request(args: FindSimilarArgs) -> ExaResult<FindSimilarRequest> {
    Ok(FindSimilarRequest {
        url: required("url", args.url)?,
        num_results: Some(args.num_results.unwrap_or(DEFAULT_NUM_RESULTS)),
        exclude_source_domain: Some(args.exclude_source_domain.unwrap_or(true)),
        contents: Some(capped_text(args.max_characters)),
        ..FindSimilarRequest::default()
    })
}

fn research_request(
    query: Option<String>,
    model: Option<exabridge_core::ResearchModel>,
    num_results: Option<u32>,
    output_schema: Option<Value>,
) -> ExaResult<ResearchRequest> {
    let mut req = ResearchRequest::new(query.unwrap_or_default().trim());
    req.model = model.unwrap_or_default();
    req.num_results = num_results;
    req.output_schema = output_schema.filter(|s| !s.is_null());
    req.validate()?;
    Ok(req)
}

/// Per-call overrides on top of the server's poll policy.
fn research_policy(
    base: PollPolicy,
    deadline_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
) -> ExaResult<PollPolicy> {
    let mut policy = base;
    if let Some(ms) = deadline_ms {
        if ms > MAX_RESEARCH_DEADLINE_MS {
            return Err(Error::InvalidParams(format!(
                "deadline_ms must be at most {MAX_RESEARCH_DEADLINE_MS} (got {ms})"
            )));
        }
        policy.deadline = Duration::from_millis(ms);
    }
    if let Some(ms) = poll_interval_ms {
        if ms < MIN_POLL_INTERVAL_MS {
            return Err(Error::InvalidParams(format!(
                "poll_interval_ms must be at least {MIN_POLL_INTERVAL_MS} (got {ms})"
            )));
        }
        policy.interval = Duration::from_millis(ms);
    }
    validate_policy(&policy)?;
    Ok(policy)
}

fn answer_text(resp: &AnswerResponse) -> String {
    let mut s = match &resp.answer {
        Value::String(a) => a.trim().to_string(),
        other => format::pretty(other),
    };
    if !resp.citations.is_empty() {
        s.push_str("\n\nSources:\n");
        for c in &resp.citations {
            match c.title.as_deref().filter(|t| !t.trim().is_empty()) {
                Some(t) => s.push_str(&format!("- {t} <{}>\n", c.url)),
                None => s.push_str(&format!("- <{}>\n", c.url)),
            }
        }
    }
    s
}

#[derive(Clone)]
pub(crate) struct ExaBridgeMcp {
    tool_router: RmcpToolRouter<Self>,
    exa: Option<ExaClient>,
    settings: Arc<Settings>,
}

#[tool_router]
impl ExaBridgeMcp {
    pub(crate) fn new(settings: Settings) -> Result<Self, McpError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("exabridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let exa = settings
            .exa_client(http)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        if exa.is_none() {
            tracing::warn!("no Exa API key configured; provider tools will answer not_configured");
        }
        let mut tool_router = Self::tool_router();
        for name in settings.tools.disabled() {
            tool_router.remove_route(name);
        }
        Ok(Self {
            tool_router,
            exa,
            settings: Arc::new(settings),
        })
    }

    fn exa(&self) -> ExaResult<&ExaClient> {
        self.exa.as_ref().ok_or_else(|| {
            Error::NotConfigured("missing EXABRIDGE_EXA_API_KEY (or EXA_API_KEY)".to_string())
        })
    }

    fn poller(&self, policy: PollPolicy) -> ExaResult<TaskPoller<ExaClient>> {
        Ok(TaskPoller::new(self.exa()?.clone(), policy))
    }

    async fn search_tool(
        &self,
        kind: &'static str,
        t0: Instant,
        req: ExaResult<SearchRequest>,
    ) -> CallToolResult {
        tracing::debug!(tool = kind, "tool call");
        let req = match req {
            Ok(r) => r,
            Err(e) => return fail(kind, t0, json!({}), error_from(&e)),
        };
        let request = serde_json::to_value(&req).unwrap_or(Value::Null);
        let res: ExaResult<SearchResponse> = async {
            req.validate()?;
            self.exa()?.search(&req).await
        }
        .await;
        match res {
            Ok(resp) => {
                let mut payload = format::search_results(&resp);
                let text = format::pretty(&payload);
                payload["ok"] = json!(true);
                payload["request"] = request;
                finish(kind, t0, payload, text)
            }
            Err(e) => fail(kind, t0, json!({ "request": request }), error_from(&e)),
        }
    }

    #[tool(description = "Report exabridge configuration, enabled tools and version (no secrets)")]
    async fn exabridge_meta(
        &self,
        _params: Parameters<Option<MetaArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let t0 = Instant::now();
        let s = &self.settings;
        let payload = json!({
            "ok": true,
            "name": "exabridge",
            "version": env!("CARGO_PKG_VERSION"),
            "configured": {
                // Presence only, never the value.
                "exa_api_key": s.api_key.is_some(),
                "base_url_overridden": s.base_url != exabridge_client::DEFAULT_BASE_URL,
            },
            "tools": {
                "enabled": s.tools.enabled(),
                "disabled": s.tools.disabled(),
                "unknown": s.tools.unknown(),
            },
            "request_timeout_ms": s.request_timeout.as_millis(),
            "research": {
                "poll_interval_ms": s.poll.interval.as_millis(),
                "deadline_ms": s.poll.deadline.as_millis(),
                "max_transient_failures": s.poll.max_transient_failures,
            },
        });
        let text = format::pretty(&payload);
        Ok(finish("exabridge_meta", t0, payload, text))
    }

    #[tool(
        description = "Search the web with Exa and return page text for each result. Args: query, num_results (default 5), search_type, livecrawl, max_characters (default 3000)."
    )]
    async fn web_search_exa(
        &self,
        params: Parameters<Option<WebSearchArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        Ok(self
            .search_tool("web_search_exa", t0, Ok(web_search_request(args)))
            .await)
    }

    #[tool(
        description = "Exa search with the full option set: category, domain/date/text filters, and text/highlights/summary/context options (each true/false or an options object)."
    )]
    async fn exa_search(
        &self,
        params: Parameters<Option<ExaSearchArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        Ok(self
            .search_tool("exa_search", t0, Ok(exa_search_request(args)))
            .await)
    }

    #[tool(description = "Search academic papers and research publications via Exa")]
    async fn research_paper_search_exa(
        &self,
        params: Parameters<Option<ScopedSearchArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        let req = scoped_search_request(args, Some(SearchCategory::ResearchPaper), None);
        Ok(self.search_tool("research_paper_search_exa", t0, Ok(req)).await)
    }

    #[tool(description = "Research a company by name: websites, news and profile pages via Exa")]
    async fn company_research_exa(
        &self,
        params: Parameters<Option<CompanyResearchArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        Ok(self
            .search_tool("company_research_exa", t0, company_research_request(args))
            .await)
    }

    #[tool(description = "Search LinkedIn profiles and company pages via Exa")]
    async fn linkedin_search_exa(
        &self,
        params: Parameters<Option<ScopedSearchArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        let req = scoped_search_request(args, None, Some("linkedin.com"));
        Ok(self.search_tool("linkedin_search_exa", t0, Ok(req)).await)
    }

    #[tool(description = "Search Wikipedia articles via Exa")]
    async fn wikipedia_search_exa(
        &self,
        params: Parameters<Option<ScopedSearchArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        let req = scoped_search_request(args, None, Some("wikipedia.org"));
        Ok(self.search_tool("wikipedia_search_exa", t0, Ok(req)).await)
    }

    #[tool(description = "Search GitHub repositories, issues and code pages via Exa")]
    async fn github_search_exa(
        &self,
        params: Parameters<Option<ScopedSearchArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        let req = scoped_search_request(args, None, Some("github.com"));
        Ok(self.search_tool("github_search_exa", t0, Ok(req)).await)
    }

    #[tool(
        description = "Find competitors of a company from its name and a one-line description; the company's own domain is excluded when company_url is given."
    )]
    async fn competitor_finder_exa(
        &self,
        params: Parameters<Option<CompetitorFinderArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        Ok(self
            .search_tool("competitor_finder_exa", t0, competitor_request(args))
            .await)
    }

    #[tool(description = "Read the text of one URL via Exa contents (live crawl preferred)")]
    async fn crawling_exa(
        &self,
        params: Parameters<Option<CrawlingArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let kind = "crawling_exa";
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        let req = match crawling_request(args) {
            Ok(r) => r,
            Err(e) => return Ok(fail(kind, t0, json!({}), error_from(&e))),
        };
        let request = serde_json::to_value(&req).unwrap_or(Value::Null);
        let res: ExaResult<_> = async {
            req.validate()?;
            self.exa()?.contents(&req).await
        }
        .await;
        Ok(match res {
            Ok(resp) => {
                let mut payload = format::contents_results(&resp);
                let text = match resp.results.first().and_then(|h| h.text.as_deref()) {
                    Some(body) if resp.results.len() == 1 => body.to_string(),
                    _ => format::pretty(&payload),
                };
                payload["ok"] = json!(true);
                payload["request"] = request;
                finish(kind, t0, payload, text)
            }
            Err(e) => fail(kind, t0, json!({ "request": request }), error_from(&e)),
        })
    }

    #[tool(description = "Find pages similar to a URL via Exa")]
    async fn find_similar_exa(
        &self,
        params: Parameters<Option<FindSimilarArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let kind = "find_similar_exa";
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        let req = match find_similar_request(args) {
            Ok(r) => r,
            Err(e) => return Ok(fail(kind, t0, json!({}), error_from(&e))),
        };
        let request = serde_json::to_value(&req).unwrap_or(Value::Null);
        let res: ExaResult<_> = async {
            req.validate()?;
            self.exa()?.find_similar(&req).await
        }
        .await;
        Ok(match res {
            Ok(resp) => {
                let mut payload = format::search_results(&resp);
                let text = format::pretty(&payload);
                payload["ok"] = json!(true);
                payload["request"] = request;
                finish(kind, t0, payload, text)
            }
            Err(e) => fail(kind, t0, json!({ "request": request }), error_from(&e)),
        })
    }

    #[tool(description = "Answer a question with Exa, citing the sources used")]
    async fn answer_exa(
        &self,
        params: Parameters<Option<AnswerArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let kind = "answer_exa";
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        let req = AnswerRequest {
            query: args.query.unwrap_or_default(),
            text: Some(args.include_text.unwrap_or(false)),
        };
        let request = serde_json::to_value(&req).unwrap_or(Value::Null);
        let res: ExaResult<_> = async {
            req.validate()?;
            self.exa()?.answer(&req).await
        }
        .await;
        Ok(match res {
            Ok(resp) => {
                let mut payload = format::answer(&resp);
                payload["ok"] = json!(true);
                payload["request"] = request;
                finish(kind, t0, payload, answer_text(&resp))
            }
            Err(e) => fail(kind, t0, json!({ "request": request }), error_from(&e)),
        })
    }

    #[tool(
        description = "Start an Exa deep research task and return its task_id immediately. Poll with deep_researcher_check. Pass output_schema for structured data instead of a report."
    )]
    async fn deep_researcher_start(
        &self,
        params: Parameters<Option<ResearchStartArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let kind = "deep_researcher_start";
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        let res = async {
            let req = research_request(args.query, args.model, args.num_results, args.output_schema)?;
            let task_id = self.poller(self.settings.poll)?.submit(&req).await?;
            Ok::<_, Error>((req, task_id))
        }
        .await;
        Ok(match res {
            Ok((req, task_id)) => {
                let payload = json!({
                    "ok": true,
                    "task_id": task_id,
                    "status": "pending",
                    "request": {
                        "query": req.query,
                        "model": req.model.as_str(),
                        "num_results": req.num_results,
                        "used_custom_schema": req.schema_source().is_custom(),
                    },
                });
                let text = format!(
                    "Research task started.\nTask ID: {task_id}\n\
                     Call deep_researcher_check with task_id=\"{task_id}\" until it completes.\n"
                );
                finish(kind, t0, payload, text)
            }
            Err(e) => fail(kind, t0, json!({}), error_from(&e)),
        })
    }

    #[tool(
        description = "Check a deep research task once. Returns the report (or structured data) when completed, otherwise the current status."
    )]
    async fn deep_researcher_check(
        &self,
        params: Parameters<Option<ResearchCheckArgs>>,
    ) -> Result<CallToolResult, McpError> {
        let kind = "deep_researcher_check";
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();
        // Callers often paste ids with stray whitespace; the id itself stays opaque.
        let task_id = match args
            .task_id
            .and_then(|raw| TaskId::new(raw.trim()))
            .ok_or_else(|| Error::InvalidParams("task_id must be a non-empty string".into()))
        {
            Ok(id) => id,
            Err(e) => return Ok(fail(kind, t0, json!({}), error_from(&e))),
        };
        let res: ExaResult<_> = async {
            let snap = self.poller(self.settings.poll)?.check(&task_id).await?;
            Ok(snap)
        }
        .await;
        let snap = match res {
            Ok(s) => s,
            Err(e) => {
                return Ok(fail(
                    kind,
                    t0,
                    json!({ "task_id": task_id }),
                    error_from(&e),
                ))
            }
        };
        let status = snap.state.status();
        let snap = match CompletedTask::from_snapshot(snap) {
            Ok(task) => {
                let rendered = format::render_completed(&task, None);
                let payload = json!({
                    "ok": true,
                    "task_id": task.task_id,
                    "status": status.as_str(),
                    "done": true,
                    "result": rendered.payload,
                });
                return Ok(finish(kind, t0, payload, rendered.text));
            }
            Err(snap) => snap,
        };
        let task_id = snap.task_id;
        Ok(match snap.state {
            TaskState::Failed(message) => {
                let payload = json!({
                    "ok": false,
                    "task_id": task_id,
                    "status": status.as_str(),
                    "done": true,
                    "error": task_failed(&message),
                });
                finish(kind, t0, payload, format::render_failed(&task_id, &message))
            }
            _ => {
                let payload = json!({
                    "ok": true,
                    "task_id": task_id,
                    "status": status.as_str(),
                    "done": false,
                });
                finish(kind, t0, payload, format::render_pending(&task_id, status))
            }
        })
    }

    #[tool(
        description = "Run Exa deep research and wait for the result (bounded by deadline_ms). Returns a report, or structured data when output_schema is given. On timeout the task keeps running; resume with deep_researcher_check."
    )]
    async fn deep_research_exa(
        &self,
        params: Parameters<Option<DeepResearchArgs>>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let kind = "deep_research_exa";
        let t0 = Instant::now();
        let args = params.0.unwrap_or_default();

        let setup = research_request(args.query, args.model, args.num_results, args.output_schema)
            .and_then(|req| {
                let policy =
                    research_policy(self.settings.poll, args.deadline_ms, args.poll_interval_ms)?;
                Ok((req, self.poller(policy)?))
            });
        let (req, poller) = match setup {
            Ok(v) => v,
            Err(e) => return Ok(fail(kind, t0, json!({}), error_from(&e))),
        };
        let policy = poller.policy();
        let request = json!({
            "query": req.query,
            "model": req.model.as_str(),
            "num_results": req.num_results,
            "used_custom_schema": req.schema_source().is_custom(),
            "deadline_ms": policy.deadline.as_millis(),
            "poll_interval_ms": policy.interval.as_millis(),
        });

        let (task_id, waited) = match poller.submit_and_wait(&req, &context.ct).await {
            Ok(v) => v,
            Err(e) => return Ok(fail(kind, t0, json!({ "request": request }), error_from(&e))),
        };
        let outcome = match waited {
            Ok(o) => o,
            Err(e) => {
                return Ok(fail(
                    kind,
                    t0,
                    json!({ "task_id": task_id, "request": request }),
                    error_from(&e),
                ))
            }
        };
        tracing::info!(task_id = %task_id, outcome = outcome.kind(), "deep research finished");

        Ok(match outcome {
            PollOutcome::Completed(task) => {
                let rendered = format::render_completed(&task, Some(&req.query));
                let payload = json!({
                    "ok": true,
                    "outcome": "completed",
                    "task_id": task_id,
                    "result": rendered.payload,
                    "request": request,
                });
                finish(kind, t0, payload, rendered.text)
            }
            PollOutcome::Failed { message, .. } => {
                let payload = json!({
                    "ok": false,
                    "outcome": "failed",
                    "task_id": task_id,
                    "error": task_failed(&message),
                    "request": request,
                });
                finish(kind, t0, payload, format::render_failed(&task_id, &message))
            }
            PollOutcome::TimedOut {
                last_status,
                elapsed,
                polls,
                ..
            } => {
                let payload = json!({
                    "ok": true,
                    "outcome": "timed_out",
                    "task_id": task_id,
                    "last_status": last_status.as_str(),
                    "polls": polls,
                    "waited_ms": elapsed.as_millis(),
                    "request": request,
                });
                let text = format::render_timed_out(&task_id, last_status, elapsed);
                finish(kind, t0, payload, text)
            }
            PollOutcome::Canceled { polls, .. } => {
                let payload = json!({
                    "ok": true,
                    "outcome": "canceled",
                    "task_id": task_id,
                    "polls": polls,
                    "request": request,
                });
                finish(kind, t0, payload, format::render_canceled(&task_id))
            }
        })
    }
}

#[tool_handler]
impl rmcp::ServerHandler for ExaBridgeMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Exa web search, crawling and deep research. Results are JSON envelopes (schema_version, kind, ok) with a readable text block; long research can be started and checked by task_id."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub(crate) async fn serve_stdio(settings: Settings) -> Result<(), McpError> {
    let enabled = settings.tools.enabled();
    let svc = ExaBridgeMcp::new(settings)?;
    tracing::info!(tools = ?enabled, "serving MCP over stdio");
    let running = svc
        .serve(stdio())
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    // Keep the stdio server alive until the client closes.
    running
        .waiting()
        .await
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(())
}
