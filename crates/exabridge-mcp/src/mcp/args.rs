use exabridge_core::{
    ContextOptions, Extras, HighlightsOptions, Livecrawl, ResearchModel, SearchCategory,
    SearchType, SummaryOptions, TextOptions, Toggle,
};
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct MetaArgs {}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct WebSearchArgs {
    /// Search query (required).
    #[serde(default)]
    pub(crate) query: Option<String>,
    /// Number of results. Default: 5; range 1..=100.
    #[serde(default)]
    pub(crate) num_results: Option<u32>,
    /// Search type: auto, neural, keyword, fast or deep. Default: auto.
    #[serde(default)]
    pub(crate) search_type: Option<SearchType>,
    /// Live crawl policy: never, fallback, preferred or always. Default: fallback.
    #[serde(default)]
    pub(crate) livecrawl: Option<Livecrawl>,
    /// Max characters of page text per result. Default: 3000.
    #[serde(default)]
    pub(crate) max_characters: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct ExaSearchArgs {
    /// Search query (required).
    #[serde(default)]
    pub(crate) query: Option<String>,
    #[serde(default)]
    pub(crate) search_type: Option<SearchType>,
    /// Number of results. Default: provider default; range 1..=100.
    #[serde(default)]
    pub(crate) num_results: Option<u32>,
    /// Restrict to a content category, e.g. "research paper", "news", "company".
    #[serde(default)]
    pub(crate) category: Option<SearchCategory>,
    #[serde(default)]
    pub(crate) include_domains: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) exclude_domains: Option<Vec<String>>,
    /// ISO 8601 date/time lower bound on publication date.
    #[serde(default)]
    pub(crate) start_published_date: Option<String>,
    #[serde(default)]
    pub(crate) end_published_date: Option<String>,
    /// ISO 8601 date/time lower bound on crawl date.
    #[serde(default)]
    pub(crate) start_crawl_date: Option<String>,
    #[serde(default)]
    pub(crate) end_crawl_date: Option<String>,
    /// Phrases that must appear in result text.
    #[serde(default)]
    pub(crate) include_text: Option<Vec<String>>,
    /// Phrases that must not appear in result text.
    #[serde(default)]
    pub(crate) exclude_text: Option<Vec<String>>,
    /// Two-letter country code used to localise results.
    #[serde(default)]
    pub(crate) user_location: Option<String>,
    /// Page text: true/false or {max_characters, include_html_tags}.
    #[serde(default)]
    pub(crate) text: Option<Toggle<TextOptions>>,
    /// Highlights: true/false or {num_sentences, highlights_per_url, query}.
    #[serde(default)]
    pub(crate) highlights: Option<Toggle<HighlightsOptions>>,
    /// Summary: true/false or {query, schema}.
    #[serde(default)]
    pub(crate) summary: Option<Toggle<SummaryOptions>>,
    /// Combined context string: true/false or {max_characters}.
    #[serde(default)]
    pub(crate) context: Option<Toggle<ContextOptions>>,
    #[serde(default)]
    pub(crate) livecrawl: Option<Livecrawl>,
    /// Live crawl timeout (ms).
    #[serde(default)]
    pub(crate) livecrawl_timeout_ms: Option<u64>,
    /// Subpages to crawl per result (max 10).
    #[serde(default)]
    pub(crate) subpages: Option<u32>,
    /// Keywords used to pick subpages.
    #[serde(default)]
    pub(crate) subpage_target: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) extras: Option<Extras>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct ScopedSearchArgs {
    /// Search query (required).
    #[serde(default)]
    pub(crate) query: Option<String>,
    /// Number of results. Default: 5; range 1..=100.
    #[serde(default)]
    pub(crate) num_results: Option<u32>,
    /// Max characters of page text per result. Default: 3000.
    #[serde(default)]
    pub(crate) max_characters: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct CompanyResearchArgs {
    /// Company name (required).
    #[serde(default)]
    pub(crate) company_name: Option<String>,
    /// Number of results. Default: 5.
    #[serde(default)]
    pub(crate) num_results: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct CompetitorFinderArgs {
    /// Company name (required).
    #[serde(default)]
    pub(crate) company_name: Option<String>,
    /// What the company does, in a sentence (required).
    #[serde(default)]
    pub(crate) description: Option<String>,
    /// Company website; its domain is excluded from results.
    #[serde(default)]
    pub(crate) company_url: Option<String>,
    /// Number of results. Default: 10.
    #[serde(default)]
    pub(crate) num_results: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct CrawlingArgs {
    /// URL to read (required).
    #[serde(default)]
    pub(crate) url: Option<String>,
    /// Max characters of page text. Default: 3000.
    #[serde(default)]
    pub(crate) max_characters: Option<u32>,
    /// Live crawl policy. Default: preferred.
    #[serde(default)]
    pub(crate) livecrawl: Option<Livecrawl>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct FindSimilarArgs {
    /// URL to find similar pages for (required).
    #[serde(default)]
    pub(crate) url: Option<String>,
    /// Number of results. Default: 5.
    #[serde(default)]
    pub(crate) num_results: Option<u32>,
    /// Drop results from the source URL's own domain. Default: true.
    #[serde(default)]
    pub(crate) exclude_source_domain: Option<bool>,
    /// Max characters of page text per result. Default: 3000.
    #[serde(default)]
    pub(crate) max_characters: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct AnswerArgs {
    /// Question to answer (required).
    #[serde(default)]
    pub(crate) query: Option<String>,
    /// Include full page text in citations. Default: false.
    #[serde(default)]
    pub(crate) include_text: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct ResearchStartArgs {
    /// Research instructions (required).
    #[serde(default)]
    pub(crate) query: Option<String>,
    /// exa-research (default) or exa-research-pro.
    #[serde(default)]
    pub(crate) model: Option<ResearchModel>,
    /// Number of sources to consult, 1..=100.
    #[serde(default)]
    pub(crate) num_results: Option<u32>,
    /// JSON schema for structured output. Omit to get a narrative report.
    #[serde(default)]
    pub(crate) output_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct ResearchCheckArgs {
    /// Task id returned by deep_researcher_start (required).
    #[serde(default)]
    pub(crate) task_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema, Default)]
pub(crate) struct DeepResearchArgs {
    /// Research instructions (required).
    #[serde(default)]
    pub(crate) query: Option<String>,
    /// exa-research (default) or exa-research-pro.
    #[serde(default)]
    pub(crate) model: Option<ResearchModel>,
    #[serde(default)]
    pub(crate) num_results: Option<u32>,
    /// JSON schema for structured output. Omit to get a narrative report.
    #[serde(default)]
    pub(crate) output_schema: Option<serde_json::Value>,
    /// How long to wait for completion (ms). Default: server setting (120000); max 600000.
    #[serde(default)]
    pub(crate) deadline_ms: Option<u64>,
    /// Delay before each status check (ms). Default: server setting (3000); min 100.
    #[serde(default)]
    pub(crate) poll_interval_ms: Option<u64>,
}
