//! Request and response shapes for the provider's synchronous endpoints
//! (`/search`, `/contents`, `/findSimilar`, `/answer`).
//!
//! Request types deserialize from snake_case (tool arguments) and serialize to camelCase
//! (provider wire format). Response types only deserialize.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A provider option that is either switched on/off wholesale or configured in detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(untagged)]
pub enum Toggle<T> {
    Enabled(bool),
    Options(T),
}

impl<T> Toggle<T> {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Enabled(false))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct TextOptions {
    /// Cap on characters of page text per result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_characters: Option<u32>,
    /// Keep HTML tags in the returned text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_html_tags: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct HighlightsOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_sentences: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights_per_url: Option<u32>,
    /// Query used to pick highlights (defaults to the search query).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct SummaryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// JSON schema the summary should follow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct ContextOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_characters: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct Extras {
    /// Number of outbound links to return per result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<u32>,
    /// Number of image links to return per result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_links: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum Livecrawl {
    Never,
    Fallback,
    Preferred,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    Auto,
    Neural,
    Keyword,
    Fast,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
pub enum SearchCategory {
    #[serde(rename = "company")]
    Company,
    #[serde(rename = "research paper")]
    ResearchPaper,
    #[serde(rename = "news")]
    News,
    #[serde(rename = "pdf")]
    Pdf,
    #[serde(rename = "github")]
    Github,
    #[serde(rename = "tweet")]
    Tweet,
    #[serde(rename = "personal site")]
    PersonalSite,
    #[serde(rename = "linkedin profile")]
    LinkedinProfile,
    #[serde(rename = "financial report")]
    FinancialReport,
}

/// Content retrieval options. Sent as `contents` on `/search` and `/findSimilar`, and at the
/// top level of `/contents`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct SearchContents {
    /// Page text: `true`/`false`, or detailed options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Toggle<TextOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Toggle<HighlightsOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Toggle<SummaryOptions>>,
    /// Combined context string across all results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Toggle<ContextOptions>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub livecrawl: Option<Livecrawl>,
    /// Livecrawl timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub livecrawl_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subpages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subpage_target: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<Extras>,
}

impl SearchContents {
    /// Plain text capped at `max_characters`.
    pub fn text_capped(max_characters: u32) -> Self {
        Self {
            text: Some(Toggle::Options(TextOptions {
                max_characters: Some(max_characters),
                include_html_tags: None,
            })),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(n) = self.subpages {
            if n > 10 {
                return Err(Error::InvalidParams(format!(
                    "subpages must be at most 10 (got {n})"
                )));
            }
        }
        if let Some(Toggle::Options(t)) = &self.text {
            if t.max_characters == Some(0) {
                return Err(Error::InvalidParams(
                    "text.max_characters must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct SearchRequest {
    pub query: String,
    #[serde(rename(serialize = "type"), skip_serializing_if = "Option::is_none")]
    pub search_type: Option<SearchType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_results: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<SearchCategory>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_domains: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_domains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_crawl_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_crawl_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_text: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_text: Vec<String>,
    /// Two-letter ISO country code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<SearchContents>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::InvalidParams(
                "query must be a non-empty string".to_string(),
            ));
        }
        validate_num_results(self.num_results)?;
        validate_domains("include_domains", &self.include_domains)?;
        validate_domains("exclude_domains", &self.exclude_domains)?;
        if let Some(loc) = &self.user_location {
            if loc.len() != 2 || !loc.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(Error::InvalidParams(format!(
                    "user_location must be a two-letter country code (got {loc:?})"
                )));
            }
        }
        if let Some(c) = &self.contents {
            c.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct FindSimilarRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_results: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_source_domain: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_domains: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_domains: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<SearchContents>,
}

impl FindSimilarRequest {
    pub fn validate(&self) -> Result<()> {
        validate_absolute_url(&self.url)?;
        validate_num_results(self.num_results)?;
        validate_domains("include_domains", &self.include_domains)?;
        validate_domains("exclude_domains", &self.exclude_domains)?;
        if let Some(c) = &self.contents {
            c.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct ContentsRequest {
    pub urls: Vec<String>,
    #[serde(flatten)]
    pub contents: SearchContents,
}

impl ContentsRequest {
    pub fn validate(&self) -> Result<()> {
        if self.urls.is_empty() {
            return Err(Error::InvalidParams("urls must be non-empty".to_string()));
        }
        for u in &self.urls {
            validate_absolute_url(u)?;
        }
        self.contents.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerRequest {
    pub query: String,
    /// Include full page text in citations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<bool>,
}

impl AnswerRequest {
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(Error::InvalidParams(
                "query must be a non-empty string".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_num_results(n: Option<u32>) -> Result<()> {
    match n {
        Some(n) if !(1..=100).contains(&n) => Err(Error::InvalidParams(format!(
            "num_results must be between 1 and 100 (got {n})"
        ))),
        _ => Ok(()),
    }
}

fn validate_domains(field: &str, domains: &[String]) -> Result<()> {
    if domains.iter().any(|d| d.trim().is_empty()) {
        return Err(Error::InvalidParams(format!(
            "{field} must not contain empty entries"
        )));
    }
    Ok(())
}

fn validate_absolute_url(raw: &str) -> Result<()> {
    match url::Url::parse(raw.trim()) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(()),
        Ok(u) => Err(Error::InvalidParams(format!(
            "unsupported url scheme {:?} in {raw:?}",
            u.scheme()
        ))),
        Err(e) => Err(Error::InvalidParams(format!("invalid url {raw:?}: {e}"))),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub highlights: Option<Vec<String>>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub subpages: Option<Vec<SearchHit>>,
    #[serde(default)]
    pub extras: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub resolved_search_type: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub cost_dollars: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentsStatus {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentsResponse {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default)]
    pub statuses: Option<Vec<ContentsStatus>>,
    #[serde(default)]
    pub cost_dollars: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCitation {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    /// Plain string, or an object when the answer followed an output schema.
    #[serde(default)]
    pub answer: serde_json::Value,
    #[serde(default)]
    pub citations: Vec<AnswerCitation>,
    #[serde(default)]
    pub cost_dollars: Option<serde_json::Value>,
}
