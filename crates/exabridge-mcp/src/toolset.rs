//! Which tools the server advertises.

use std::collections::BTreeSet;

/// Always registered; reports configuration, never calls the provider.
pub(crate) const META_TOOL: &str = "exabridge_meta";

pub(crate) const ALL_TOOLS: &[&str] = &[
    "web_search_exa",
    "exa_search",
    "research_paper_search_exa",
    "company_research_exa",
    "linkedin_search_exa",
    "wikipedia_search_exa",
    "github_search_exa",
    "competitor_finder_exa",
    "crawling_exa",
    "find_similar_exa",
    "answer_exa",
    "deep_researcher_start",
    "deep_researcher_check",
    "deep_research_exa",
];

pub(crate) const DEFAULT_TOOLS: &[&str] = &[
    "web_search_exa",
    "company_research_exa",
    "crawling_exa",
    "linkedin_search_exa",
    "deep_researcher_start",
    "deep_researcher_check",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ToolSet {
    enabled: BTreeSet<&'static str>,
    unknown: Vec<String>,
}

impl Default for ToolSet {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_TOOLS.iter().copied().collect(),
            unknown: Vec::new(),
        }
    }
}

impl ToolSet {
    /// Parses a comma-separated tool list. `None` or a blank list selects the default set;
    /// `all` selects every tool. Unknown names are kept for reporting and otherwise ignored.
    pub(crate) fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        let mut enabled = BTreeSet::new();
        let mut unknown = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if name.eq_ignore_ascii_case("all") {
                enabled.extend(ALL_TOOLS.iter().copied());
                continue;
            }
            match ALL_TOOLS.iter().find(|t| **t == name) {
                Some(t) => {
                    enabled.insert(*t);
                }
                // Listed explicitly is harmless; it is always on.
                None if name == META_TOOL => {}
                None => {
                    tracing::warn!(tool = name, "ignoring unknown tool name");
                    unknown.push(name.to_string());
                }
            }
        }
        Self { enabled, unknown }
    }

    /// Enabled tool names in catalogue order, without the meta tool.
    pub(crate) fn enabled(&self) -> Vec<&'static str> {
        ALL_TOOLS
            .iter()
            .copied()
            .filter(|t| self.enabled.contains(t))
            .collect()
    }

    pub(crate) fn disabled(&self) -> Vec<&'static str> {
        ALL_TOOLS
            .iter()
            .copied()
            .filter(|t| !self.enabled.contains(t))
            .collect()
    }

    pub(crate) fn unknown(&self) -> &[String] {
        &self.unknown
    }

    /// `[{name, enabled}]` over the whole catalogue, meta tool last.
    pub(crate) fn listing(&self) -> serde_json::Value {
        let mut out: Vec<serde_json::Value> = ALL_TOOLS
            .iter()
            .map(|t| serde_json::json!({ "name": t, "enabled": self.enabled.contains(t) }))
            .collect();
        out.push(serde_json::json!({ "name": META_TOOL, "enabled": true }));
        serde_json::Value::Array(out)
    }
}
