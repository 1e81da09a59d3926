//! Process-wide settings, read once at startup and injected into the server.

use anyhow::{Context, Result};
use exabridge_client::poller::{validate_policy, PollPolicy};
use exabridge_client::{ExaClient, ExaConfig, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use std::time::Duration;

use crate::toolset::ToolSet;

pub(crate) const ENV_API_KEY: &str = "EXABRIDGE_EXA_API_KEY";
pub(crate) const ENV_API_KEY_FALLBACK: &str = "EXA_API_KEY";
pub(crate) const ENV_BASE_URL: &str = "EXABRIDGE_EXA_BASE_URL";
pub(crate) const ENV_REQUEST_TIMEOUT_MS: &str = "EXABRIDGE_REQUEST_TIMEOUT_MS";
pub(crate) const ENV_TOOLS: &str = "EXABRIDGE_TOOLS";
pub(crate) const ENV_POLL_INTERVAL_MS: &str = "EXABRIDGE_RESEARCH_POLL_INTERVAL_MS";
pub(crate) const ENV_DEADLINE_MS: &str = "EXABRIDGE_RESEARCH_DEADLINE_MS";
pub(crate) const ENV_MAX_TRANSIENT_FAILURES: &str = "EXABRIDGE_RESEARCH_MAX_TRANSIENT_FAILURES";

#[derive(Clone)]
pub(crate) struct Settings {
    pub(crate) api_key: Option<String>,
    pub(crate) base_url: String,
    pub(crate) request_timeout: Duration,
    pub(crate) tools: ToolSet,
    pub(crate) poll: PollPolicy,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key_configured", &self.api_key.is_some())
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("tools", &self.tools)
            .field("poll", &self.poll)
            .finish()
    }
}

impl Settings {
    /// Reads settings from the process environment. `tools` is the `--tools` flag, which
    /// clap already falls back to `EXABRIDGE_TOOLS` for.
    pub(crate) fn from_env(tools: Option<&str>) -> Result<Self> {
        Self::from_lookup(tools, |k| std::env::var(k).ok())
    }

    pub(crate) fn from_lookup(
        tools: Option<&str>,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let get = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get(ENV_API_KEY).or_else(|| get(ENV_API_KEY_FALLBACK));
        let base_url = get(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&base_url).with_context(|| format!("invalid {ENV_BASE_URL}"))?;

        let ms = |name: &str, default: Duration| -> Result<Duration> {
            match get(name) {
                None => Ok(default),
                Some(v) => v
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .with_context(|| format!("invalid {name}: expected milliseconds, got {v:?}")),
            }
        };
        let request_timeout = ms(ENV_REQUEST_TIMEOUT_MS, DEFAULT_REQUEST_TIMEOUT)?;
        if request_timeout.is_zero() {
            anyhow::bail!("invalid {ENV_REQUEST_TIMEOUT_MS}: must be greater than zero");
        }

        let defaults = PollPolicy::default();
        let max_transient_failures = match get(ENV_MAX_TRANSIENT_FAILURES) {
            None => defaults.max_transient_failures,
            Some(v) => v
                .parse::<u32>()
                .with_context(|| format!("invalid {ENV_MAX_TRANSIENT_FAILURES}: got {v:?}"))?,
        };
        let poll = PollPolicy {
            interval: ms(ENV_POLL_INTERVAL_MS, defaults.interval)?,
            deadline: ms(ENV_DEADLINE_MS, defaults.deadline)?,
            max_transient_failures,
        };
        validate_policy(&poll).context("invalid research poll settings")?;

        let tools = match tools {
            Some(t) => ToolSet::parse(Some(t)),
            None => ToolSet::parse(get(ENV_TOOLS).as_deref()),
        };

        Ok(Self {
            api_key,
            base_url,
            request_timeout,
            tools,
            poll,
        })
    }

    /// `None` when no API key is configured; tools then answer `not_configured`.
    pub(crate) fn exa_client(&self, http: reqwest::Client) -> Result<Option<ExaClient>> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(None);
        };
        let config = ExaConfig::new(key)?
            .with_base_url(&self.base_url)?
            .with_request_timeout(self.request_timeout);
        Ok(Some(ExaClient::new(http, config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let m: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(None, |k| m.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let s = settings(&[]).unwrap();
        assert!(s.api_key.is_none());
        assert_eq!(s.base_url, DEFAULT_BASE_URL);
        assert_eq!(s.request_timeout, Duration::from_secs(30));
        assert_eq!(s.poll, PollPolicy::default());
        assert_eq!(s.tools, ToolSet::default());
        assert!(s.exa_client(reqwest::Client::new()).unwrap().is_none());
    }

    #[test]
    fn prefixed_key_wins_and_blank_counts_as_missing() {
        let s = settings(&[(ENV_API_KEY, "a"), (ENV_API_KEY_FALLBACK, "b")]).unwrap();
        assert_eq!(s.api_key.as_deref(), Some("a"));
        let s = settings(&[(ENV_API_KEY, "  "), (ENV_API_KEY_FALLBACK, "b")]).unwrap();
        assert_eq!(s.api_key.as_deref(), Some("b"));
        let s = settings(&[(ENV_API_KEY_FALLBACK, "")]).unwrap();
        assert!(s.api_key.is_none());
    }

    #[test]
    fn debug_hides_the_key() {
        let s = settings(&[(ENV_API_KEY, "very-secret")]).unwrap();
        assert!(!format!("{s:?}").contains("very-secret"));
    }

    #[test]
    fn numeric_overrides_are_parsed() {
        let s = settings(&[
            (ENV_POLL_INTERVAL_MS, "250"),
            (ENV_DEADLINE_MS, "5000"),
            (ENV_MAX_TRANSIENT_FAILURES, "2"),
            (ENV_REQUEST_TIMEOUT_MS, "1000"),
        ])
        .unwrap();
        assert_eq!(s.poll.interval, Duration::from_millis(250));
        assert_eq!(s.poll.deadline, Duration::from_millis(5000));
        assert_eq!(s.poll.max_transient_failures, 2);
        assert_eq!(s.request_timeout, Duration::from_secs(1));
    }

    #[test]
    fn invalid_numbers_name_the_variable() {
        let err = settings(&[(ENV_POLL_INTERVAL_MS, "soon")]).unwrap_err();
        assert!(format!("{err:#}").contains(ENV_POLL_INTERVAL_MS));
        let err = settings(&[(ENV_REQUEST_TIMEOUT_MS, "0")]).unwrap_err();
        assert!(format!("{err:#}").contains(ENV_REQUEST_TIMEOUT_MS));
    }

    #[test]
    fn deadline_shorter_than_interval_is_rejected() {
        assert!(settings(&[(ENV_POLL_INTERVAL_MS, "5000"), (ENV_DEADLINE_MS, "1000")]).is_err());
    }

    #[test]
    fn tools_flag_beats_env() {
        let m: HashMap<String, String> =
            [(ENV_TOOLS.to_string(), "answer_exa".to_string())].into();
        let s = Settings::from_lookup(Some("crawling_exa"), |k| m.get(k).cloned()).unwrap();
        assert_eq!(s.tools.enabled(), vec!["crawling_exa"]);
        let s = Settings::from_lookup(None, |k| m.get(k).cloned()).unwrap();
        assert_eq!(s.tools.enabled(), vec!["answer_exa"]);
    }

    #[test]
    fn client_carries_base_url_and_timeout() {
        let s = settings(&[
            (ENV_API_KEY, "k"),
            (ENV_BASE_URL, "http://127.0.0.1:9/"),
            (ENV_REQUEST_TIMEOUT_MS, "1500"),
        ])
        .unwrap();
        let c = s.exa_client(reqwest::Client::new()).unwrap().unwrap();
        assert_eq!(c.config().base_url().as_str(), "http://127.0.0.1:9/");
        assert_eq!(c.config().request_timeout(), Duration::from_millis(1500));
    }
}
