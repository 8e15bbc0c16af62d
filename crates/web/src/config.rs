//! Service configuration
//!
//! Agent endpoints come from either the optional TOML config file or the
//! environment. A key defined in both places is rejected rather than letting
//! one silently win.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use stepcase_common::{Error, Result};

pub const SCREENSHOT_AGENT_ENV: &str = "STEPCASE_SCREENSHOT_AGENT_URL";
pub const TESTCASE_AGENT_ENV: &str = "STEPCASE_TESTCASE_AGENT_URL";
pub const REQUEST_TIMEOUT_ENV: &str = "STEPCASE_REQUEST_TIMEOUT_SECS";

/// Absolute URLs of the two prediction agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEndpoints {
    /// Screenshot to structured UI description
    pub screenshot_to_structure: String,
    /// Structured project to test cases
    pub structure_to_test_cases: String,
}

/// Config file contents. Every key is optional so it can live in the
/// environment instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub agents: FileAgents,

    /// Per-call timeout for agent requests
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileAgents {
    pub screenshot_to_structure: Option<String>,
    pub structure_to_test_cases: Option<String>,
}

impl FileConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))
    }
}

/// Resolved configuration, read-only after startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP listen address
    pub listen: SocketAddr,

    pub agents: AgentEndpoints,

    /// `None` leaves agent calls unbounded
    pub request_timeout: Option<Duration>,
}

impl ServiceConfig {
    /// Resolve from an optional config file and the process environment.
    pub fn load(listen: SocketAddr, config_path: Option<&Path>) -> Result<Self> {
        let file = match config_path {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(listen, file, |key| std::env::var(key).ok())
    }

    /// Resolve from already-loaded file contents and an environment lookup.
    pub fn resolve<F>(listen: SocketAddr, file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let screenshot_to_structure = pick(
            "agents.screenshot_to_structure",
            file.agents.screenshot_to_structure,
            SCREENSHOT_AGENT_ENV,
            &env,
        )?;
        let structure_to_test_cases = pick(
            "agents.structure_to_test_cases",
            file.agents.structure_to_test_cases,
            TESTCASE_AGENT_ENV,
            &env,
        )?;
        validate_url(SCREENSHOT_AGENT_ENV, &screenshot_to_structure)?;
        validate_url(TESTCASE_AGENT_ENV, &structure_to_test_cases)?;

        let timeout_secs = match (file.request_timeout_secs, non_empty(env(REQUEST_TIMEOUT_ENV))) {
            (Some(_), Some(_)) => return Err(defined_twice("request_timeout_secs", REQUEST_TIMEOUT_ENV)),
            (Some(secs), None) => Some(secs),
            (None, Some(raw)) => Some(raw.parse::<u64>().map_err(|e| {
                Error::InvalidConfig(format!("{} must be a number of seconds: {}", REQUEST_TIMEOUT_ENV, e))
            })?),
            (None, None) => None,
        };
        if timeout_secs == Some(0) {
            return Err(Error::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            listen,
            agents: AgentEndpoints {
                screenshot_to_structure,
                structure_to_test_cases,
            },
            request_timeout: timeout_secs.map(Duration::from_secs),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn defined_twice(key: &str, var: &str) -> Error {
    Error::InvalidConfig(format!(
        "{} is set both in the config file and in {}; keep only one",
        key, var
    ))
}

fn pick<F>(key: &str, from_file: Option<String>, var: &str, env: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match (non_empty(from_file), non_empty(env(var))) {
        (Some(_), Some(_)) => Err(defined_twice(key, var)),
        (Some(value), None) | (None, Some(value)) => Ok(value),
        (None, None) => Err(Error::InvalidConfig(format!(
            "{} is not configured; set {} or add it to the config file",
            key, var
        ))),
    }
}

fn validate_url(name: &str, value: &str) -> Result<()> {
    let url = url::Url::parse(value)
        .map_err(|e| Error::InvalidConfig(format!("{} is not a valid URL ({}): {}", name, value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidConfig(format!(
            "{} must be an http(s) URL, got scheme {}",
            name, other
        ))),
    }
}
