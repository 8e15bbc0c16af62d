//! Response formatting for generated test cases.
//!
//! The test-case agent answers with free-form text, normally Gherkin. The
//! default output passes it through untouched; the JSON output splits it into
//! feature, scenarios and steps. Formatting never fails: text without any
//! recognisable structure yields an empty scenario list.

use serde::{Deserialize, Serialize};

/// Output shape requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "plain", alias = "TEXT", alias = "PLAIN")]
    Text,
    #[serde(alias = "JSON")]
    Json,
}

/// Formatter result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedOutput {
    Text(String),
    Json(TestSuite),
}

/// Structured view of a Gherkin-style reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuite {
    pub feature: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub scenarios: Vec<TestCase>,
    /// The unmodified reply.
    pub raw: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub outline: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub steps: Vec<TestStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStep {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

const STEP_KEYWORDS: [&str; 6] = ["Given", "When", "Then", "And", "But", "*"];
const OUTLINE_KEYWORDS: [&str; 2] = ["Scenario Outline:", "Scenario Template:"];
const SCENARIO_KEYWORDS: [&str; 2] = ["Scenario:", "Example:"];

/// Shape `raw` according to `format`.
pub fn format_test_cases(raw: &str, format: OutputFormat) -> FormattedOutput {
    match format {
        OutputFormat::Text => FormattedOutput::Text(raw.to_string()),
        OutputFormat::Json => FormattedOutput::Json(parse_test_suite(raw)),
    }
}

/// Split Gherkin-style text into a [`TestSuite`].
pub fn parse_test_suite(raw: &str) -> TestSuite {
    let mut suite = TestSuite {
        raw: raw.to_string(),
        ..Default::default()
    };
    let mut pending_tags: Vec<String> = Vec::new();
    let mut description: Vec<&str> = Vec::new();
    let mut in_feature_header = false;
    let mut in_examples = false;

    for line in raw.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("```") || line.starts_with('#') {
            continue;
        }

        if line.starts_with('@') {
            pending_tags.extend(
                line.split_whitespace()
                    .filter_map(|t| t.strip_prefix('@'))
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
            );
            continue;
        }

        if let Some(name) = strip_any(line, &["Feature:"]) {
            suite.feature = Some(name);
            suite.tags.append(&mut pending_tags);
            in_feature_header = true;
            in_examples = false;
            continue;
        }

        let opened = if let Some(name) = strip_any(line, &OUTLINE_KEYWORDS) {
            Some((name, true))
        } else if let Some(name) = strip_any(line, &SCENARIO_KEYWORDS) {
            Some((name, false))
        } else {
            strip_any(line, &["Background:"]).map(|name| {
                let name = if name.is_empty() { "Background".to_string() } else { name };
                (name, false)
            })
        };
        if let Some((name, outline)) = opened {
            suite.scenarios.push(TestCase {
                name,
                outline,
                tags: std::mem::take(&mut pending_tags),
                steps: Vec::new(),
            });
            in_feature_header = false;
            in_examples = false;
            continue;
        }

        if strip_any(line, &["Examples:", "Scenarios:"]).is_some() {
            // tags on an examples table belong to that table
            pending_tags.clear();
            in_examples = true;
            continue;
        }
        if line.starts_with('|') || (in_examples && !is_step(line)) {
            continue;
        }

        if let Some(step) = parse_step(line) {
            if suite.scenarios.is_empty() {
                suite.scenarios.push(TestCase {
                    tags: std::mem::take(&mut pending_tags),
                    ..Default::default()
                });
            }
            if let Some(current) = suite.scenarios.last_mut() {
                current.steps.push(step);
            }
            in_feature_header = false;
            in_examples = false;
            continue;
        }

        if in_feature_header {
            description.push(line);
        }
    }

    if !description.is_empty() {
        suite.description = Some(description.join("\n"));
    }
    suite
}

fn strip_any(line: &str, keywords: &[&str]) -> Option<String> {
    keywords
        .iter()
        .find_map(|kw| line.strip_prefix(kw))
        .map(|rest| rest.trim().to_string())
}

fn is_step(line: &str) -> bool {
    parse_step(line).is_some()
}

fn parse_step(line: &str) -> Option<TestStep> {
    STEP_KEYWORDS.iter().find_map(|kw| {
        let rest = line.strip_prefix(kw)?;
        // "Givenchy" is not a step
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }
        Some(TestStep {
            kind: kw.to_string(),
            text: rest.trim().to_string(),
        })
    })
}
