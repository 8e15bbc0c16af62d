//! Project model: a project owns scenarios, a scenario owns ordered steps.
//!
//! All three are built fresh from each request body and dropped once the
//! response is produced.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One recorded step: a screenshot plus optional context.
///
/// `yaml` is filled in by the screenshot agent during enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub order: i64,
    #[serde(default)]
    pub context: Option<String>,
    pub image: String,
    #[serde(default)]
    pub yaml: Option<String>,
}

impl Step {
    pub fn new(order: i64, image: impl Into<String>) -> Self {
        Self {
            order,
            context: None,
            image: image.into(),
            yaml: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_enriched(&self) -> bool {
        self.yaml.is_some()
    }
}

/// One user flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub description: Option<String>,
    /// Id of another scenario in the same project. Not validated.
    #[serde(default, rename = "parentId")]
    pub parent_id: Option<String>,
}

impl Scenario {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            steps: Vec::new(),
            description: None,
            parent_id: None,
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Root aggregate of a testing project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub project: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scenarios: Vec<Scenario>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            project: name.into(),
            description: None,
            scenarios: Vec::new(),
        }
    }

    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Total number of steps across all scenarios.
    pub fn step_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.steps.len()).sum()
    }

    /// Steps in scenario order, then step order as given.
    pub fn steps(&self) -> impl Iterator<Item = (&Scenario, &Step)> {
        self.scenarios
            .iter()
            .flat_map(|scenario| scenario.steps.iter().map(move |step| (scenario, step)))
    }

    /// Look up a scenario by id, e.g. to follow a `parentId`.
    pub fn scenario(&self, id: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    /// The parent of `scenario`, if its `parentId` resolves within this project.
    pub fn parent_of(&self, scenario: &Scenario) -> Option<&Scenario> {
        scenario.parent_id.as_deref().and_then(|id| self.scenario(id))
    }

    /// Compact JSON form used as the `question` of the test-case agent.
    pub fn to_question(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
