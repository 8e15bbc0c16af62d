//! In-process agent fake for unit tests.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;

use stepcase_common::{Error, Project, Result};

use crate::agents::{Agent, AgentReply};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Screenshot {
        context: Option<String>,
        image: String,
    },
    TestCases {
        /// The project as the test-case agent received it
        project: Project,
    },
}

/// Records every call and answers deterministically.
///
/// The screenshot reply is `yaml for <image>`; the test-case reply is
/// `test_cases`. Screenshot calls for `fail_image` fail with a 500.
pub struct RecordingAgent {
    pub calls: Mutex<Vec<Call>>,
    pub test_cases: String,
    pub fail_image: Option<String>,
    pub omit_text: bool,
}

impl RecordingAgent {
    pub fn new(test_cases: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            test_cases: test_cases.to_string(),
            fail_image: None,
            omit_text: false,
        }
    }

    pub fn failing_on(mut self, image: &str) -> Self {
        self.fail_image = Some(image.to_string());
        self
    }

    pub fn without_text(mut self) -> Self {
        self.omit_text = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn screenshot_images(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Screenshot { image, .. } => Some(image),
                Call::TestCases { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl Agent for RecordingAgent {
    async fn screenshot_to_structure(
        &self,
        context: Option<&str>,
        image_url: &str,
    ) -> Result<AgentReply> {
        self.calls.lock().unwrap().push(Call::Screenshot {
            context: context.map(str::to_string),
            image: image_url.to_string(),
        });
        if self.fail_image.as_deref() == Some(image_url) {
            return Err(Error::UpstreamStatus {
                url: "http://fake/screenshot".to_string(),
                status: 500,
                body: "boom".to_string(),
            });
        }
        if self.omit_text {
            return Ok(AgentReply::new(json!({ "answer": "no text" })));
        }
        Ok(AgentReply::new(json!({ "text": format!("yaml for {}", image_url) })))
    }

    async fn text_to_test_cases(&self, question: &str) -> Result<AgentReply> {
        let project: Project = serde_json::from_str(question)?;
        self.calls.lock().unwrap().push(Call::TestCases { project });
        Ok(AgentReply::new(json!({ "text": self.test_cases })))
    }
}
