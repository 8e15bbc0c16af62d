//! Project pipeline: per-step screenshot enrichment, then test-case
//! generation.
//!
//! Everything runs one call at a time in scenario order, then step order.
//! The test-case call is only made after every step has its `yaml`.

use tracing::{debug, info, info_span, Instrument, Span};

use stepcase_common::{format_test_cases, FormattedOutput, OutputFormat, Project, Result, Step};

use crate::agents::Agent;

/// Structured text for a single step's screenshot.
pub async fn structure_for_step(agent: &dyn Agent, step: &Step) -> Result<String> {
    let reply = agent
        .screenshot_to_structure(step.context.as_deref(), &step.image)
        .await?;
    Ok(reply.text()?.to_string())
}

/// Fill in `yaml` on every step. Returns the number of steps enriched.
///
/// Stops at the first failure; steps already written keep their `yaml`.
pub async fn enrich_project(agent: &dyn Agent, project: &mut Project) -> Result<usize> {
    let mut enriched = 0;
    for scenario in project.scenarios.iter_mut() {
        for step in scenario.steps.iter_mut() {
            debug!(scenario = %scenario.id, order = step.order, "Enriching step");
            let yaml = structure_for_step(agent, step).await?;
            step.yaml = Some(yaml);
            enriched += 1;
        }
    }
    Ok(enriched)
}

/// Send the project as-is to the test-case agent and format the reply.
pub async fn test_cases_for_project(
    agent: &dyn Agent,
    project: &Project,
    format: OutputFormat,
) -> Result<FormattedOutput> {
    request_test_cases(agent, project, format)
        .instrument(project_span(project))
        .await
}

/// Enrich every step, then generate test cases from the enriched project.
pub async fn generate_from_project(
    agent: &dyn Agent,
    mut project: Project,
    format: OutputFormat,
) -> Result<FormattedOutput> {
    let span = project_span(&project);
    async move {
        info!(
            scenarios = project.scenarios.len(),
            steps = project.step_count(),
            "Generating test cases"
        );

        let enriched = enrich_project(agent, &mut project).await?;
        debug!(enriched, "Enrichment complete");

        request_test_cases(agent, &project, format).await
    }
    .instrument(span)
    .await
}

fn project_span(project: &Project) -> Span {
    info_span!("project", project = %project.project)
}

async fn request_test_cases(
    agent: &dyn Agent,
    project: &Project,
    format: OutputFormat,
) -> Result<FormattedOutput> {
    let question = project.to_question()?;
    let reply = agent.text_to_test_cases(&question).await?;
    Ok(format_test_cases(reply.text()?, format))
}
