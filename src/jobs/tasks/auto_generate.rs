use std::sync::{Arc, LazyLock};
use std::time::Duration;

use rand::seq::IndexedRandom;
use regex::Regex;
use tracing::{info, warn};

use crate::config::GenerationJobConfig;
use crate::error::AppResult;
use crate::external::{CompletionClient, CompletionRequest};
use crate::jobs::error::JobError;
use crate::jobs::job::JobDefinition;
use crate::jobs::types::JobContext;
use crate::models::{NewTask, TaskKind};
use crate::repositories::TaskStore;

pub const JOB_NAME: &str = "task-auto-generate";

/// Style nudges mixed into prompts so consecutive batches do not converge on
/// the same phrasing.
const STYLE_HINTS: &[&str] = &[
    "Make them playful and lighthearted.",
    "Make them bold but safe for a living room.",
    "Aim for quick ones that take under a minute.",
    "Favor ideas nobody has seen in this game before.",
    "Keep the wording short and punchy.",
];

/// Strips leading list markers the model tends to add despite instructions
/// ("1. ", "2) ", "- ", "* ").
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]\s*|[-*•]\s*)").unwrap());

#[derive(Clone)]
struct GenerationParams {
    categories: Vec<String>,
    batch_size: u32,
    sample_size: u32,
    max_retries: u32,
    retry_delay: Duration,
}

/// Builds the job that asks the completion API for fresh truth and dare
/// tasks and stores them per category.
pub fn job(
    config: &GenerationJobConfig,
    tasks: Arc<dyn TaskStore>,
    ai: Arc<dyn CompletionClient>,
) -> JobDefinition {
    let params = GenerationParams {
        categories: config.categories.clone(),
        batch_size: config.batch_size,
        sample_size: config.sample_size,
        max_retries: config.max_retries,
        retry_delay: Duration::from_secs(config.retry_delay),
    };

    JobDefinition::new(JOB_NAME, &config.schedule, config.enabled, move |ctx| {
        let tasks = Arc::clone(&tasks);
        let ai = Arc::clone(&ai);
        let params = params.clone();
        run(ctx, tasks, ai, params)
    })
    .with_description("Generates new truth and dare tasks via the completion API")
}

async fn run(
    ctx: JobContext,
    tasks: Arc<dyn TaskStore>,
    ai: Arc<dyn CompletionClient>,
    params: GenerationParams,
) -> AppResult<()> {
    let mut inserted_total = 0usize;

    for category in &params.categories {
        for kind in [TaskKind::Truth, TaskKind::Dare] {
            if ctx.is_cancelled() {
                info!(inserted = inserted_total, "generation interrupted by shutdown");
                return Err(JobError::Cancelled.into());
            }

            let recent = tasks
                .recent_texts(category, kind, i64::from(params.sample_size))
                .await?;
            let request = build_prompt(category, kind, params.batch_size, &recent);
            let response = complete_with_retry(
                &ctx,
                ai.as_ref(),
                request,
                params.max_retries,
                params.retry_delay,
            )
            .await?;

            let texts = parse_task_lines(&response, params.batch_size as usize);
            if texts.is_empty() {
                warn!(category, kind = %kind, "model returned no usable lines");
                continue;
            }

            let rows: Vec<NewTask> = texts
                .into_iter()
                .map(|text| NewTask::generated(category, kind, text))
                .collect();
            let stored = tasks.insert_tasks(&rows).await?;
            inserted_total += stored.len();

            info!(category, kind = %kind, inserted = stored.len(), "generated tasks stored");
        }
    }

    info!(inserted = inserted_total, "generation pass finished");
    Ok(())
}

fn build_prompt(
    category: &str,
    kind: TaskKind,
    batch_size: u32,
    recent: &[String],
) -> CompletionRequest {
    let hint = STYLE_HINTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or_default();

    let noun = match kind {
        TaskKind::Truth => "truth questions",
        TaskKind::Dare => "dare challenges",
    };

    let mut user = format!(
        "Write {batch_size} new {noun} for the \"{category}\" category of a \
         truth-or-dare party game. {hint}\n\
         Respond with one prompt per line, no numbering and no commentary."
    );

    if !recent.is_empty() {
        user.push_str("\n\nAvoid repeating these existing prompts:\n");
        for text in recent {
            user.push_str("- ");
            user.push_str(text);
            user.push('\n');
        }
    }

    CompletionRequest {
        system: "You write content for a mobile truth-or-dare party game. \
                 Every prompt must be playable indoors, safe, and in English."
            .to_string(),
        user,
        temperature: Some(0.9),
    }
}

async fn complete_with_retry(
    ctx: &JobContext,
    ai: &dyn CompletionClient,
    request: CompletionRequest,
    max_retries: u32,
    retry_delay: Duration,
) -> AppResult<String> {
    let mut attempt = 0;
    loop {
        match ai.complete(request.clone()).await {
            Ok(response) => return Ok(response),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                warn!(attempt, max_retries, error = %e, "completion request failed, retrying");
                tokio::select! {
                    _ = ctx.cancelled() => return Err(JobError::Cancelled.into()),
                    _ = tokio::time::sleep(retry_delay) => {}
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Turns a model response into clean task texts: one per line, list markers
/// and wrapping quotes stripped, section headers dropped, capped at `cap`.
fn parse_task_lines(response: &str, cap: usize) -> Vec<String> {
    response
        .lines()
        .map(|line| {
            let stripped = LIST_MARKER.replace(line, "");
            stripped.trim().trim_matches('"').trim().to_string()
        })
        .filter(|line| !line.is_empty() && !line.ends_with(':'))
        .take(cap)
        .collect()
}
