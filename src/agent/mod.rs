//! The agent state machine: plan, act, invoke tools or vision, observe.
//!
//! One agent run drives a single task from `Planning` to a terminal state.
//! Transitions:
//!
//! ```text
//! Planning -> Acting -> (ToolInvocation | VisionInvocation)* -> Observing
//!          -> {Planning | Done | Failed}
//! ```
//!
//! A replan cap bounds `Planning` re-entries, a step cap bounds actions,
//! and a wall-clock budget is checked before every model or tool call.
//! The agent returns one [`TaskResult`] to its caller and persists nothing.

mod action;
mod transcript;

pub use action::AgentAction;
pub use transcript::{Transcript, TranscriptEntry};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::bench::{RoleCounters, Task, TaskResult, TaskSolver, TaskStatus};
use crate::config::Role;
use crate::error::AgentError;
use crate::llm::{with_retries, ChatRequest, Message, RetryPolicy, RoleModels};
use crate::tools::SearchClient;

const PLANNER_SYSTEM_PROMPT: &str = "You are the planner of a research agent. \
Break the task into a short ordered list of concrete sub-steps. \
Use the transcript of previous attempts, if any, to avoid repeating dead ends. \
Output only the numbered plan.";

const ACTOR_SYSTEM_PROMPT: &str = r#"You are the actor of a research agent. Given the plan and the transcript, choose exactly one next action and reply with a single JSON object, nothing else:
{"action": "call_tool", "name": "web_search", "query": "<search query>"}
{"action": "call_vision", "instruction": "<what to inspect>", "image_ref": "<optional path>"}
{"action": "replan", "reason": "<why the plan is blocked>"}
{"action": "emit_answer", "answer": "<final answer>"}
Emit the final answer as soon as the transcript contains enough information."#;

const TOOL_SUMMARY_PROMPT: &str = "You summarize web search results for a research agent. \
Extract only the facts relevant to the query, with their sources. Be brief.";

const VISION_SYSTEM_PROMPT: &str = "You are the vision module of a research agent. \
Answer the instruction about the referenced image or visual material as precisely as possible.";

/// Limits and knobs for one agent run.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum `Planning` re-entries before the run fails.
    pub max_replans: u32,
    /// Maximum actions before the run fails.
    pub max_steps: u32,
    /// Wall-clock budget for the whole task.
    pub task_budget: Duration,
    /// Retry policy for model calls.
    pub retry: RetryPolicy,
    /// Search hits requested per tool invocation.
    pub search_results: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_replans: 3,
            max_steps: 25,
            task_budget: Duration::from_secs(900),
            retry: RetryPolicy::default(),
            search_results: 5,
        }
    }
}

impl AgentConfig {
    /// Sets the replan cap.
    pub fn with_max_replans(mut self, limit: u32) -> Self {
        self.max_replans = limit;
        self
    }

    /// Sets the step cap.
    pub fn with_max_steps(mut self, limit: u32) -> Self {
        self.max_steps = limit;
        self
    }

    /// Sets the wall-clock budget.
    pub fn with_task_budget(mut self, budget: Duration) -> Self {
        self.task_budget = budget;
        self
    }
}

/// A multi-role agent bound to shared models and tool clients.
///
/// Cheap to share: one instance solves many tasks concurrently, holding
/// only read-only state.
pub struct Agent {
    models: Arc<RoleModels>,
    search_clients: Arc<Vec<Box<dyn SearchClient>>>,
    config: AgentConfig,
}

impl Agent {
    /// Creates an agent over the shared role models and search clients.
    pub fn new(
        models: Arc<RoleModels>,
        search_clients: Arc<Vec<Box<dyn SearchClient>>>,
        config: AgentConfig,
    ) -> Self {
        Self {
            models,
            search_clients,
            config,
        }
    }

    async fn run_loop(
        &self,
        task: &Task,
        started: Instant,
        counters: &mut RoleCounters,
    ) -> Result<String, AgentError> {
        let mut transcript = Transcript::new();
        let mut replans = 0u32;
        let mut steps = 0u32;

        loop {
            // Planning state.
            let plan = self
                .invoke_plan(task, &transcript, started, counters)
                .await?;
            debug!(task_id = %task.id, plan = %plan, "Plan created");
            transcript.push("plan", plan);

            // Acting state, until the plan is exhausted or replaced.
            loop {
                if steps >= self.config.max_steps {
                    return Err(AgentError::StepLimitExceeded {
                        limit: self.config.max_steps,
                    });
                }
                steps += 1;

                let raw = self
                    .invoke_act(task, &transcript, started, counters)
                    .await?;
                let agent_action = match AgentAction::parse(&raw) {
                    Ok(agent_action) => agent_action,
                    Err(e) => {
                        // One bad reply is an observation, not a fault; the
                        // step cap bounds repetition.
                        warn!(task_id = %task.id, error = %e, "Unparseable action");
                        transcript
                            .push("observation", format!("previous reply was rejected: {e}"));
                        continue;
                    }
                };

                match agent_action {
                    AgentAction::CallTool { name, query } => {
                        let observation = self
                            .invoke_search(&name, &query, started, counters)
                            .await?;
                        transcript.push("tool", observation);
                    }
                    AgentAction::CallVision {
                        instruction,
                        image_ref,
                    } => {
                        let observation = self
                            .invoke_vision(&instruction, image_ref.as_deref(), started, counters)
                            .await?;
                        transcript.push("vision", observation);
                    }
                    AgentAction::Replan { reason } => {
                        replans += 1;
                        if replans > self.config.max_replans {
                            return Err(AgentError::PlanLoopExceeded {
                                limit: self.config.max_replans,
                            });
                        }
                        info!(task_id = %task.id, replans, reason = %reason, "Replanning");
                        transcript.push("observation", format!("replanning requested: {reason}"));
                        break;
                    }
                    AgentAction::EmitAnswer { answer } => {
                        return Ok(answer);
                    }
                }
            }
        }
    }

    async fn invoke_plan(
        &self,
        task: &Task,
        transcript: &Transcript,
        started: Instant,
        counters: &mut RoleCounters,
    ) -> Result<String, AgentError> {
        self.check_budget(started)?;

        let mut prompt = format!("Task: {}", task.prompt);
        if let Some(ref file_name) = task.file_name {
            prompt.push_str(&format!("\nAttached file: {file_name}"));
        }
        if !transcript.is_empty() {
            prompt.push_str(&format!("\n\nTranscript so far:\n{}", transcript.render()));
        }

        let content = self
            .invoke_role(
                Role::Plan,
                vec![Message::system(PLANNER_SYSTEM_PROMPT), Message::user(prompt)],
                counters,
            )
            .await?;
        Ok(content)
    }

    async fn invoke_act(
        &self,
        task: &Task,
        transcript: &Transcript,
        started: Instant,
        counters: &mut RoleCounters,
    ) -> Result<String, AgentError> {
        self.check_budget(started)?;

        let prompt = format!(
            "Task: {}\n\nTranscript:\n{}",
            task.prompt,
            transcript.render()
        );

        self.invoke_role(
            Role::Act,
            vec![Message::system(ACTOR_SYSTEM_PROMPT), Message::user(prompt)],
            counters,
        )
        .await
    }

    /// Runs a web search and condenses the hits with the tool-role model.
    ///
    /// No usable search provider is a soft degradation: the observation
    /// says so and the loop continues.
    async fn invoke_search(
        &self,
        tool_name: &str,
        query: &str,
        started: Instant,
        counters: &mut RoleCounters,
    ) -> Result<String, AgentError> {
        self.check_budget(started)?;

        if self.search_clients.is_empty() {
            return Ok(format!(
                "tool '{tool_name}' unavailable: no search provider configured; \
                 answer from existing knowledge or replan"
            ));
        }

        let mut last_error = None;
        for client in self.search_clients.iter() {
            match client.search(query, self.config.search_results).await {
                Ok(hits) if hits.is_empty() => {
                    return Ok(format!("search '{query}' returned no results"));
                }
                Ok(hits) => {
                    let raw: String = hits
                        .iter()
                        .map(|h| format!("- {} ({})\n  {}", h.title, h.url, h.snippet))
                        .collect::<Vec<_>>()
                        .join("\n");

                    self.check_budget(started)?;
                    let summary = self
                        .invoke_role(
                            Role::Tool,
                            vec![
                                Message::system(TOOL_SUMMARY_PROMPT),
                                Message::user(format!("Query: {query}\n\nResults:\n{raw}")),
                            ],
                            counters,
                        )
                        .await?;
                    return Ok(summary);
                }
                Err(e) => {
                    warn!(provider = %client.provider(), error = %e, "Search provider failed");
                    last_error = Some(e);
                }
            }
        }

        // Every provider failed; degrade rather than fail the task.
        Ok(format!(
            "search '{query}' failed on all providers: {}",
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string())
        ))
    }

    async fn invoke_vision(
        &self,
        instruction: &str,
        image_ref: Option<&str>,
        started: Instant,
        counters: &mut RoleCounters,
    ) -> Result<String, AgentError> {
        self.check_budget(started)?;

        let mut prompt = instruction.to_string();
        if let Some(image_ref) = image_ref {
            prompt.push_str(&format!("\nImage: {image_ref}"));
        }

        self.invoke_role(
            Role::Vision,
            vec![Message::system(VISION_SYSTEM_PROMPT), Message::user(prompt)],
            counters,
        )
        .await
    }

    /// One retried chat call against a role's model, with counters.
    async fn invoke_role(
        &self,
        role: Role,
        messages: Vec<Message>,
        counters: &mut RoleCounters,
    ) -> Result<String, AgentError> {
        let model = self.models.get(role);
        let call_started = Instant::now();

        let response = with_retries(self.config.retry, &role.to_string(), || {
            model.chat(ChatRequest::new(messages.clone()))
        })
        .await?;

        counters.record(role, &response.usage);
        debug!(
            role = %role,
            latency_ms = call_started.elapsed().as_millis() as u64,
            tokens = response.usage.total_tokens,
            "Model call complete"
        );

        response
            .first_content()
            .map(str::to_string)
            .ok_or_else(|| {
                AgentError::Llm(crate::error::LlmError::ParseError(
                    "No content in model response".to_string(),
                ))
            })
    }

    fn check_budget(&self, started: Instant) -> Result<(), AgentError> {
        if started.elapsed() >= self.config.task_budget {
            Err(AgentError::BudgetExceeded(self.config.task_budget))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskSolver for Agent {
    async fn solve(&self, task: &Task) -> TaskResult {
        let started = Instant::now();
        let mut counters = RoleCounters::default();

        match self.run_loop(task, started, &mut counters).await {
            Ok(answer) => TaskResult::success(task, answer, started.elapsed(), counters),
            Err(e) => {
                let status = if e.is_timeout() {
                    TaskStatus::Timeout
                } else {
                    TaskStatus::AgentError
                };
                warn!(task_id = %task.id, status = %status, error = %e, "Agent run failed");
                TaskResult::failure(task, status, e.to_string(), started.elapsed(), counters)
            }
        }
    }
}
