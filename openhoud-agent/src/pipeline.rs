//! Planned multi-agent pipeline
//!
//! A planning run turns the task into `{agent, task}` steps; each step then
//! runs as its own loop with capabilities derived from its role. Steps run
//! strictly in plan order.

use crate::action::{decode_plan, PlanStep};
use crate::agent::{Agent, AgentSettings, RunConfig, RunOutcome, DEFAULT_MAX_STEPS, DEFAULT_MODEL};
use crate::prompt;
use crate::tools::{Capabilities, Toolbox};
use openhoud_error::Result;
use openhoud_llm::LlmProvider;
use tracing::{info, warn};

/// Specialised agents a plan may name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Writer,
    Reader,
    Docs,
    Chat,
}

impl AgentRole {
    /// Exact, case-sensitive match on the role name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "writer" => Some(AgentRole::Writer),
            "reader" => Some(AgentRole::Reader),
            "docs" => Some(AgentRole::Docs),
            "chat" => Some(AgentRole::Chat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Writer => "writer",
            AgentRole::Reader => "reader",
            AgentRole::Docs => "docs",
            AgentRole::Chat => "chat",
        }
    }

    /// Only `writer` may write; every role keeps the caller's run permission
    pub fn capabilities(&self, allow_run: bool) -> Capabilities {
        Capabilities::read_only()
            .with_write(matches!(self, AgentRole::Writer))
            .with_run(allow_run)
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Caller-side settings applied to the planner and every step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub model: String,
    pub max_steps: usize,
    pub capabilities: Capabilities,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_steps: DEFAULT_MAX_STEPS,
            capabilities: Capabilities::read_only(),
        }
    }
}

impl PipelineOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    fn run_config(&self, task: impl Into<String>, capabilities: Capabilities) -> RunConfig {
        RunConfig::new(task)
            .with_model(self.model.clone())
            .with_max_steps(self.max_steps)
            .with_capabilities(capabilities)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// How the planning run itself ended
    pub planner: RunOutcome,
    pub plan: Vec<PlanStep>,
    /// One outcome per plan step, in plan order
    pub results: Vec<RunOutcome>,
}

pub struct Pipeline<'a, P, T> {
    agent: Agent<'a, P, T>,
}

impl<'a, P: LlmProvider, T: Toolbox> Pipeline<'a, P, T> {
    pub fn new(provider: &'a P, tools: &'a T) -> Self {
        Self {
            agent: Agent::new(provider, tools),
        }
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.agent = self.agent.with_settings(settings);
        self
    }

    /// Ask the model for a plan. An unfinished planner or an unreadable plan
    /// gives an empty plan, not an error.
    pub async fn plan(&self, task: &str, options: &PipelineOptions) -> Result<(RunOutcome, Vec<PlanStep>)> {
        let config = options.run_config(prompt::planning_task(task), options.capabilities);
        let outcome = self.agent.run(&config).await?;

        if !outcome.status.is_completed() {
            warn!(status = %outcome.status, "planner did not complete; empty plan");
            return Ok((outcome, Vec::new()));
        }

        let plan = match decode_plan(&outcome.summary) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(error = %err, "planner summary is not a plan; empty plan");
                Vec::new()
            }
        };
        info!(steps = plan.len(), "plan ready");
        Ok((outcome, plan))
    }

    pub async fn plan_and_run(&self, task: &str, options: &PipelineOptions) -> Result<PipelineOutcome> {
        let (planner, plan) = self.plan(task, options).await?;

        let mut results = Vec::with_capacity(plan.len());
        for (index, step) in plan.iter().enumerate() {
            let outcome = self.run_step(step, options).await?;
            info!(step = index + 1, status = %outcome.status, "pipeline step finished");
            results.push(outcome);
        }

        Ok(PipelineOutcome {
            planner,
            plan,
            results,
        })
    }

    async fn run_step(&self, step: &PlanStep, options: &PipelineOptions) -> Result<RunOutcome> {
        let (Some(name), Some(task)) = (step.agent.as_deref(), step.task.as_deref()) else {
            warn!(?step, "invalid plan step");
            return Ok(RunOutcome::failed("Invalid step"));
        };
        let Some(role) = AgentRole::from_name(name) else {
            warn!(agent = name, "unknown agent in plan");
            return Ok(RunOutcome::failed(format!("Unknown agent: {}", name)));
        };

        info!(agent = %role, "running plan step");
        let capabilities = role.capabilities(options.capabilities.allow_run);
        self.agent.run(&options.run_config(task, capabilities)).await
    }
}
