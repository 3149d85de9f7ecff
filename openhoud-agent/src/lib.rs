//! # openhoud Agent
//!
//! A local coding agent that drives a chat model through a fixed JSON action
//! protocol:
//! 1. The task goes to the model together with the protocol prompt
//! 2. The model answers with exactly one action (`LIST`, `READ`, `WRITE`, `GREP`, `RUN`, `DONE`)
//! 3. The action runs against a root-confined workspace
//! 4. The tool result is fed back as the next user message
//! 5. Repeat until `DONE`, three empty replies in a row, or the step budget runs out
//!
//! The pipeline layers a planning run on top: the planner returns a JSON list
//! of `{agent, task}` steps, each executed as its own loop.

mod action;
mod agent;
mod pipeline;
mod prompt;
mod tools;
mod transcript;
mod workspace;

#[cfg(test)]
mod testing;

pub use action::{decode, decode_plan, Action, DecodeError, PlanStep, ToolCall};
pub use agent::{
    Agent, AgentSettings, RunConfig, RunOutcome, RunStatus, DEFAULT_MAX_STEPS, DEFAULT_MODEL,
};
pub use pipeline::{AgentRole, Pipeline, PipelineOptions, PipelineOutcome};
pub use tools::{truncate, Capabilities, Limits, Toolbox, TRUNCATION_MARKER};
pub use transcript::Transcript;
pub use workspace::{Workspace, WorkspaceConfig};
