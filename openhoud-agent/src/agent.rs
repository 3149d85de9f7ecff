//! Agent control loop - model <-> tool cycle for one task

use crate::action::{decode, Action, DecodeError, ToolCall};
use crate::prompt::{self, EMPTY_OUTPUT_NOTICE, INVALID_OUTPUT_NOTICE, NO_SUMMARY};
use crate::tools::{truncate, Capabilities, Limits, Toolbox};
use crate::transcript::Transcript;
use openhoud_error::{Error, Result};
use openhoud_llm::{ChatMessage, CompletionRequest, LlmProvider, ProviderError, ResponseFormat};
use tracing::{debug, info, warn};

pub const DEFAULT_MODEL: &str = "qwen2.5-coder:7b";
pub const DEFAULT_MAX_STEPS: usize = 20;

/// Consecutive empty outputs that end a run
const STALL_THRESHOLD: usize = 3;
/// Characters of raw model output shown in debug logs
const RAW_PREVIEW_CHARS: usize = 400;

const STALLED_SUMMARY: &str = "Stalled with empty outputs.";
const MAX_STEPS_SUMMARY: &str = "Max steps reached.";

/// Parameters of one loop run; fixed once the run starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub task: String,
    pub model: String,
    pub max_steps: usize,
    pub capabilities: Capabilities,
}

impl RunConfig {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            model: DEFAULT_MODEL.to_string(),
            max_steps: DEFAULT_MAX_STEPS,
            capabilities: Capabilities::read_only(),
        }
    }

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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Stalled,
    MaxStepsReached,
    /// Never produced by the loop itself; the pipeline uses it for steps it refused
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Stalled => "stalled",
            RunStatus::MaxStepsReached => "max_steps_reached",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a loop run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub steps_taken: usize,
    pub summary: String,
}

impl RunOutcome {
    pub fn completed(steps_taken: usize, summary: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Completed,
            steps_taken,
            summary: summary.into(),
        }
    }

    pub fn stalled(steps_taken: usize) -> Self {
        Self {
            status: RunStatus::Stalled,
            steps_taken,
            summary: STALLED_SUMMARY.to_string(),
        }
    }

    pub fn max_steps_reached(steps_taken: usize) -> Self {
        Self {
            status: RunStatus::MaxStepsReached,
            steps_taken,
            summary: MAX_STEPS_SUMMARY.to_string(),
        }
    }

    pub fn failed(summary: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            steps_taken: 0,
            summary: summary.into(),
        }
    }
}

/// Loop behavior shared by every run of one agent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentSettings {
    /// Ask the backend for a JSON object response
    pub json_mode: bool,
    pub limits: Limits,
}

impl AgentSettings {
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

/// Result of feeding one model output into the loop
#[derive(Debug)]
enum Transition {
    Continue { transcript: Transcript, empty_streak: usize },
    Done { summary: String },
    Stalled,
}

/// Drives one task: asks the model for an action, runs it, feeds the result back
pub struct Agent<'a, P, T> {
    provider: &'a P,
    tools: &'a T,
    settings: AgentSettings,
}

impl<'a, P: LlmProvider, T: Toolbox> Agent<'a, P, T> {
    pub fn new(provider: &'a P, tools: &'a T) -> Self {
        Self {
            provider,
            tools,
            settings: AgentSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Run `config.task` until DONE, a stall, or the step budget runs out.
    ///
    /// Protocol failures from the model are folded back into the transcript;
    /// only provider failures surface as `Err`.
    pub async fn run(&self, config: &RunConfig) -> Result<RunOutcome> {
        if config.max_steps == 0 {
            return Err(Error::invalid_argument("max_steps must be at least 1").with_operation("agent::run"));
        }

        info!(
            provider = self.provider.name(),
            model = %config.model,
            max_steps = config.max_steps,
            allow_write = config.capabilities.allow_write,
            allow_run = config.capabilities.allow_run,
            "starting agent run"
        );

        let mut transcript = prompt::initial_transcript(&config.task);
        let mut empty_streak = 0;

        for step in 1..=config.max_steps {
            let raw = self
                .complete(&transcript, &config.model)
                .await
                .map_err(|e| e.with_context("step", step.to_string()))?;

            let preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
            debug!(step, raw = %preview, "model output");

            match self.advance(transcript, empty_streak, &raw, config.capabilities).await {
                Transition::Continue {
                    transcript: next,
                    empty_streak: streak,
                } => {
                    transcript = next;
                    empty_streak = streak;
                }
                Transition::Done { summary } => {
                    info!(step, "agent finished");
                    return Ok(RunOutcome::completed(step - 1, summary));
                }
                Transition::Stalled => {
                    warn!(step, "agent stalled on empty outputs");
                    return Ok(RunOutcome::stalled(step));
                }
            }
        }

        warn!(max_steps = config.max_steps, "step budget exhausted");
        Ok(RunOutcome::max_steps_reached(config.max_steps))
    }

    /// One step: decode `raw` and either finish or extend the transcript by one message
    async fn advance(
        &self,
        transcript: Transcript,
        empty_streak: usize,
        raw: &str,
        capabilities: Capabilities,
    ) -> Transition {
        let call = match decode(raw) {
            Ok(Action::Done { summary }) => {
                return Transition::Done {
                    summary: summary.unwrap_or_else(|| NO_SUMMARY.to_string()),
                };
            }
            Ok(Action::Tool(call)) => call,
            Err(DecodeError::Empty) => {
                let streak = empty_streak + 1;
                if streak >= STALL_THRESHOLD {
                    return Transition::Stalled;
                }
                warn!(streak, "empty model output");
                return Transition::Continue {
                    transcript: transcript.append(ChatMessage::user(EMPTY_OUTPUT_NOTICE)),
                    empty_streak: streak,
                };
            }
            Err(err @ DecodeError::Invalid(_)) => {
                warn!(error = %err, "undecodable model output");
                return Transition::Continue {
                    transcript: transcript.append(ChatMessage::user(INVALID_OUTPUT_NOTICE)),
                    empty_streak: 0,
                };
            }
        };

        info!(action = call.name(), "dispatching tool");
        let message = match self.dispatch(&call, capabilities).await {
            Ok(body) => prompt::tool_result(call.name(), &truncate(&body, self.settings.limits.tool_result_chars)),
            Err(err) => {
                warn!(action = call.name(), error = %err, "tool failed");
                prompt::tool_error(call.name(), err.message())
            }
        };

        Transition::Continue {
            transcript: transcript.append(ChatMessage::user(message)),
            empty_streak: 0,
        }
    }

    async fn dispatch(&self, call: &ToolCall, capabilities: Capabilities) -> Result<String> {
        match call {
            ToolCall::List { dir } => self.tools.list(dir).await,
            ToolCall::Read { path } => self.tools.read(path).await,
            ToolCall::Write { path, content } => {
                self.tools.write(path, content, capabilities.allow_write).await
            }
            ToolCall::Grep { pattern, dir } => self.tools.grep(pattern, dir).await,
            ToolCall::Run { command } => self.tools.run(command, capabilities.allow_run).await,
            ToolCall::Unknown { name } => Ok(format!("Unknown action: {}", name)),
        }
    }

    async fn complete(&self, transcript: &Transcript, model: &str) -> Result<String> {
        let mut request = CompletionRequest::new(transcript.messages().to_vec())
            .with_model(model)
            .with_temperature(0.0);
        if self.settings.json_mode {
            request = request.with_response_format(ResponseFormat::JsonObject);
        }

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(ProviderError::into_error)?;

        debug!(
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            finish_reason = ?response.finish_reason,
            "completion received"
        );
        Ok(response.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingToolbox, Reply, ScriptedProvider, ToolInvocation};
    use openhoud_error::ErrorKind;
    use openhoud_llm::Role;

    const LIST_ROOT: &str = r#"{"action":"LIST","args":{"dir":"."}}"#;

    fn last_user_message(request: &CompletionRequest) -> &str {
        let last = request.messages.last().unwrap();
        assert_eq!(last.role, Role::User);
        &last.content
    }

    #[tokio::test]
    async fn test_immediate_done() {
        let provider = ScriptedProvider::texts([r#"{"action":"DONE","summary":"ok"}"#]);
        let tools = RecordingToolbox::new();

        let outcome = Agent::new(&provider, &tools).run(&RunConfig::new("anything")).await.unwrap();

        assert_eq!(outcome, RunOutcome::completed(0, "ok"));
        assert_eq!(provider.calls(), 1);
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn test_done_without_summary() {
        let provider = ScriptedProvider::texts([r#"```json
{"action":"DONE"}
```"#]);
        let tools = RecordingToolbox::new();

        let outcome = Agent::new(&provider, &tools).run(&RunConfig::new("t")).await.unwrap();
        assert_eq!(outcome.summary, "(no summary)");
        assert!(outcome.status.is_completed());
    }

    #[tokio::test]
    async fn test_list_repo_root_end_to_end() {
        let provider = ScriptedProvider::texts([LIST_ROOT, r#"{"action":"DONE","summary":"listed"}"#]);
        let tools = RecordingToolbox::new().with_listing("📄 README.md\n📁 src");

        let outcome = Agent::new(&provider, &tools)
            .run(&RunConfig::new("List repo root"))
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.steps_taken, 1);
        assert_eq!(outcome.summary, "listed");
        assert_eq!(tools.calls(), vec![ToolInvocation::List { dir: ".".into() }]);

        let requests = provider.requests();
        assert_eq!(
            last_user_message(&requests[1]),
            "TOOL_RESULT LIST:\n📄 README.md\n📁 src\n\nReply with ONE JSON action only (no markdown)."
        );
    }

    #[tokio::test]
    async fn test_three_empty_outputs_stall() {
        let provider = ScriptedProvider::new([Reply::text(""), Reply::NoContent, Reply::text("   \n")]);
        let tools = RecordingToolbox::new();

        let outcome = Agent::new(&provider, &tools)
            .run(&RunConfig::new("t").with_max_steps(50))
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::stalled(3));
        assert_eq!(outcome.summary, "Stalled with empty outputs.");
        assert_eq!(provider.calls(), 3);
        assert_eq!(last_user_message(&provider.requests()[2]), EMPTY_OUTPUT_NOTICE);
    }

    #[tokio::test]
    async fn test_non_empty_output_resets_streak() {
        let provider = ScriptedProvider::texts(["", "", "not json", "", "", r#"{"action":"DONE","summary":"ok"}"#]);
        let tools = RecordingToolbox::new();

        let outcome = Agent::new(&provider, &tools).run(&RunConfig::new("t")).await.unwrap();

        assert_eq!(outcome, RunOutcome::completed(5, "ok"));
        assert_eq!(last_user_message(&provider.requests()[3]), INVALID_OUTPUT_NOTICE);
    }

    #[tokio::test]
    async fn test_step_budget_ends_before_stall() {
        let provider = ScriptedProvider::repeating(Reply::text(""));
        let tools = RecordingToolbox::new();

        let outcome = Agent::new(&provider, &tools)
            .run(&RunConfig::new("t").with_max_steps(2))
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::max_steps_reached(2));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_max_steps_makes_exactly_n_calls() {
        let provider = ScriptedProvider::repeating(Reply::text(LIST_ROOT));
        let tools = RecordingToolbox::new();

        let outcome = Agent::new(&provider, &tools)
            .run(&RunConfig::new("t").with_max_steps(4))
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::max_steps_reached(4));
        assert_eq!(outcome.summary, "Max steps reached.");
        assert_eq!(provider.calls(), 4);
        assert_eq!(tools.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_transcript_grows_one_message_per_step() {
        let provider = ScriptedProvider::texts(["", "junk", LIST_ROOT, r#"{"action":"DONE"}"#]);
        let tools = RecordingToolbox::new();

        Agent::new(&provider, &tools).run(&RunConfig::new("t")).await.unwrap();

        let lengths: Vec<usize> = provider.requests().iter().map(|r| r.messages.len()).collect();
        assert_eq!(lengths, vec![6, 7, 8, 9]);
        for request in provider.requests() {
            assert!(request.messages.iter().skip(6).all(|m| m.role == Role::User));
        }
    }

    #[tokio::test]
    async fn test_request_parameters() {
        let provider = ScriptedProvider::texts([r#"{"action":"DONE"}"#]);
        let tools = RecordingToolbox::new();
        let settings = AgentSettings::default().with_json_mode(true);

        Agent::new(&provider, &tools)
            .with_settings(settings)
            .run(&RunConfig::new("t").with_model("deepseek-coder"))
            .await
            .unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.model.as_deref(), Some("deepseek-coder"));
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.response_format, ResponseFormat::JsonObject);
    }

    #[tokio::test]
    async fn test_tool_result_is_truncated() {
        let provider = ScriptedProvider::texts([LIST_ROOT, r#"{"action":"DONE"}"#]);
        let tools = RecordingToolbox::new().with_listing("abcdefghij");
        let settings = AgentSettings::default().with_limits(Limits {
            tool_result_chars: 4,
            ..Limits::default()
        });

        Agent::new(&provider, &tools)
            .with_settings(settings)
            .run(&RunConfig::new("t"))
            .await
            .unwrap();

        assert_eq!(
            last_user_message(&provider.requests()[1]),
            "TOOL_RESULT LIST:\nabcd\n...[truncated]\n\nReply with ONE JSON action only (no markdown)."
        );
    }

    #[tokio::test]
    async fn test_tool_error_is_folded_back() {
        let provider = ScriptedProvider::texts([
            r#"{"action":"READ","args":{"path":"missing.rs"}}"#,
            r#"{"action":"DONE","summary":"gave up"}"#,
        ]);
        let tools = RecordingToolbox::new().failing_reads();

        let outcome = Agent::new(&provider, &tools).run(&RunConfig::new("t")).await.unwrap();

        assert_eq!(outcome, RunOutcome::completed(1, "gave up"));
        let message = last_user_message(&provider.requests()[1]).to_string();
        assert!(message.starts_with("TOOL_RESULT READ ERROR:\nno such file: missing.rs"));
        assert!(message.ends_with("Reply with ONE JSON action only (no markdown)."));
    }

    #[tokio::test]
    async fn test_unknown_action_is_reported() {
        let provider = ScriptedProvider::texts([r#"{"action":"DELETE","args":{"path":"x"}}"#, r#"{"action":"DONE"}"#]);
        let tools = RecordingToolbox::new();

        Agent::new(&provider, &tools).run(&RunConfig::new("t")).await.unwrap();

        assert!(tools.calls().is_empty());
        assert_eq!(
            last_user_message(&provider.requests()[1]),
            "TOOL_RESULT DELETE:\nUnknown action: DELETE\n\nReply with ONE JSON action only (no markdown)."
        );
    }

    #[tokio::test]
    async fn test_capabilities_reach_tools() {
        let provider = ScriptedProvider::texts([
            r#"{"action":"WRITE","args":{"path":"a.txt","content":"x"}}"#,
            r#"{"action":"RUN","args":{"command":"ls"}}"#,
            r#"{"action":"DONE"}"#,
        ]);
        let tools = RecordingToolbox::new();
        let config = RunConfig::new("t").with_capabilities(Capabilities::read_only().with_run(true));

        Agent::new(&provider, &tools).run(&config).await.unwrap();

        assert_eq!(
            tools.calls(),
            vec![
                ToolInvocation::Write {
                    path: "a.txt".into(),
                    content: "x".into(),
                    allow_write: false,
                },
                ToolInvocation::Run {
                    command: "ls".into(),
                    allow_run: true,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let provider = ScriptedProvider::new([Reply::text(LIST_ROOT), Reply::Fail]);
        let tools = RecordingToolbox::new();

        let err = Agent::new(&provider, &tools).run(&RunConfig::new("t")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NetworkFailed);
        assert!(err.context().contains(&("step", "2".to_string())));
    }

    #[tokio::test]
    async fn test_zero_step_budget_is_rejected() {
        let provider = ScriptedProvider::repeating(Reply::Fail);
        let tools = RecordingToolbox::new();

        let err = Agent::new(&provider, &tools)
            .run(&RunConfig::new("t").with_max_steps(0))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_advance_from_arbitrary_state() {
        let provider = ScriptedProvider::repeating(Reply::Fail);
        let tools = RecordingToolbox::new();
        let agent = Agent::new(&provider, &tools);
        let base = prompt::initial_transcript("t");

        let transition = agent.advance(base.clone(), 2, "", Capabilities::default()).await;
        assert!(matches!(transition, Transition::Stalled));

        let transition = agent.advance(base.clone(), 1, "", Capabilities::default()).await;
        let Transition::Continue { transcript, empty_streak } = transition else {
            panic!("expected continue");
        };
        assert_eq!(empty_streak, 2);
        assert_eq!(transcript.len(), base.len() + 1);
    }
}
