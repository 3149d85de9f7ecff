//! Action protocol codec
//!
//! Turns raw model text into a typed [`Action`]. Models like to wrap their
//! JSON in markdown fences or prose, so decoding tries, in order:
//!
//! 1. the inner text of the first fenced block, if there is one;
//! 2. a strict JSON parse of that candidate;
//! 3. a parse of the span from the first `{` to the last `}`.
//!
//! There is no attempt to repair malformed JSON.

use serde_json::{Map, Value};
use std::fmt;

/// One decoded instruction from the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A tool the loop should dispatch
    Tool(ToolCall),
    /// The model considers the task finished
    Done { summary: Option<String> },
}

/// Tool-bound actions, including names outside the protocol vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    List { dir: String },
    Read { path: String },
    Write { path: String, content: String },
    Grep { pattern: String, dir: String },
    Run { command: String },
    Unknown { name: String },
}

impl ToolCall {
    /// Protocol name, as echoed back in `TOOL_RESULT <NAME>:`
    pub fn name(&self) -> &str {
        match self {
            ToolCall::List { .. } => "LIST",
            ToolCall::Read { .. } => "READ",
            ToolCall::Write { .. } => "WRITE",
            ToolCall::Grep { .. } => "GREP",
            ToolCall::Run { .. } => "RUN",
            ToolCall::Unknown { name } => name,
        }
    }
}

/// Why raw model text did not yield an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Nothing but whitespace
    Empty,
    /// Text present, but no usable JSON object
    Invalid(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "empty output"),
            DecodeError::Invalid(reason) => write!(f, "invalid output: {}", reason),
        }
    }
}

impl std::error::Error for DecodeError {}

/// One entry of a planner's output, before role validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanStep {
    pub agent: Option<String>,
    pub task: Option<String>,
}

impl PlanStep {
    pub fn new(agent: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            agent: Some(agent.into()),
            task: Some(task.into()),
        }
    }
}

/// Decode one step's model output into an action
pub fn decode(raw: &str) -> Result<Action, DecodeError> {
    let value = extract_json(raw, '{', '}')?;
    action_from_value(&value)
}

/// Decode a planner summary into its ordered steps.
///
/// Shares fence stripping with [`decode`]; the fallback span is `[`..`]`.
pub fn decode_plan(summary: &str) -> Result<Vec<PlanStep>, DecodeError> {
    let value = extract_json(summary, '[', ']')?;
    let Value::Array(items) = value else {
        return Err(DecodeError::Invalid("plan is not a JSON array".into()));
    };

    Ok(items
        .iter()
        .map(|item| PlanStep {
            agent: non_empty_str(item.get("agent")),
            task: non_empty_str(item.get("task")),
        })
        .collect())
}

fn extract_json(raw: &str, open: char, close: char) -> Result<Value, DecodeError> {
    if raw.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let candidate = fenced_block(raw).unwrap_or(raw);
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Ok(value);
    }

    match (candidate.find(open), candidate.rfind(close)) {
        (Some(start), Some(end)) if end > start => {
            serde_json::from_str(&candidate[start..=end]).map_err(|e| DecodeError::Invalid(e.to_string()))
        }
        _ => Err(DecodeError::Invalid("no JSON found".into())),
    }
}

/// Inner text of the first ``` fence, with an optional `json` tag removed
fn fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```")? + 3;
    let rest = &raw[start..];
    let end = rest.find("```")?;
    let mut inner = &rest[..end];

    if inner.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
        inner = &inner[4..];
    }
    Some(inner.trim())
}

fn action_from_value(value: &Value) -> Result<Action, DecodeError> {
    let Some(obj) = value.as_object() else {
        return Err(DecodeError::Invalid("expected a JSON object".into()));
    };
    let Some(name) = non_empty_str(obj.get("action")) else {
        return Err(DecodeError::Invalid("missing string field 'action'".into()));
    };

    let empty = Map::new();
    let args = obj.get("args").and_then(Value::as_object).unwrap_or(&empty);
    let arg = |key: &str| text(args.get(key)).unwrap_or_default();
    let dir = || text(args.get("dir")).filter(|d| !d.is_empty()).unwrap_or_else(|| ".".into());

    let call = match name.as_str() {
        "DONE" => {
            let summary = text(obj.get("summary"))
                .or_else(|| text(args.get("summary")))
                .filter(|s| !s.is_empty());
            return Ok(Action::Done { summary });
        }
        "LIST" => ToolCall::List { dir: dir() },
        "READ" => ToolCall::Read { path: arg("path") },
        "WRITE" => ToolCall::Write {
            path: arg("path"),
            content: arg("content"),
        },
        "GREP" => ToolCall::Grep {
            pattern: arg("pattern"),
            dir: dir(),
        },
        "RUN" => ToolCall::Run {
            command: arg("command"),
        },
        _ => ToolCall::Unknown { name: name.clone() },
    };
    Ok(Action::Tool(call))
}

/// Strings pass through; other non-null values become their JSON text
fn text(value: Option<&Value>) -> Option<String> {
    let value = value?;
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(_) | Value::Array(_) => serde_json::to_string(value).ok(),
        other => Some(other.to_string()),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
