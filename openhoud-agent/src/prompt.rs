//! Prompt text for the action protocol
//!
//! The action names, the `TOOL_RESULT <ACTION>:` prefix and the reply
//! instruction are what models are tuned against; they must stay byte-exact.

use crate::transcript::Transcript;
use openhoud_llm::ChatMessage;

pub const SYSTEM_PROMPT: &str = r#"
You are a careful coding agent inside a local repository.

TOOLS (one per step):
- LIST(dir=".")                -> list files
- READ(path)                   -> read file
- WRITE(path, content)         -> overwrite file (caller may be DRY-RUN)
- GREP(pattern, dir=".")       -> literal search
- RUN(command)                 -> shell (caller may restrict)

PROTOCOL:
1) You respond with EXACTLY ONE compact JSON object per step. No markdown, no comments.
2) I will send back a message starting with "TOOL_RESULT <ACTION>:" containing the tool output.
3) After each TOOL_RESULT, you MUST return the NEXT JSON action (or DONE).

JSON EXAMPLES:
{"action":"LIST","args":{"dir":"src"}}
{"action":"READ","args":{"path":"src/main.rs"}}
{"action":"WRITE","args":{"path":"x.py","content":"..."}}
{"action":"GREP","args":{"pattern":"TODO","dir":"src"}}
{"action":"RUN","args":{"command":"cargo test -q"}}
{"action":"DONE","summary":"what changed & next steps"}

Policies:
- Discover with LIST/GREP before editing.
- Always READ a file before WRITE; WRITE must include full new content.
- Keep steps small; on DONE give a brief summary.
"#;

pub const REPLY_INSTRUCTION: &str = "Reply with ONE JSON action only (no markdown).";

pub const EMPTY_OUTPUT_NOTICE: &str =
    "Empty output. Reply with ONE JSON action per the protocol (no markdown).";

pub const INVALID_OUTPUT_NOTICE: &str = "Invalid output. Reply with EXACTLY ONE JSON object.";

/// Summary used when the model finishes without one
pub const NO_SUMMARY: &str = "(no summary)";

/// System prompt, a short worked exchange, then the task.
pub fn initial_transcript(task: &str) -> Transcript {
    [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user("List repository root."),
        ChatMessage::assistant(r#"{"action":"LIST","args":{"dir":"."}}"#),
        ChatMessage::user(tool_result("LIST", "📄 README.md")),
        ChatMessage::assistant(r#"{"action":"READ","args":{"path":"README.md"}}"#),
        ChatMessage::user(task),
    ]
    .into_iter()
    .collect()
}

pub fn tool_result(action: &str, body: &str) -> String {
    format!("TOOL_RESULT {}:\n{}\n\n{}", action, body, REPLY_INSTRUCTION)
}

pub fn tool_error(action: &str, error: &str) -> String {
    format!("TOOL_RESULT {} ERROR:\n{}\n\n{}", action, error, REPLY_INSTRUCTION)
}

/// Task handed to the planning loop
pub fn planning_task(task: &str) -> String {
    format!(
        "You are a planning agent that designs a pipeline for other agents.\n\
         Return a JSON array of steps. Each step is an object with:\n  \
         - \"agent\": one of \"writer\", \"reader\", \"docs\", \"chat\"\n  \
         - \"task\": instruction for that agent.\n\
         No additional text. Only valid JSON.\n\
         Finish with a DONE action whose summary is that JSON array.\n\n\
         User task: {}",
        task
    )
}
