//! Scripted doubles for loop and pipeline tests

use crate::tools::Toolbox;
use openhoud_error::{Error, Result};
use openhoud_llm::{CompletionRequest, CompletionResponse, LlmProvider, ProviderError};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One canned provider reply
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Text(String),
    NoContent,
    Fail,
}

impl Reply {
    pub(crate) fn text(content: impl Into<String>) -> Self {
        Reply::Text(content.into())
    }
}

/// Plays back replies in order; once exhausted, repeats `fallback`
pub(crate) struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            fallback: Reply::Fail,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn texts<'s>(replies: impl IntoIterator<Item = &'s str>) -> Self {
        Self::new(replies.into_iter().map(Reply::text))
    }

    pub(crate) fn repeating(reply: Reply) -> Self {
        Self::new(VecDeque::new()).with_fallback(reply)
    }

    pub(crate) fn with_fallback(mut self, reply: Reply) -> Self {
        self.fallback = reply;
        self
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Text(content) => Ok(CompletionResponse::text(content)),
            Reply::NoContent => {
                let mut response = CompletionResponse::text("");
                response.content = None;
                Ok(response)
            }
            Reply::Fail => Err(ProviderError::Network("scripted failure".into())),
        }
    }
}

/// A toolbox call as the loop issued it
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ToolInvocation {
    List { dir: String },
    Read { path: String },
    Write { path: String, content: String, allow_write: bool },
    Grep { pattern: String, dir: String },
    Run { command: String, allow_run: bool },
}

/// Records every call and answers with fixed text
#[derive(Default)]
pub(crate) struct RecordingToolbox {
    calls: Mutex<Vec<ToolInvocation>>,
    listing: String,
    fail_reads: bool,
}

impl RecordingToolbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_listing(mut self, listing: impl Into<String>) -> Self {
        self.listing = listing.into();
        self
    }

    pub(crate) fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ToolInvocation) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Toolbox for RecordingToolbox {
    async fn list(&self, dir: &str) -> Result<String> {
        self.record(ToolInvocation::List { dir: dir.into() });
        Ok(self.listing.clone())
    }

    async fn read(&self, path: &str) -> Result<String> {
        self.record(ToolInvocation::Read { path: path.into() });
        if self.fail_reads {
            return Err(Error::file_not_found(path));
        }
        Ok(format!("contents of {}", path))
    }

    async fn write(&self, path: &str, content: &str, allow_write: bool) -> Result<String> {
        self.record(ToolInvocation::Write {
            path: path.into(),
            content: content.into(),
            allow_write,
        });
        Ok(format!("WROTE {} ({} bytes).", path, content.len()))
    }

    async fn grep(&self, pattern: &str, dir: &str) -> Result<String> {
        self.record(ToolInvocation::Grep {
            pattern: pattern.into(),
            dir: dir.into(),
        });
        Ok("(no matches)".into())
    }

    async fn run(&self, command: &str, allow_run: bool) -> Result<String> {
        self.record(ToolInvocation::Run {
            command: command.into(),
            allow_run,
        });
        Ok(String::new())
    }
}
