//! Tool capability interface
//!
//! The loop only sees this trait. `WRITE` and `RUN` take their capability
//! flag per call; with the flag off they report what they would have done
//! and touch nothing.

use openhoud_error::Result;
use std::borrow::Cow;

/// Appended to any text cut at a size limit
pub const TRUNCATION_MARKER: &str = "\n...[truncated]";

/// Which mutating tools actually execute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub allow_write: bool,
    pub allow_run: bool,
}

impl Capabilities {
    pub fn read_only() -> Self {
        Self::default()
    }

    pub fn with_write(mut self, allow: bool) -> Self {
        self.allow_write = allow;
        self
    }

    pub fn with_run(mut self, allow: bool) -> Self {
        self.allow_run = allow;
        self
    }
}

/// Size caps, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Tool result body folded into the transcript
    pub tool_result_chars: usize,
    /// Captured output of a `RUN` command
    pub run_output_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            tool_result_chars: 8000,
            run_output_chars: 5000,
        }
    }
}

/// Cut `text` to `max_chars` characters, marking the cut
pub fn truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(format!("{}{}", &text[..idx], TRUNCATION_MARKER)),
        None => Cow::Borrowed(text),
    }
}

/// The five operations the agent loop dispatches to
#[allow(async_fn_in_trait)]
pub trait Toolbox: Send + Sync {
    /// Entries of `dir`, one per line
    async fn list(&self, dir: &str) -> Result<String>;

    /// Full contents of `path`
    async fn read(&self, path: &str) -> Result<String>;

    /// Overwrite `path` with `content`, or describe the write when not allowed
    async fn write(&self, path: &str, content: &str, allow_write: bool) -> Result<String>;

    /// Files under `dir` containing `pattern` literally
    async fn grep(&self, pattern: &str, dir: &str) -> Result<String>;

    /// Execute `command` in the workspace, or describe it when not allowed
    async fn run(&self, command: &str, allow_run: bool) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_under_limit_borrows() {
        assert!(matches!(truncate("short", 10), Cow::Borrowed("short")));
        assert!(matches!(truncate("exact", 5), Cow::Borrowed("exact")));
    }

    #[test]
    fn test_truncate_counts_chars() {
        let cut = truncate("héllo wörld", 4);
        assert_eq!(cut, "héll\n...[truncated]");
    }

    #[test]
    fn test_capabilities_builders() {
        let caps = Capabilities::read_only().with_run(true);
        assert!(!caps.allow_write);
        assert!(caps.allow_run);
        assert_eq!(Limits::default().tool_result_chars, 8000);
        assert_eq!(Limits::default().run_output_chars, 5000);
    }
}
