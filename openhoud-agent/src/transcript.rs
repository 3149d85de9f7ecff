//! Conversation history for one loop run

use openhoud_llm::ChatMessage;

/// Ordered, append-only message history.
///
/// `append` consumes the transcript and hands back the extended one, so a
/// step can be driven from any prior state without shared mutable history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn append(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl FromIterator<ChatMessage> for Transcript {
    fn from_iter<I: IntoIterator<Item = ChatMessage>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openhoud_llm::Role;

    #[test]
    fn test_append_returns_extended_state() {
        let base = Transcript::new().append(ChatMessage::system("sys"));
        let extended = base.clone().append(ChatMessage::user("task"));

        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.messages()[0], base.messages()[0]);
        assert_eq!(extended.last().map(|m| m.role), Some(Role::User));
    }

    #[test]
    fn test_from_iter() {
        let transcript: Transcript = vec![ChatMessage::user("a"), ChatMessage::assistant("b")]
            .into_iter()
            .collect();
        assert!(!transcript.is_empty());
        assert_eq!(transcript.last().map(|m| m.content.as_str()), Some("b"));
    }
}
