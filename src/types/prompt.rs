use super::message::Message;

/// A structured prompt: an ordered sequence of role-tagged messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prompt {
    messages: Vec<Message>,
}

impl Prompt {
    /// Create a prompt with a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(content)],
        }
    }

    /// Add a user message.
    pub fn with_user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Get the messages in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The messages as `(role, content)` pairs, in order.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        self.messages
            .iter()
            .map(|m| (m.role.as_str(), m.content.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_builder_preserves_order() {
        let prompt = Prompt::system("be brief").with_user("hello").with_user("again");
        assert_eq!(
            prompt.pairs(),
            vec![("system", "be brief"), ("human", "hello"), ("human", "again")]
        );
        assert_eq!(prompt.messages()[0].role, Role::System);
    }
}
