use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// How many prior turns are carried into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryLimit {
    Unlimited,
    Last(usize),
}

impl HistoryLimit {
    /// Interpret the `history_limit` config value. `-1` (or any negative value)
    /// lifts the limit.
    pub fn from_config(value: i64) -> Self {
        if value < 0 {
            HistoryLimit::Unlimited
        } else {
            HistoryLimit::Last(usize::try_from(value).unwrap_or(usize::MAX))
        }
    }

    fn window<'a>(self, history: &'a [Message]) -> &'a [Message] {
        match self {
            HistoryLimit::Unlimited => history,
            HistoryLimit::Last(n) => &history[history.len().saturating_sub(n)..],
        }
    }
}

/// Assemble the request conversation: system prompt, the tail of `history`
/// allowed by `limit`, then the new user message.
pub fn build_messages(
    message: &str,
    history: &[Message],
    system_prompt: &str,
    limit: HistoryLimit,
) -> Vec<Message> {
    let kept = limit.window(history);
    let mut messages = Vec::with_capacity(kept.len() + 2);
    messages.push(Message::system(system_prompt));
    messages.extend_from_slice(kept);
    messages.push(Message::user(message));
    messages
}
