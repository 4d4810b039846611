use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Never edited after it is appended.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Assistant message that reports a failed run
    pub is_error: bool,
    pub created_at: DateTime<Local>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), is_error: false, created_at: Local::now() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), is_error: false, created_at: Local::now() }
    }

    /// Assistant-side report of a failed run, tagged so the UI can style it.
    pub fn error(description: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: format!("Error: {}", description),
            is_error: true,
            created_at: Local::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_prefixed_and_tagged() {
        let m = Message::error("connection refused");
        assert_eq!(m.role, Role::Assistant);
        assert_eq!(m.content, "Error: connection refused");
        assert!(m.is_error);
        assert!(!Message::assistant("hi").is_error);
    }
}
