//! Command parser - Splits prefixed command text into name and arguments

use crate::domain::entities::Message;

/// A command recognized in message text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased command name without prefix
    pub name: String,
    pub args: Vec<String>,
}

impl ParsedCommand {
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(|s| s.as_str())
    }
}

/// Parses prefixed commands such as `.ping 3`
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: String,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Parse raw text; `None` when it is not a command
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        if self.prefix.is_empty() {
            return None;
        }

        let cmd_text = text.strip_prefix(&self.prefix)?;

        let mut parts = cmd_text.split_whitespace();
        let head = parts.next()?;
        // `.ping@someone` addresses the command explicitly
        let name = head.split('@').next().unwrap_or(head).to_lowercase();

        // The name must follow the prefix directly
        if name.is_empty() || cmd_text.starts_with(char::is_whitespace) {
            return None;
        }

        Some(ParsedCommand {
            name,
            args: parts.map(|s| s.to_string()).collect(),
        })
    }

    pub fn parse_message(&self, message: &Message) -> Option<ParsedCommand> {
        message.text.as_deref().and_then(|text| self.parse(text))
    }
}
