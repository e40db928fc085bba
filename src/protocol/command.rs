//! Command definitions
//!
//! Represents validated requests from the command line.

use clap::ValueEnum;
use serde_json::Value;

use crate::error::{KvError, Result};

/// Command names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CommandKind {
    Get,
    Set,
    Delete,
}

/// A parsed command with its validated arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Look up one or more keys
    Get { keys: Vec<String> },

    /// Store one or more key/value pairs
    Set { pairs: Vec<(String, Value)> },

    /// Remove one or more keys
    Delete { keys: Vec<String> },
}

impl Command {
    /// Build a command from its name and the raw `items` tokens
    ///
    /// - get/delete: every item is a key, at least one required
    /// - set: every item is `key=value`, split at the first `=`; the value
    ///   is stored as a JSON string
    pub fn parse(kind: CommandKind, items: &[String]) -> Result<Self> {
        if items.is_empty() {
            return Err(KvError::Usage(kind.usage().to_string()));
        }

        match kind {
            CommandKind::Get => Ok(Command::Get {
                keys: items.to_vec(),
            }),
            CommandKind::Delete => Ok(Command::Delete {
                keys: items.to_vec(),
            }),
            CommandKind::Set => {
                let pairs = items
                    .iter()
                    .map(|item| {
                        item.split_once('=')
                            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                            .ok_or_else(|| KvError::Usage(kind.usage().to_string()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Command::Set { pairs })
            }
        }
    }

    /// Get the command kind
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Get { .. } => CommandKind::Get,
            Command::Set { .. } => CommandKind::Set,
            Command::Delete { .. } => CommandKind::Delete,
        }
    }
}

impl CommandKind {
    /// Usage line printed for a malformed invocation
    pub fn usage(&self) -> &'static str {
        match self {
            CommandKind::Get => "Usage: <storage> get <key> [<key>...]",
            CommandKind::Set => "Usage: <storage> set <key>=<value> [<key>=<value>...]",
            CommandKind::Delete => "Usage: <storage> delete <key> [<key>...]",
        }
    }
}
