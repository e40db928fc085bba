//! Protocol Module
//!
//! The request layer shared by the command-line client.
//!
//! ## Invocation Format
//!
//! ```text
//! bucketkv-cli <storage> <command> <item> [<item>...] [-v]
//! ```
//!
//! ### Commands
//! - get:    items are keys
//! - set:    items are `key=value` tokens (split at the first `=`)
//! - delete: items are keys
//!
//! ### Output
//! - get:    `<key> = <value>` per found key
//! - set:    `Set <key> = <value>` per pair (verbose only)
//! - delete: `'<key>' was deleted` per removed key (verbose only)
//! - misses: `'<key>' not found in storage` (always)

mod command;
mod response;

pub use command::{Command, CommandKind};
pub use response::{display_value, Outcome};
