//! Command/acknowledgment correlation for remote hardware tasks.
//!
//! Tasks expose no direct request/response RPC — only a fire-and-forget
//! command channel and a separately broadcast status channel, both on the
//! cluster's pub/sub substrate. [`CommandClient`] writes a command record
//! carrying a fresh correlation key and, for synchronous execution, watches
//! the status broadcast until a record echoing that key arrives.

pub mod client;
pub mod command;
pub mod error;
pub mod mem;
mod validator;

pub use client::{
    CommandClient, CommandSink, CommandWriter, StatusSource, StatusStream,
    DEFAULT_COMMAND_TIMEOUT,
};
pub use command::{Command, StatusRecord, StatusVariant, TaskKey, STATUS_SCHEMA};
pub use error::{Result, TaskError};
