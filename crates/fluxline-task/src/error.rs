/// Errors raised by command execution and status correlation.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// No matching status arrived within the wait window.
    #[error("no status received for command within {0:?}")]
    Timeout(std::time::Duration),

    /// An inbound status record failed schema validation. Fatal, and
    /// distinct from a timeout.
    #[error("invalid status record: {0}")]
    InvalidStatus(String),

    /// The embedded status schema failed to compile.
    #[error("failed to compile status schema: {0}")]
    SchemaCompile(String),

    /// A record failed to serialize or parse as JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The pub/sub substrate reported an error.
    #[error("substrate error: {0}")]
    Substrate(String),
}

pub type Result<T> = std::result::Result<T, TaskError>;
