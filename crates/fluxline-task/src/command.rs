use serde::{Deserialize, Serialize};

/// Cluster-assigned identifier of a hardware task.
pub type TaskKey = u64;

/// One imperative command for a remote task, written once to the command
/// channel and matched exactly once against an incoming status record
/// carrying the same correlation key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub task: TaskKey,
    #[serde(rename = "type")]
    pub command_type: String,
    /// Correlation key, freshly generated per invocation.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
}

/// Outcome class of a status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusVariant {
    Success,
    Error,
    Warning,
}

/// One record off the status-broadcast channel.
///
/// Many callers multiplex on the same channel; `details.cmd` carries the
/// correlation key of the command a record acknowledges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub variant: StatusVariant,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl StatusRecord {
    /// The correlation key this record acknowledges, if present.
    pub fn command_key(&self) -> Option<&str> {
        self.details.get("cmd").and_then(serde_json::Value::as_str)
    }

    /// The task this record belongs to, if present.
    pub fn task(&self) -> Option<TaskKey> {
        self.details.get("task").and_then(serde_json::Value::as_u64)
    }
}

/// Schema every inbound status record must satisfy. A record that fails
/// this is fatal to the wait; a record that passes but lacks `details.cmd`
/// is merely skipped.
pub const STATUS_SCHEMA: &str = r#"{
    "type": "object",
    "properties": {
        "variant": { "type": "string", "enum": ["success", "error", "warning"] },
        "message": { "type": "string" },
        "details": { "type": "object" }
    },
    "required": ["variant", "message", "details"]
}"#;
