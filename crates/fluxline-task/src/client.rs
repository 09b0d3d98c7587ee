use std::time::{Duration, Instant};

use jsonschema::Validator;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::command::{Command, StatusRecord, TaskKey, STATUS_SCHEMA};
use crate::error::{Result, TaskError};
use crate::validator::{compile_status_schema, validate_status};

/// Default wait for a synchronous command acknowledgment.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// A short-lived writer onto the command channel: opened per invocation,
/// written once, closed.
pub trait CommandWriter {
    fn write_record(&mut self, record: &serde_json::Value) -> Result<()>;
    fn close(self) -> Result<()>;
}

/// The command channel side of the pub/sub substrate.
pub trait CommandSink {
    type Writer: CommandWriter;
    fn open_writer(&mut self) -> Result<Self::Writer>;
}

/// A live subscription to the status-broadcast channel.
pub trait StatusStream {
    /// Block up to `timeout` for the next raw status record. `Ok(None)`
    /// means nothing arrived in the window — "no data yet", never an error.
    fn recv(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>>;
}

/// The status-broadcast side of the pub/sub substrate.
pub trait StatusSource {
    type Stream: StatusStream;
    fn subscribe(&mut self) -> Result<Self::Stream>;
}

/// Drives one remote task's imperative commands over the shared substrate.
pub struct CommandClient<S: CommandSink, B: StatusSource> {
    task: TaskKey,
    sink: S,
    source: B,
    validator: Validator,
}

impl<S: CommandSink, B: StatusSource> CommandClient<S, B> {
    pub fn new(task: TaskKey, sink: S, source: B) -> Result<Self> {
        Ok(Self {
            task,
            sink,
            source,
            validator: compile_status_schema(STATUS_SCHEMA)?,
        })
    }

    /// The task this client drives.
    pub fn task(&self) -> TaskKey {
        self.task
    }

    /// Fire-and-forget: write one command record and return its correlation
    /// key without waiting for an acknowledgment.
    ///
    /// Opens a writer onto the command channel, writes exactly one record
    /// `{task, type, key, args}`, and closes the writer.
    pub fn execute_command(
        &mut self,
        command_type: &str,
        args: Option<serde_json::Value>,
    ) -> Result<String> {
        let key = Uuid::new_v4().to_string();
        let command = Command {
            task: self.task,
            command_type: command_type.to_string(),
            key: key.clone(),
            args,
        };

        let mut writer = self.sink.open_writer()?;
        writer.write_record(&serde_json::to_value(&command)?)?;
        writer.close()?;

        debug!(task = self.task, %key, command_type, "command dispatched");
        Ok(key)
    }

    /// Execute a command and block until its acknowledgment, using the
    /// default timeout.
    pub fn execute_command_sync(
        &mut self,
        command_type: &str,
        args: Option<serde_json::Value>,
    ) -> Result<StatusRecord> {
        self.execute_command_sync_with_timeout(command_type, args, DEFAULT_COMMAND_TIMEOUT)
    }

    /// Execute a command and block until a status record carrying its
    /// correlation key arrives, or `timeout` elapses.
    ///
    /// The subscription is established before the command is written, so
    /// the acknowledgment cannot be missed. Valid records with a different
    /// key are silently skipped (another caller's command may be
    /// multiplexed on the channel); records missing the key field are
    /// logged and skipped; records failing schema validation are fatal.
    pub fn execute_command_sync_with_timeout(
        &mut self,
        command_type: &str,
        args: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<StatusRecord> {
        let mut stream = self.source.subscribe()?;
        let key = self.execute_command(command_type, args)?;

        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(TaskError::Timeout(timeout));
            }

            let Some(raw) = stream.recv(deadline - now)? else {
                continue;
            };

            let value = validate_status(&raw, &self.validator)?;
            let status: StatusRecord = serde_json::from_value(value)?;

            match status.command_key() {
                Some(record_key) if record_key == key => {
                    debug!(task = self.task, %key, variant = ?status.variant, "command acknowledged");
                    return Ok(status);
                }
                Some(other) => {
                    debug!(%other, "skipping status for a different command");
                }
                None => {
                    warn!(task = self.task, "status record missing command key; skipping");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::mem::{MemCommandChannel, MemStatusBroadcast};

    fn client(
        channel: &MemCommandChannel,
        broadcast: &MemStatusBroadcast,
    ) -> CommandClient<MemCommandChannel, MemStatusBroadcast> {
        CommandClient::new(7, channel.clone(), broadcast.clone()).unwrap()
    }

    fn ack_for(key: &str) -> serde_json::Value {
        serde_json::json!({
            "variant": "success",
            "message": "started",
            "details": {"task": 7, "cmd": key}
        })
    }

    #[test]
    fn execute_command_writes_one_record_and_returns_key() {
        let channel = MemCommandChannel::new();
        let broadcast = MemStatusBroadcast::new();
        let mut client = client(&channel, &broadcast);

        let key = client
            .execute_command("start", Some(serde_json::json!({"mode": "fast"})))
            .unwrap();

        let records = channel.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["task"], serde_json::json!(7));
        assert_eq!(records[0]["type"], serde_json::json!("start"));
        assert_eq!(records[0]["key"], serde_json::json!(key));
        assert_eq!(channel.writers_opened(), 1);
        assert_eq!(channel.writers_closed(), 1);
    }

    #[test]
    fn correlation_keys_are_fresh_per_invocation() {
        let channel = MemCommandChannel::new();
        let broadcast = MemStatusBroadcast::new();
        let mut client = client(&channel, &broadcast);

        let first = client.execute_command("start", None).unwrap();
        let second = client.execute_command("start", None).unwrap();
        assert_ne!(first, second);
        assert_eq!(channel.writers_opened(), 2);
    }

    #[test]
    fn sync_execution_returns_matching_status() {
        let channel = MemCommandChannel::new();
        let broadcast = MemStatusBroadcast::new();
        let mut client = client(&channel, &broadcast);

        let publisher = {
            let channel = channel.clone();
            let broadcast = broadcast.clone();
            thread::spawn(move || {
                // Act as the remote task: watch for the command, ack it.
                let command = channel.wait_for_record(Duration::from_secs(2)).unwrap();
                let key = command["key"].as_str().unwrap();
                broadcast.publish(&ack_for(key));
            })
        };

        let status = client
            .execute_command_sync_with_timeout("start", None, Duration::from_secs(2))
            .unwrap();
        assert_eq!(status.message, "started");
        publisher.join().unwrap();
    }

    #[test]
    fn non_matching_keys_are_silently_skipped() {
        let channel = MemCommandChannel::new();
        let broadcast = MemStatusBroadcast::new();
        let mut client = client(&channel, &broadcast);

        let publisher = {
            let channel = channel.clone();
            let broadcast = broadcast.clone();
            thread::spawn(move || {
                let command = channel.wait_for_record(Duration::from_secs(2)).unwrap();
                let key = command["key"].as_str().unwrap();
                // Another caller's acknowledgment lands first.
                broadcast.publish(&ack_for("someone-elses-command"));
                broadcast.publish(&ack_for(key));
            })
        };

        let status = client
            .execute_command_sync_with_timeout("start", None, Duration::from_secs(2))
            .unwrap();
        assert!(status.command_key().is_some());
        publisher.join().unwrap();
    }

    #[test]
    fn missing_key_field_is_skipped_not_fatal() {
        let channel = MemCommandChannel::new();
        let broadcast = MemStatusBroadcast::new();
        let mut client = client(&channel, &broadcast);

        let publisher = {
            let channel = channel.clone();
            let broadcast = broadcast.clone();
            thread::spawn(move || {
                let command = channel.wait_for_record(Duration::from_secs(2)).unwrap();
                let key = command["key"].as_str().unwrap();
                broadcast.publish(&serde_json::json!({
                    "variant": "warning",
                    "message": "heartbeat",
                    "details": {"task": 7}
                }));
                broadcast.publish(&ack_for(key));
            })
        };

        let status = client
            .execute_command_sync_with_timeout("start", None, Duration::from_secs(2))
            .unwrap();
        assert_eq!(status.message, "started");
        publisher.join().unwrap();
    }

    #[test]
    fn schema_invalid_record_is_fatal_and_distinct_from_timeout() {
        let channel = MemCommandChannel::new();
        let broadcast = MemStatusBroadcast::new();
        let mut client = client(&channel, &broadcast);

        let publisher = {
            let channel = channel.clone();
            let broadcast = broadcast.clone();
            thread::spawn(move || {
                channel.wait_for_record(Duration::from_secs(2)).unwrap();
                broadcast.publish(&serde_json::json!({
                    "variant": "catastrophe",
                    "message": 17
                }));
            })
        };

        let result =
            client.execute_command_sync_with_timeout("start", None, Duration::from_secs(2));
        assert!(matches!(result, Err(TaskError::InvalidStatus(_))));
        publisher.join().unwrap();
    }

    #[test]
    fn timeout_when_no_status_ever_arrives() {
        let channel = MemCommandChannel::new();
        let broadcast = MemStatusBroadcast::new();
        let mut client = client(&channel, &broadcast);

        let started = Instant::now();
        let result = client.execute_command_sync_with_timeout(
            "start",
            None,
            Duration::from_millis(200),
        );
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(TaskError::Timeout(_))));
        assert!(elapsed >= Duration::from_millis(150), "not immediately");
        assert!(elapsed < Duration::from_secs(2), "not indefinitely");
    }

    #[test]
    fn default_timeout_is_five_seconds() {
        assert_eq!(DEFAULT_COMMAND_TIMEOUT, Duration::from_secs(5));
    }
}
