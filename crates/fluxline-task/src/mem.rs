//! In-process pub/sub substrate.
//!
//! Backs the correlator in tests and embedded setups where the cluster's
//! messaging substrate is out of reach. Cheap to clone; clones share state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::client::{CommandSink, CommandWriter, StatusSource, StatusStream};
use crate::error::{Result, TaskError};

/// In-memory command channel capturing every written record.
#[derive(Clone, Default)]
pub struct MemCommandChannel {
    records: Arc<Mutex<Vec<serde_json::Value>>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl MemCommandChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record written so far, in order.
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.records.lock().expect("records lock").clone()
    }

    pub fn writers_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn writers_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Block until at least one record has been written, returning the
    /// first. Used by test doubles standing in for the remote task.
    pub fn wait_for_record(&self, timeout: Duration) -> Result<serde_json::Value> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(record) = self.records.lock().expect("records lock").first() {
                return Ok(record.clone());
            }
            if Instant::now() >= deadline {
                return Err(TaskError::Timeout(timeout));
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl CommandSink for MemCommandChannel {
    type Writer = MemCommandWriter;

    fn open_writer(&mut self) -> Result<Self::Writer> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemCommandWriter {
            records: Arc::clone(&self.records),
            closed: Arc::clone(&self.closed),
        })
    }
}

/// Writer handle produced by [`MemCommandChannel`].
pub struct MemCommandWriter {
    records: Arc<Mutex<Vec<serde_json::Value>>>,
    closed: Arc<AtomicUsize>,
}

impl CommandWriter for MemCommandWriter {
    fn write_record(&mut self, record: &serde_json::Value) -> Result<()> {
        self.records.lock().expect("records lock").push(record.clone());
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory status broadcast fanning records out to every subscriber.
#[derive(Clone, Default)]
pub struct MemStatusBroadcast {
    subscribers: Arc<Mutex<Vec<Sender<Vec<u8>>>>>,
}

impl MemStatusBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish one status record to all live subscribers.
    pub fn publish(&self, record: &serde_json::Value) {
        self.publish_raw(serde_json::to_vec(record).expect("status record serializes"));
    }

    /// Publish raw bytes — lets tests exercise malformed records.
    pub fn publish_raw(&self, payload: Vec<u8>) {
        let mut subscribers = self.subscribers.lock().expect("subscribers lock");
        subscribers.retain(|tx| tx.send(payload.clone()).is_ok());
    }
}

impl StatusSource for MemStatusBroadcast {
    type Stream = MemStatusStream;

    fn subscribe(&mut self) -> Result<Self::Stream> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().expect("subscribers lock").push(tx);
        Ok(MemStatusStream { rx })
    }
}

/// Subscription handle produced by [`MemStatusBroadcast`].
pub struct MemStatusStream {
    rx: Receiver<Vec<u8>>,
}

impl StatusStream for MemStatusStream {
    fn recv(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        match self.rx.recv_timeout(timeout) {
            Ok(payload) => Ok(Some(payload)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_fans_out_to_all_subscribers() {
        let mut broadcast = MemStatusBroadcast::new();
        let mut first = broadcast.subscribe().unwrap();
        let mut second = broadcast.subscribe().unwrap();

        broadcast.publish(&serde_json::json!({"n": 1}));

        let a = first.recv(Duration::from_millis(100)).unwrap().unwrap();
        let b = second.recv(Duration::from_millis(100)).unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn recv_times_out_with_none() {
        let mut broadcast = MemStatusBroadcast::new();
        let mut stream = broadcast.subscribe().unwrap();
        assert!(stream.recv(Duration::from_millis(10)).unwrap().is_none());
    }

    #[test]
    fn command_channel_counts_writer_lifecycle() {
        let mut channel = MemCommandChannel::new();
        let mut writer = channel.open_writer().unwrap();
        writer.write_record(&serde_json::json!({"key": "x"})).unwrap();
        writer.close().unwrap();

        assert_eq!(channel.writers_opened(), 1);
        assert_eq!(channel.writers_closed(), 1);
        assert_eq!(channel.records().len(), 1);
    }
}
