//! End-to-end write protocol tests against a mock cluster listening on a
//! real Unix-domain write endpoint.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use fluxline::frame::{
    CommandKind, ControlEnvelope, Frame, Message, MessageReader, MessageWriter,
};
use fluxline::transport::{ClusterStream, EndpointListener};
use fluxline::writer::{open_writer, Subject, WriterConfig};
use fluxline::{Authority, Channel, ChannelKey, DataType, Series, TimeStamp};

const IDX: ChannelKey = ChannelKey(1);
const DATA: ChannelKey = ChannelKey(2);

fn test_channels() -> Vec<Channel> {
    vec![
        Channel::index(1u32, "time"),
        Channel::data(2u32, "value", DataType::Float64, 1u32),
    ]
}

fn endpoint_path(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fluxline-e2e-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join("write.sock")
}

/// Mock cluster: stores committed frames and arbitrates channel authority
/// between concurrent writer sessions — highest authority wins, earlier
/// claim wins ties.
#[derive(Default)]
struct MockCluster {
    committed: Mutex<Vec<(ChannelKey, Series)>>,
    claims: Mutex<HashMap<ChannelKey, (usize, u8)>>,
}

impl MockCluster {
    fn claim(&self, session: usize, key: ChannelKey, authority: u8) {
        let mut claims = self.claims.lock().unwrap();
        match claims.get(&key) {
            Some(&(holder, held)) if holder != session && held >= authority => {}
            _ => {
                claims.insert(key, (session, authority));
            }
        }
    }

    fn holds_all(&self, session: usize, keys: &[ChannelKey]) -> bool {
        let claims = self.claims.lock().unwrap();
        keys.iter()
            .all(|key| matches!(claims.get(key), Some(&(holder, _)) if holder == session))
    }

    /// A historical read: data-channel samples whose index timestamp falls
    /// within `[start, end)`.
    fn read(&self, start: TimeStamp, end: TimeStamp) -> Vec<f64> {
        let committed = self.committed.lock().unwrap();
        let timestamps: Vec<TimeStamp> = committed
            .iter()
            .filter(|(key, _)| *key == IDX)
            .flat_map(|(_, series)| series.as_timestamps())
            .collect();
        let values: Vec<f64> = committed
            .iter()
            .filter(|(key, _)| *key == DATA)
            .flat_map(|(_, series)| series.as_f64s())
            .collect();
        timestamps
            .iter()
            .zip(values)
            .filter(|(ts, _)| ts.after_eq(start) && ts.before(end))
            .map(|(_, value)| value)
            .collect()
    }

    fn serve_session(self: &Arc<Self>, session: usize, stream: ClusterStream) {
        let reader_stream = stream.try_clone().unwrap();
        let mut reader = MessageReader::new(reader_stream);
        let mut writer = MessageWriter::new(stream);

        // OPEN: claim the requested channels at the configured authority.
        let Message::Control(open) = reader.read_message().unwrap() else {
            panic!("expected OPEN envelope");
        };
        assert_eq!(open.command, CommandKind::Open);
        let config = open.config.expect("OPEN carries config");
        let keys: Vec<ChannelKey> = config["keys"]
            .as_array()
            .unwrap()
            .iter()
            .map(|k| ChannelKey(k.as_u64().unwrap() as u32))
            .collect();
        let authorities = config["authorities"].as_array().unwrap();
        for (i, key) in keys.iter().enumerate() {
            let authority = authorities
                .get(i)
                .or_else(|| authorities.first())
                .and_then(|a| a.as_u64())
                .unwrap() as u8;
            self.claim(session, *key, authority);
        }
        writer
            .send(&Message::Control(ControlEnvelope::response(
                CommandKind::Open,
                None,
            )))
            .unwrap();

        let mut staged: Vec<(ChannelKey, Series)> = Vec::new();
        loop {
            match reader.read_message() {
                Ok(Message::Write(frame)) => {
                    // Unauthorized writes are silently dropped.
                    if self.holds_all(session, &keys) {
                        for (key, series) in frame.iter() {
                            staged.push((key, series.clone()));
                        }
                    }
                }
                Ok(Message::Control(envelope)) => match envelope.command {
                    CommandKind::Commit => {
                        let end = staged
                            .iter()
                            .filter(|(key, _)| *key == IDX)
                            .flat_map(|(_, series)| series.as_timestamps())
                            .max()
                            .map(|ts| TimeStamp::new(ts.nanos() + 1));
                        self.committed.lock().unwrap().append(&mut staged);
                        writer
                            .send(&Message::Control(ControlEnvelope::response(
                                CommandKind::Commit,
                                Some(end.unwrap_or(TimeStamp::new(0))),
                            )))
                            .unwrap();
                    }
                    CommandKind::SetAuthority => {
                        let config = envelope.config.expect("SET_AUTHORITY carries config");
                        let set_keys = config["keys"].as_array().unwrap();
                        let set_authorities = config["authorities"].as_array().unwrap();
                        for (key, authority) in set_keys.iter().zip(set_authorities) {
                            self.claim(
                                session,
                                ChannelKey(key.as_u64().unwrap() as u32),
                                authority.as_u64().unwrap() as u8,
                            );
                        }
                        writer
                            .send(&Message::Control(ControlEnvelope::response(
                                CommandKind::SetAuthority,
                                None,
                            )))
                            .unwrap();
                    }
                    CommandKind::CloseSend => break,
                    other => panic!("unexpected client command {other:?}"),
                },
                Err(_) => break,
            }
        }
    }
}

#[test]
fn open_write_commit_then_read_back() {
    let path = endpoint_path("roundtrip");
    let listener = EndpointListener::bind(&path).unwrap();
    let cluster = Arc::new(MockCluster::default());

    let server = {
        let cluster = Arc::clone(&cluster);
        thread::spawn(move || {
            let stream = listener.accept().unwrap();
            cluster.serve_session(0, stream);
        })
    };

    let config = WriterConfig {
        subject: Subject::new("w-e2e", "roundtrip"),
        response_timeout: Duration::from_secs(2),
        ..WriterConfig::new(test_channels(), TimeStamp::new(100))
    };
    let mut writer = open_writer(&path, config).unwrap();

    let mut frame = Frame::new();
    frame.push(
        1u32,
        Series::from_timestamps(&[
            TimeStamp::new(100),
            TimeStamp::new(200),
            TimeStamp::new(300),
        ]),
    );
    frame.push(2u32, Series::from_f64s(&[1.0, 2.0, 3.0]));
    writer.write(frame).unwrap();

    let end = writer.commit().unwrap();
    assert!(end.after_eq(TimeStamp::new(300)));

    writer.close().unwrap();
    server.join().unwrap();

    let values = cluster.read(TimeStamp::new(100), TimeStamp::new(301));
    assert_eq!(values, vec![1.0, 2.0, 3.0]);
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn broadcast_authority_shadows_lower_writer() {
    let path = endpoint_path("authority");
    let listener = EndpointListener::bind(&path).unwrap();
    let cluster = Arc::new(MockCluster::default());

    let server = {
        let cluster = Arc::clone(&cluster);
        thread::spawn(move || {
            let mut sessions = Vec::new();
            for session in 0..2 {
                let stream = listener.accept().unwrap();
                let cluster = Arc::clone(&cluster);
                sessions.push(thread::spawn(move || {
                    cluster.serve_session(session, stream);
                }));
            }
            for session in sessions {
                session.join().unwrap();
            }
        })
    };

    let config = |name: &str| WriterConfig {
        subject: Subject::new(name, name),
        authorities: vec![Authority(10)],
        response_timeout: Duration::from_secs(2),
        ..WriterConfig::new(test_channels(), TimeStamp::new(0))
    };

    let mut high = open_writer(&path, config("w-high")).unwrap();
    let mut low = open_writer(&path, config("w-low")).unwrap();

    // A single integer with no channel applies to every owned channel.
    high.set_authority(42u8).unwrap();

    // The lower-authority writer's rows are dropped without error.
    let mut shadowed = Frame::new();
    shadowed.push(1u32, Series::from_timestamps(&[TimeStamp::new(10)]));
    shadowed.push(2u32, Series::from_f64s(&[-1.0]));
    low.write(shadowed).unwrap();
    low.commit().unwrap();

    let mut frame = Frame::new();
    frame.push(1u32, Series::from_timestamps(&[TimeStamp::new(20)]));
    frame.push(2u32, Series::from_f64s(&[5.0]));
    high.write(frame).unwrap();
    high.commit().unwrap();

    low.close().unwrap();
    high.close().unwrap();
    server.join().unwrap();

    let values = cluster.read(TimeStamp::MIN, TimeStamp::MAX);
    assert_eq!(values, vec![5.0], "only the higher-authority write persists");
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
