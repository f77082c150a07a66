use std::collections::VecDeque;
use std::future::pending;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use guru_protocol::close_code;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::connection::{Channel, ChannelEvent, Transport};

/// How the mock answers one dial.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Dial {
    Accept,
    Refuse,
    /// Never completes
    Hang,
}

struct Shared {
    script: VecDeque<Dial>,
    fallback: Dial,
    dials: Vec<(String, Instant)>,
    links: Vec<MockLink>,
}

/// In-memory transport. Clones share state, so a test keeps one clone and
/// hands the other to the manager.
#[derive(Clone)]
pub(crate) struct MockTransport {
    shared: Arc<Mutex<Shared>>,
}

impl MockTransport {
    /// Answer every dial with `fallback` once the script runs out.
    pub fn new(script: &[Dial], fallback: Dial) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                script: script.iter().copied().collect(),
                fallback,
                dials: Vec::new(),
                links: Vec::new(),
            })),
        }
    }

    pub fn accepting() -> Self {
        Self::new(&[], Dial::Accept)
    }

    pub fn dial_count(&self) -> usize {
        self.shared.lock().unwrap().dials.len()
    }

    pub fn dial_urls(&self) -> Vec<String> {
        let shared = self.shared.lock().unwrap();
        shared.dials.iter().map(|(url, _)| url.clone()).collect()
    }

    /// Time between consecutive dials
    pub fn dial_gaps(&self) -> Vec<Duration> {
        let shared = self.shared.lock().unwrap();
        shared
            .dials
            .windows(2)
            .map(|pair| pair[1].1 - pair[0].1)
            .collect()
    }

    /// Server side of the Nth accepted channel
    pub fn link(&self, index: usize) -> MockLink {
        self.shared.lock().unwrap().links[index].clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Channel = MockChannel;

    async fn open(&self, url: &str) -> Result<MockChannel> {
        let dial = {
            let mut shared = self.shared.lock().unwrap();
            shared.dials.push((url.to_string(), Instant::now()));
            let fallback = shared.fallback;
            shared.script.pop_front().unwrap_or(fallback)
        };

        match dial {
            Dial::Refuse => bail!("connection refused"),
            Dial::Hang => pending().await,
            Dial::Accept => {
                let (events, event_rx) = mpsc::unbounded_channel();
                let log = Arc::new(Mutex::new(LinkLog::default()));
                self.shared.lock().unwrap().links.push(MockLink {
                    events,
                    log: Arc::clone(&log),
                });

                Ok(MockChannel {
                    events: event_rx,
                    log,
                })
            }
        }
    }
}

#[derive(Default)]
struct LinkLog {
    sent: Vec<String>,
    closes: Vec<u16>,
}

/// Server end of a mock channel.
#[derive(Clone)]
pub(crate) struct MockLink {
    events: mpsc::UnboundedSender<ChannelEvent>,
    log: Arc<Mutex<LinkLog>>,
}

impl MockLink {
    pub fn push(&self, frame: &str) {
        let _ = self.events.send(ChannelEvent::Frame(frame.to_string()));
    }

    pub fn close(&self, code: u16) {
        let _ = self.events.send(ChannelEvent::Closed(code));
    }

    /// Frames the client wrote, parsed as JSON
    pub fn sent(&self) -> Vec<Value> {
        let log = self.log.lock().unwrap();
        log.sent
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    /// Codes the client closed the channel with
    pub fn closes(&self) -> Vec<u16> {
        self.log.lock().unwrap().closes.clone()
    }
}

pub(crate) struct MockChannel {
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    log: Arc<Mutex<LinkLog>>,
}

#[async_trait]
impl Channel for MockChannel {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.log.lock().unwrap().sent.push(text);
        Ok(())
    }

    async fn recv(&mut self) -> ChannelEvent {
        self.events
            .recv()
            .await
            .unwrap_or(ChannelEvent::Closed(close_code::ABNORMAL))
    }

    async fn close(&mut self, code: u16, _reason: &str) -> Result<()> {
        self.log.lock().unwrap().closes.push(code);
        Ok(())
    }
}
