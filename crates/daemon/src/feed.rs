//! TCP client for the console's status service.
//!
//! The feed owns its socket and connection state. Callers only ever see
//! status lines: connect failures, resets, peer closes and silent links are
//! absorbed here and turned into reconnects.

use std::future::Future;
use std::io;
use std::time::Duration;

use titlecast_core::status::normalize;
use titlecast_core::ConnectionState;
use titlecast_runtime_config::FeedSettings;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::retry::retry_forever;

/// Source of normalized, non-empty status lines.
pub trait StatusSource {
    /// Wait for the next status line. Never fails.
    fn next_status_line(&mut self) -> impl Future<Output = String> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedTiming {
    pub retry_delay: Duration,
    pub poll_interval: Duration,
    pub max_empty_polls: u32,
    pub connect_timeout: Duration,
}

impl From<&FeedSettings> for FeedTiming {
    fn from(settings: &FeedSettings) -> Self {
        Self {
            retry_delay: Duration::from_secs(settings.retry_delay_secs),
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            max_empty_polls: settings.max_empty_polls,
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
        }
    }
}

impl Default for FeedTiming {
    fn default() -> Self {
        Self::from(&FeedSettings::default())
    }
}

pub struct StatusFeed {
    addr: String,
    timing: FeedTiming,
    state: ConnectionState,
    lines: Option<Lines<BufReader<TcpStream>>>,
    /// Consecutive polls that produced nothing; reset by any received line.
    empty_polls: u32,
    /// Whether the current connection has delivered any line yet.
    received: bool,
    connect_attempts: u64,
    connects: u64,
}

impl StatusFeed {
    pub fn new(addr: impl Into<String>, timing: FeedTiming) -> Self {
        Self {
            addr: addr.into(),
            timing,
            state: ConnectionState::Disconnected,
            lines: None,
            empty_polls: 0,
            received: false,
            connect_attempts: 0,
            connects: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Successful connections made so far.
    pub fn connects(&self) -> u64 {
        self.connects
    }

    /// Connect attempts made so far, successful or not.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            info!(from = %self.state, to = %next, addr = %self.addr, "Status feed");
            self.state = next;
        }
    }

    /// Close the current socket (if any) and record why.
    fn drop_connection(&mut self, reason: ConnectionState) {
        self.lines = None;
        self.empty_polls = 0;
        self.transition(reason);
    }

    /// Drop a link the console closed or reset. A link that closed before
    /// delivering anything waits `retry_delay` before the next connect.
    async fn reconnect_after_close(&mut self) {
        let delivered = self.received;
        self.drop_connection(ConnectionState::Disconnected);
        if !delivered {
            debug!(
                "Status feed closed without data, waiting {}s",
                self.timing.retry_delay.as_secs_f64()
            );
            tokio::time::sleep(self.timing.retry_delay).await;
        }
    }

    async fn ensure_connected(&mut self) {
        if self.lines.is_some() {
            return;
        }
        self.transition(ConnectionState::Connecting);

        let addr = self.addr.clone();
        let timeout = self.timing.connect_timeout;
        let mut attempts = 0u64;
        let stream = retry_forever("Status feed connect", self.timing.retry_delay, || {
            attempts += 1;
            connect(addr.clone(), timeout)
        })
        .await;

        self.connect_attempts += attempts;
        self.connects += 1;
        self.empty_polls = 0;
        self.received = false;
        self.lines = Some(BufReader::new(stream).lines());
        self.transition(ConnectionState::Connected);
    }

    /// Block until a non-empty line arrives, reconnecting as needed.
    pub async fn read_status_line(&mut self) -> String {
        loop {
            self.ensure_connected().await;
            let Some(lines) = self.lines.as_mut() else {
                continue;
            };

            match tokio::time::timeout(self.timing.poll_interval, lines.next_line()).await {
                Ok(Ok(Some(line))) => {
                    self.empty_polls = 0;
                    self.received = true;
                    let line = normalize(&line);
                    if line.is_empty() {
                        continue;
                    }
                    debug!("Data received: {}", line);
                    return line.to_string();
                }
                Ok(Ok(None)) => {
                    warn!("Status feed closed by the console, reconnecting");
                    self.reconnect_after_close().await;
                }
                Ok(Err(e)) => {
                    warn!("Status feed socket error ({}), reconnecting", e);
                    self.reconnect_after_close().await;
                }
                Err(_) => {
                    self.empty_polls += 1;
                    debug!(
                        "No status data ({}/{} empty polls)",
                        self.empty_polls, self.timing.max_empty_polls
                    );
                    if self.empty_polls >= self.timing.max_empty_polls {
                        let silent = self.timing.poll_interval * self.timing.max_empty_polls;
                        warn!(
                            "No status data for {}s, treating link as stale",
                            silent.as_secs_f64()
                        );
                        self.drop_connection(ConnectionState::Stale);
                    }
                }
            }
        }
    }
}

impl StatusSource for StatusFeed {
    async fn next_status_line(&mut self) -> String {
        self.read_status_line().await
    }
}

async fn connect(addr: String, timeout: Duration) -> io::Result<TcpStream> {
    match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connect to {addr} timed out"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn fast_timing() -> FeedTiming {
        FeedTiming {
            retry_delay: Duration::from_millis(20),
            poll_interval: Duration::from_millis(20),
            max_empty_polls: 3,
            connect_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_default_timing_matches_settings() {
        let timing = FeedTiming::default();
        assert_eq!(timing.retry_delay, Duration::from_secs(5));
        assert_eq!(timing.poll_interval * timing.max_empty_polls, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_yields_trimmed_lines_and_skips_blank_ones() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"  CUSA12345  \r\n\n\nNO_GAME_RUNNING\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut feed = StatusFeed::new(addr.to_string(), fast_timing());
        assert_eq!(feed.state(), ConnectionState::Disconnected);
        assert_eq!(feed.next_status_line().await, "CUSA12345");
        assert_eq!(feed.state(), ConnectionState::Connected);
        assert_eq!(feed.next_status_line().await, "NO_GAME_RUNNING");
        assert_eq!(feed.connects(), 1);
    }

    #[tokio::test]
    async fn test_keeps_retrying_until_console_listens() {
        // Reserve a port, then release it so the first attempts are refused.
        let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = reserved.local_addr().unwrap();
        drop(reserved);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            let listener = TcpListener::bind(addr).await.unwrap();
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"PPSA01284\n").await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut feed = StatusFeed::new(addr.to_string(), fast_timing());
        let line = tokio::time::timeout(Duration::from_secs(5), feed.next_status_line())
            .await
            .expect("feed should connect eventually");
        assert_eq!(line, "PPSA01284");
        assert!(feed.connect_attempts() >= 2);
        assert_eq!(feed.connects(), 1);
    }

    #[tokio::test]
    async fn test_silent_link_goes_stale_and_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // First connection: accept and say nothing.
            let (_silent, _) = listener.accept().await.unwrap();
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"CUSA00900\n").await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut feed = StatusFeed::new(addr.to_string(), fast_timing());
        let line = tokio::time::timeout(Duration::from_secs(5), feed.next_status_line())
            .await
            .expect("stale link should be replaced");
        assert_eq!(line, "CUSA00900");
        assert_eq!(feed.connects(), 2);
    }

    #[tokio::test]
    async fn test_peer_close_after_data_reconnects_immediately() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut first, _) = listener.accept().await.unwrap();
            first.write_all(b"CUSA00001\n").await.unwrap();
            drop(first);
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"LAPY20001\n").await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        // Neither the retry delay nor the staleness window can elapse within
        // the test timeout, so only an immediate reconnect gets the line.
        let timing = FeedTiming {
            retry_delay: Duration::from_secs(30),
            poll_interval: Duration::from_secs(10),
            ..fast_timing()
        };
        let mut feed = StatusFeed::new(addr.to_string(), timing);
        assert_eq!(feed.next_status_line().await, "CUSA00001");
        let line = tokio::time::timeout(Duration::from_secs(5), feed.next_status_line())
            .await
            .expect("closed link should be replaced");
        assert_eq!(line, "LAPY20001");
        assert_eq!(feed.connects(), 2);
    }

    #[tokio::test]
    async fn test_reset_after_data_reconnects_immediately() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut first, _) = listener.accept().await.unwrap();
            first.write_all(b"CUSA00001\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            // Zero linger turns the close into a RST.
            first.set_linger(Some(Duration::ZERO)).unwrap();
            drop(first);
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"PPSA01284\n").await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let timing = FeedTiming {
            retry_delay: Duration::from_secs(30),
            poll_interval: Duration::from_secs(10),
            ..fast_timing()
        };
        let mut feed = StatusFeed::new(addr.to_string(), timing);
        assert_eq!(feed.next_status_line().await, "CUSA00001");
        let line = tokio::time::timeout(Duration::from_secs(5), feed.next_status_line())
            .await
            .expect("reset link should be replaced");
        assert_eq!(line, "PPSA01284");
        assert_eq!(feed.connects(), 2);
        assert_eq!(feed.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_close_without_data_waits_retry_delay() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let timing = FeedTiming {
            retry_delay: Duration::from_millis(100),
            poll_interval: Duration::from_secs(10),
            ..fast_timing()
        };
        let mut feed = StatusFeed::new(addr.to_string(), timing);
        let outcome =
            tokio::time::timeout(Duration::from_millis(450), feed.next_status_line()).await;
        assert!(outcome.is_err(), "no line should ever arrive");
        assert!(feed.connects() >= 2, "connects = {}", feed.connects());
        assert!(feed.connects() <= 7, "connects = {}", feed.connects());
    }
}
