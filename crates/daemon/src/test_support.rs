use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use titlecast_core::{ActivityPayload, ConnectionState, DisplayRecord, StatusKind};
use titlecast_lookup_client::{LookupError, TitleLookup};

use crate::feed::StatusSource;
use crate::publisher::{PresenceSink, PublishError};

/// Yields a fixed list of lines, then waits forever.
pub struct ScriptedSource {
    lines: VecDeque<String>,
}

impl ScriptedSource {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|line| line.to_string()).collect(),
        }
    }
}

impl StatusSource for ScriptedSource {
    async fn next_status_line(&mut self) -> String {
        match self.lines.pop_front() {
            Some(line) => line,
            None => std::future::pending().await,
        }
    }
}

enum Outcome {
    Succeed,
    Fail,
    Return(DisplayRecord),
}

pub struct FakeLookup {
    calls: AtomicUsize,
    outcome: Outcome,
}

impl FakeLookup {
    /// Resolves every key to `Title <key>` with an image and a page.
    pub fn succeeding() -> Self {
        Self::with(Outcome::Succeed)
    }

    /// Fails every lookup with an HTTP 500.
    pub fn failing() -> Self {
        Self::with(Outcome::Fail)
    }

    pub fn returning(record: DisplayRecord) -> Self {
        Self::with(Outcome::Return(record))
    }

    fn with(outcome: Outcome) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            outcome,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TitleLookup for FakeLookup {
    async fn lookup(&self, _kind: StatusKind, key: &str) -> Result<DisplayRecord, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Succeed => Ok(DisplayRecord::new(
                format!("Title {key}"),
                format!("https://img.test/{key}.png"),
                format!("https://page.test/{key}"),
                key,
            )),
            Outcome::Fail => Err(LookupError::Status {
                status: 500,
                body: "boom".to_string(),
            }),
            Outcome::Return(record) => Ok(record.clone()),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    published: Vec<ActivityPayload>,
    attempts: usize,
    clears: usize,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn published(&self) -> &[ActivityPayload] {
        &self.published
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl PresenceSink for RecordingSink {
    async fn publish(&mut self, activity: &ActivityPayload) -> Result<(), PublishError> {
        self.attempts += 1;
        if self.fail {
            return Err(PublishError::Closed("sink offline".to_string()));
        }
        self.published.push(activity.clone());
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), PublishError> {
        self.clears += 1;
        self.published.clear();
        Ok(())
    }

    /// A failing sink reports its link as down.
    fn state(&self) -> ConnectionState {
        if self.fail {
            ConnectionState::Disconnected
        } else {
            ConnectionState::Connected
        }
    }
}
