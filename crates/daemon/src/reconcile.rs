//! The top-level reconciliation loop.
//!
//! Reads status lines, drops consecutive duplicates, resolves new keys and
//! publishes the resulting activity. The loop owns the resolver (and with it
//! the title cache) and the last processed key, so every mutation happens on
//! one task.

use titlecast_core::status::{is_idle, normalize};
use titlecast_core::ActivityPayload;
use titlecast_lookup_client::TitleLookup;
use tracing::{debug, info, warn};

use crate::feed::StatusSource;
use crate::publisher::{now_epoch_secs, PresenceSink};
use crate::resolver::TitleResolver;

pub struct Bridge<S, L, P> {
    source: S,
    resolver: TitleResolver<L>,
    sink: P,
    buttons_enabled: bool,
    /// `None` until the first line is processed, so that line always publishes.
    last_processed: Option<String>,
    clock: fn() -> i64,
}

impl<S, L, P> Bridge<S, L, P>
where
    S: StatusSource,
    L: TitleLookup,
    P: PresenceSink,
{
    pub fn new(source: S, resolver: TitleResolver<L>, sink: P, buttons_enabled: bool) -> Self {
        Self {
            source,
            resolver,
            sink,
            buttons_enabled,
            last_processed: None,
            clock: now_epoch_secs,
        }
    }

    /// Replace the start-timestamp clock.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn last_processed(&self) -> Option<&str> {
        self.last_processed.as_deref()
    }

    pub fn resolver(&self) -> &TitleResolver<L> {
        &self.resolver
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_sink(self) -> P {
        self.sink
    }

    /// Run until the surrounding task is dropped.
    pub async fn run(&mut self) {
        info!("Waiting for status updates");
        loop {
            self.step().await;
        }
    }

    /// Clear the published activity, unless the presence link is known to
    /// be down.
    pub async fn clear_presence(&mut self) {
        let state = self.sink.state();
        if !state.is_connected() {
            debug!("Presence link is {}, not clearing activity", state);
            return;
        }
        match self.sink.clear().await {
            Ok(()) => info!("Cleared activity"),
            Err(e) => debug!("Failed to clear activity: {}", e),
        }
    }

    /// Process one line from the source. Returns the published payload, or
    /// `None` when the line was a duplicate.
    pub async fn step(&mut self) -> Option<ActivityPayload> {
        let line = self.source.next_status_line().await;
        self.handle_line(&line).await
    }

    pub async fn handle_line(&mut self, raw: &str) -> Option<ActivityPayload> {
        let key = normalize(raw);
        if key.is_empty() {
            return None;
        }
        if self.last_processed.as_deref() == Some(key) {
            debug!("Status unchanged ({}), not updating activity", key);
            return None;
        }

        let record = self.resolver.resolve(key).await;
        let now = (self.clock)();
        let payload = if is_idle(key) {
            ActivityPayload::idle(now)
        } else {
            ActivityPayload::for_title(&record, now, self.buttons_enabled)
        };

        match self.sink.publish(&payload).await {
            Ok(()) => info!("Updated activity: {} ({})", payload.details, key),
            Err(e) => warn!("Failed to publish activity for {}: {}", key, e),
        }

        self.last_processed = Some(key.to_string());
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TitleCache;
    use crate::test_support::{FakeLookup, RecordingSink, ScriptedSource};
    use titlecast_core::activity::PAGE_BUTTON_LABEL;
    use titlecast_core::testing;

    fn fixed_clock() -> i64 {
        1_700_000_000
    }

    fn bridge(
        lines: &[&str],
        lookup: FakeLookup,
        sink: RecordingSink,
        buttons: bool,
    ) -> (
        tempfile::TempDir,
        Bridge<ScriptedSource, FakeLookup, RecordingSink>,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let cache = TitleCache::empty(dir.path().join("cache.json"));
        let resolver = TitleResolver::new(lookup, cache);
        let bridge = Bridge::new(ScriptedSource::new(lines), resolver, sink, buttons)
            .with_clock(fixed_clock);
        (dir, bridge)
    }

    async fn drain<S: StatusSource, L: TitleLookup, P: PresenceSink>(
        bridge: &mut Bridge<S, L, P>,
        steps: usize,
    ) {
        for _ in 0..steps {
            bridge.step().await;
        }
    }

    #[tokio::test]
    async fn test_duplicate_lines_publish_once() {
        let (_dir, mut bridge) = bridge(
            &["NO_GAME_RUNNING\n", "CUSA12345\n", "CUSA12345\n"],
            FakeLookup::succeeding(),
            RecordingSink::default(),
            false,
        );
        drain(&mut bridge, 3).await;

        let published = bridge.sink().published();
        assert_eq!(published.len(), 2);
        assert!(published[0].is_idle());
        assert_eq!(published[1].details, "Title CUSA12345");
        assert_eq!(published[1].start, fixed_clock());
        assert_eq!(bridge.last_processed(), Some("CUSA12345"));
    }

    #[tokio::test]
    async fn test_first_idle_line_always_publishes() {
        let (_dir, mut bridge) = bridge(
            &["NO_GAME_RUNNING"],
            FakeLookup::succeeding(),
            RecordingSink::default(),
            false,
        );
        assert!(bridge.last_processed().is_none());
        let payload = bridge.step().await.expect("first line publishes");
        assert!(payload.is_idle());
        assert_eq!(payload.start, fixed_clock());
    }

    #[tokio::test]
    async fn test_returning_to_previous_title_republishes() {
        let (_dir, mut bridge) = bridge(
            &["CUSA12345", "NO_GAME_RUNNING", "CUSA12345"],
            FakeLookup::succeeding(),
            RecordingSink::default(),
            false,
        );
        drain(&mut bridge, 3).await;

        assert_eq!(bridge.sink().published().len(), 3);
        // Second resolution of the same key came from the cache.
        assert_eq!(bridge.resolver().lookup().calls(), 1);
    }

    #[tokio::test]
    async fn test_whitespace_variants_are_duplicates() {
        let (_dir, mut bridge) = bridge(
            &["PPSA01284", "  PPSA01284\r\n"],
            FakeLookup::succeeding(),
            RecordingSink::default(),
            false,
        );
        drain(&mut bridge, 2).await;
        assert_eq!(bridge.sink().published().len(), 1);
    }

    #[tokio::test]
    async fn test_button_needs_flag_and_page() {
        let (_dir, mut with_buttons) = bridge(
            &["PPSA01284"],
            FakeLookup::succeeding(),
            RecordingSink::default(),
            true,
        );
        let payload = with_buttons.step().await.unwrap();
        assert_eq!(payload.buttons.len(), 1);
        assert_eq!(payload.buttons[0].label, PAGE_BUTTON_LABEL);
        assert_eq!(payload.buttons[0].url, "https://page.test/PPSA01284");

        let (_dir, mut without_buttons) = bridge(
            &["PPSA01284"],
            FakeLookup::succeeding(),
            RecordingSink::default(),
            false,
        );
        assert!(without_buttons.step().await.unwrap().buttons.is_empty());
    }

    #[tokio::test]
    async fn test_cached_record_without_page_gets_no_button() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = TitleCache::empty(dir.path().join("cache.json"));
        cache
            .put(
                "CUSA99999",
                testing::record_without_page("Test Game", "http://x/img.png"),
            )
            .unwrap();
        let resolver = TitleResolver::new(FakeLookup::succeeding(), cache);
        let mut bridge = Bridge::new(
            ScriptedSource::new(&["CUSA99999\n"]),
            resolver,
            RecordingSink::default(),
            true,
        );

        let payload = bridge.step().await.unwrap();
        assert_eq!(payload.details, "Test Game");
        assert_eq!(payload.large_image, "http://x/img.png");
        assert!(payload.buttons.is_empty());
        assert_eq!(bridge.resolver().lookup().calls(), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_stop_the_loop() {
        let (_dir, mut bridge) = bridge(
            &["CUSA12345", "PPSA01284", "PPSA01284"],
            FakeLookup::succeeding(),
            RecordingSink::failing(),
            false,
        );
        drain(&mut bridge, 3).await;

        // Both distinct keys were attempted; the repeat was still deduplicated.
        assert_eq!(bridge.sink().attempts(), 2);
        assert!(bridge.sink().published().is_empty());
        assert_eq!(bridge.last_processed(), Some("PPSA01284"));
    }

    #[tokio::test]
    async fn test_blank_lines_are_ignored() {
        let (_dir, mut bridge) = bridge(
            &["CUSA12345"],
            FakeLookup::succeeding(),
            RecordingSink::default(),
            false,
        );
        assert!(bridge.handle_line("   \n").await.is_none());
        assert!(bridge.last_processed().is_none());
        assert!(bridge.sink().published().is_empty());
    }

    #[tokio::test]
    async fn test_clear_presence_when_connected() {
        let (_dir, mut bridge) = bridge(
            &["CUSA12345"],
            FakeLookup::succeeding(),
            RecordingSink::default(),
            false,
        );
        bridge.step().await;
        assert_eq!(bridge.sink().published().len(), 1);

        bridge.clear_presence().await;
        assert_eq!(bridge.sink().clears(), 1);
        assert!(bridge.sink().published().is_empty());
    }

    #[tokio::test]
    async fn test_clear_presence_skipped_when_link_is_down() {
        let (_dir, mut bridge) = bridge(
            &["CUSA12345"],
            FakeLookup::succeeding(),
            RecordingSink::failing(),
            false,
        );
        bridge.step().await;
        assert!(!bridge.sink().state().is_connected());

        bridge.clear_presence().await;
        assert_eq!(bridge.sink().clears(), 0);
    }
}
