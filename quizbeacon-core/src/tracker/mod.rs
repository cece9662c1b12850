//! Behavioral telemetry tracker
//!
//! The tracker owns all tracking state for one host "page": the session
//! identity, the write-once network context, the session clock and the
//! current URL path. Events are composed into [`EventEnvelope`]s and
//! delivered fire-and-forget by detached tasks.
//!
//! ## Bootstrap ordering
//!
//! [`Tracker::init`] resolves the network context first, then emits the
//! initial `pageView`, then the caller (or [`Tracker::init`] itself) starts
//! the heartbeat. Events emitted before resolution completes observe the
//! `"Unknown"` ip; that is the only ordering guarantee. Two deliveries race
//! independently and may arrive at the backend out of order.

mod client;
mod envelope;
mod page;

pub use client::TrackClient;
pub use envelope::EventEnvelope;
pub use page::logical_page;

use std::sync::{Arc, OnceLock, RwLock};
use std::time::Instant;

use serde_json::{json, Value};

use crate::config::TrackerConfig;
use crate::context::{resolve_device, NetworkResolver, UNKNOWN_IP};
use crate::error::Result;
use crate::lifecycle;
use crate::session::SessionStore;

/// All tracking state for one host page
pub struct Tracker {
    session_id: String,
    user_agent: String,
    client: TrackClient,
    /// Network origin, written once after bootstrap resolution
    ip: OnceLock<String>,
    /// Current URL path; updated on reload-free navigation
    path: RwLock<String>,
    /// Session clock: set at construction, never reset
    started: Instant,
}

impl Tracker {
    /// Construct a tracker without any network activity.
    ///
    /// Events emitted before [`Tracker::init`] (or a manual ip resolution)
    /// observe `ip = "Unknown"`. Most hosts want `init` instead.
    pub fn new(config: &TrackerConfig, session_id: String, path: &str) -> Result<Arc<Self>> {
        config.validate()?;

        Ok(Arc::new(Self {
            session_id,
            user_agent: config.user_agent.clone(),
            client: TrackClient::new(config)?,
            ip: OnceLock::new(),
            path: RwLock::new(path.to_string()),
            started: Instant::now(),
        }))
    }

    /// Bootstrap the tracker: resolve the network context, emit the initial
    /// `pageView`, and start the heartbeat.
    ///
    /// Resolution is awaited before the `pageView` is emitted, so under
    /// normal conditions the first event already carries a resolved ip.
    pub async fn init(
        config: &TrackerConfig,
        session: &mut SessionStore,
        path: &str,
    ) -> Result<Arc<Self>> {
        let tracker = Self::new(config, session.session_id(), path)?;

        let resolver = NetworkResolver::new(config)?;
        let ip = resolver.resolve().await;
        tracing::info!(ip = %ip, session_id = %tracker.session_id, "Tracker bootstrapped");
        let _ = tracker.ip.set(ip);

        tracker.track_page_view();

        lifecycle::spawn_heartbeat(
            Arc::clone(&tracker),
            std::time::Duration::from_secs(config.heartbeat_secs),
        );

        Ok(tracker)
    }

    /// The durable session identifier events are attributed to
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The cached network origin, or "Unknown" before resolution
    pub fn ip(&self) -> &str {
        self.ip.get().map(String::as_str).unwrap_or(UNKNOWN_IP)
    }

    /// Record a reload-free navigation to a new path
    pub fn navigate(&self, path: &str) {
        let mut current = self.path.write().expect("path lock poisoned");
        *current = path.to_string();
    }

    fn path(&self) -> String {
        self.path.read().expect("path lock poisoned").clone()
    }

    /// The logical page for the current path
    pub fn current_page(&self) -> String {
        logical_page(&self.path())
    }

    /// Whole seconds elapsed since the session clock started.
    ///
    /// Cumulative and monotonically non-decreasing: the clock is never
    /// reset, so successive reads report totals, not deltas.
    pub fn time_spent_secs(&self) -> u64 {
        self.started.elapsed().as_secs_f64().round() as u64
    }

    /// Compose the envelope for an event without sending it.
    ///
    /// Device context is re-derived from the user-agent on every call;
    /// `url` and `timestamp` are injected into the event data.
    pub fn envelope(&self, event_name: &str, event_data: Value) -> EventEnvelope {
        EventEnvelope::new(
            self.session_id.clone(),
            resolve_device(&self.user_agent),
            self.ip().to_string(),
            event_name,
            event_data,
            &self.path(),
        )
    }

    /// Emit an event: compose the envelope and deliver it from a detached
    /// task. Best-effort, at-most-once; failures are logged and discarded.
    ///
    /// Must be called within a tokio runtime.
    pub fn track(&self, event_name: &str, event_data: Value) {
        let envelope = self.envelope(event_name, event_data);
        tracing::debug!(event = event_name, "Emitting event");

        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.send(&envelope).await {
                tracing::warn!(event = %envelope.event_name, error = %e, "Event delivery failed");
            }
        });
    }

    /// Emit the `pageView` event for the current page
    pub fn track_page_view(&self) {
        self.track("pageView", json!({ "page": self.current_page() }));
    }

    /// Emit the periodic `timeSpent` event with the cumulative duration
    pub fn track_time_spent(&self) {
        self.track("timeSpent", json!({ "duration": self.time_spent_secs() }));
    }

    /// Emit a `quizAnswer` event with the full answer detail
    pub fn track_quiz_answer(
        &self,
        question_id: i64,
        selected_answer: &str,
        is_correct: bool,
        page: Option<&str>,
    ) {
        self.track(
            "quizAnswer",
            json!({
                "questionId": question_id,
                "selectedAnswer": selected_answer,
                "isCorrect": is_correct,
                "page": self.page_or_current(page),
            }),
        );
    }

    /// Emit a minimal `quizAnswer` progress event (no answer text or page)
    pub fn track_quiz_progress(&self, question_id: i64, is_correct: bool) {
        self.track(
            "quizAnswer",
            json!({ "questionId": question_id, "isCorrect": is_correct }),
        );
    }

    /// Emit a `quizSearch` event
    pub fn track_quiz_search(&self, search_term: &str, page: Option<&str>) {
        self.track(
            "quizSearch",
            json!({
                "searchTerm": search_term,
                "page": self.page_or_current(page),
            }),
        );
    }

    /// Emit a `questionView` event
    pub fn track_quiz_question_view(&self, question_id: i64, page: Option<&str>) {
        self.track(
            "questionView",
            json!({
                "questionId": question_id,
                "page": self.page_or_current(page),
            }),
        );
    }

    /// Emit a `quizPageNavigation` event
    pub fn track_quiz_page_navigation(&self, from_page: &str, to_page: &str) {
        self.track(
            "quizPageNavigation",
            json!({ "fromPage": from_page, "toPage": to_page }),
        );
    }

    /// Final best-effort flush: emit `pageUnload` and await its delivery
    /// instead of detaching it, so teardown does not race the send.
    pub async fn shutdown(&self) {
        let envelope = self.envelope("pageUnload", json!({ "page": self.current_page() }));
        if let Err(e) = self.client.send(&envelope).await {
            tracing::warn!(error = %e, "Final pageUnload delivery failed");
        }
    }

    fn page_or_current(&self, page: Option<&str>) -> String {
        match page {
            Some(p) => p.to_string(),
            None => self.current_page(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tracker(path: &str) -> Arc<Tracker> {
        let config = TrackerConfig {
            ingest_url: "http://127.0.0.1:9/api/track".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0".to_string(),
            ..Default::default()
        };
        Tracker::new(&config, "session-test".to_string(), path).unwrap()
    }

    #[test]
    fn test_ip_unknown_before_resolution() {
        let tracker = test_tracker("/");
        assert_eq!(tracker.ip(), UNKNOWN_IP);

        let envelope = tracker.envelope("pageView", json!({}));
        assert_eq!(envelope.ip, "Unknown");
    }

    #[test]
    fn test_navigate_updates_current_page() {
        let tracker = test_tracker("/");
        assert_eq!(tracker.current_page(), "home");

        tracker.navigate("/quiz/page/9");
        assert_eq!(tracker.current_page(), "9");

        let envelope = tracker.envelope("pageHidden", json!({}));
        assert_eq!(envelope.event_data["url"], "/quiz/page/9");
    }

    #[test]
    fn test_envelope_carries_recomputed_device() {
        let tracker = test_tracker("/");
        let envelope = tracker.envelope("pageView", json!({}));
        assert_eq!(envelope.device_info.model, "Desktop");
        assert_eq!(envelope.session_id, "session-test");
    }

    #[test]
    fn test_quiz_answer_envelope_fields() {
        let tracker = test_tracker("/quiz/page/3");
        let envelope = tracker.envelope(
            "quizAnswer",
            json!({ "questionId": 7, "isCorrect": true }),
        );

        let data = envelope.event_data.as_object().unwrap();
        assert_eq!(data["questionId"], 7);
        assert_eq!(data["isCorrect"], true);
        assert_eq!(data["url"], "/quiz/page/3");
        assert!(data["timestamp"].is_i64());
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn test_time_spent_is_cumulative() {
        let tracker = test_tracker("/");
        let first = tracker.time_spent_secs();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let second = tracker.time_spent_secs();

        assert!(second >= first + 1, "clock must accumulate, got {} then {}", first, second);

        std::thread::sleep(std::time::Duration::from_millis(1100));
        let third = tracker.time_spent_secs();
        assert!(third >= second + 1);
    }

    #[tokio::test]
    async fn test_track_does_not_block_or_panic_on_dead_endpoint() {
        let tracker = test_tracker("/");
        tracker.track("pageView", json!({}));
        tracker.track_quiz_search("rust", None);
        // Detached deliveries fail against the dead endpoint; the caller
        // never observes it
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}
