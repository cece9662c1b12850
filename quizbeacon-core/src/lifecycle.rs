//! Page lifecycle instrumentation
//!
//! Maps host lifecycle signals (visibility, focus, unload) to named events
//! and drives the periodic `timeSpent` heartbeat. The host environment is
//! responsible for delivering signals via [`Tracker::observe`]; the tracker
//! never removes listeners or stops the heartbeat on its own; teardown is
//! the host's [`Tracker::shutdown`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::tracker::Tracker;

/// Host lifecycle transitions the tracker reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// The page became hidden (tab switched away, window minimized)
    Hidden,
    /// The page became visible again
    Visible,
    /// The page is about to be torn down
    Unload,
    /// The window gained focus
    Focus,
    /// The window lost focus
    Blur,
}

impl LifecycleSignal {
    /// The event name emitted for this signal
    pub fn event_name(&self) -> &'static str {
        match self {
            LifecycleSignal::Hidden => "pageHidden",
            LifecycleSignal::Visible => "pageVisible",
            LifecycleSignal::Unload => "pageUnload",
            LifecycleSignal::Focus => "pageFocus",
            LifecycleSignal::Blur => "pageBlur",
        }
    }
}

impl Tracker {
    /// Emit the event for a lifecycle signal, with the current logical page
    /// as its payload
    pub fn observe(&self, signal: LifecycleSignal) {
        self.track(signal.event_name(), json!({ "page": self.current_page() }));
    }
}

/// Start the periodic `timeSpent` heartbeat.
///
/// Emits once per `period` (15s by default) for as long as the tracker
/// lives; it is never stopped by the tracker itself. The returned handle is
/// for tests: dropping it leaves the task running.
pub fn spawn_heartbeat(tracker: Arc<Tracker>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately; the heartbeat starts one
        // full period after bootstrap
        ticker.tick().await;
        loop {
            ticker.tick().await;
            tracker.track_time_spent();
        }
    })
}
