//! # quizbeacon-core
//!
//! Core library for quizbeacon - a behavioral telemetry collector for a
//! quiz application.
//!
//! This library provides:
//! - Durable anonymous session identity
//! - Device and network context resolution
//! - Event envelope construction and best-effort delivery
//! - Page lifecycle instrumentation and the periodic heartbeat
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! One [`Tracker`] per host "page" owns all tracking state. Bootstrap
//! resolves the network context once, emits the initial `pageView`, then
//! starts the heartbeat; every later emission recomputes device context,
//! reads the cached ip and the session id, and fires a detached,
//! at-most-once delivery. Telemetry degrades silently: no failure in this
//! crate is ever fatal to the host.
//!
//! ## Example
//!
//! ```rust,no_run
//! use quizbeacon_core::{Config, SessionStore, Tracker};
//!
//! # async fn run() -> quizbeacon_core::Result<()> {
//! let config = Config::load()?;
//! let mut session = SessionStore::open(config.session_path(), config.session.ttl_days);
//! let tracker = Tracker::init(&config.tracker, &mut session, "/").await?;
//!
//! tracker.track_quiz_answer(7, "B", true, None);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use context::{resolve_device, DeviceContext, NetworkResolver, Os, UNKNOWN_IP};
pub use error::{Error, Result};
pub use lifecycle::{spawn_heartbeat, LifecycleSignal};
pub use session::SessionStore;
pub use tracker::{logical_page, EventEnvelope, TrackClient, Tracker};

// Public modules
pub mod config;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod session;
pub mod tracker;
