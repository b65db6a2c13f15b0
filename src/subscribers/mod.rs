//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and built-in subscribers for events published on the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Orchestrator ── publish(Event) ──► Bus ──► Suite forwarder ──► SubscriberSet
//!                                                                   │
//!                                        ┌──────────────┬───────────┼────────┐
//!                                        ▼              ▼           ▼        ▼
//!                                     LogWriter      Recorder     Custom    ...
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** observe and react (logging, metrics, alerts)
//! - **Stateful subscribers** keep what they saw ([`Recorder`])

#[cfg(feature = "logging")]
mod log;
mod recorder;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use recorder::Recorder;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
pub(crate) use subscriber_set::panic_message;
