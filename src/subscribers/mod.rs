//! # Event subscribers for the fluentask runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the optional built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   runner / looper ── publish(Event) ──► Bus ──► event listener (Runtime)
//!                                                        │
//!                                                 SubscriberSet::emit
//!                                                   ┌────┴────┬─────────┐
//!                                                   ▼         ▼         ▼
//!                                               LogWriter  Metrics   Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
