//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the runtime, background runners,
//! the looper and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Runtime`, `core::runner`, `core::dispatch`, `Looper`, `TaskHandle::cancel`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the runtime's event listener, which fans out to `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
