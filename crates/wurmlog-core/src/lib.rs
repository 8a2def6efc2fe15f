//! Core types for the wurmlog event log.
//!
//! Events are attributed to an actor, stamped with a calendar date and a time
//! of day, and phrased through a shared message template. The three
//! dimensions are deduplicated by natural key; entries are append-only and
//! carry a concrete variant (currently only `action`). This crate holds the
//! domain model and the [`EventLog`] handle; storage backends implement
//! [`store::LogStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod dimension;
pub mod entry;
pub mod error;
pub mod log;
pub mod reconstruct;
pub mod store;
pub mod template;

pub use error::{Error, Result};
pub use log::EventLog;
