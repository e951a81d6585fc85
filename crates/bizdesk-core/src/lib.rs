//! # Bizdesk Core
//!
//! Shared, runtime-agnostic logic for Bizdesk: record models, money
//! parsing, the paginated list state machine, the order draft aggregator,
//! the collection abstraction, and invoice rendering.
//!
//! This crate contains no tokio, reqwest, or filesystem I/O. Timers,
//! HTTP, and configuration live in the `bizdesk` application crate.

pub mod collection;
pub mod invoice;
pub mod models;
pub mod money;
pub mod order;
pub mod paging;
