//! # Bizdesk
//!
//! **Headless client core for small-business management.**
//!
//! Bizdesk provides the state machines that every screen of a
//! customers / products / services / orders client repeats, independent of
//! any UI toolkit, plus a `bizdesk` CLI that drives them against a REST
//! backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │ Search input │──▶│ SearchController │──▶│ ListController│
//! │ (keystrokes) │   │  (debounce)      │   │ (PagedList)   │
//! └──────────────┘   └──────────────────┘   └──────┬────────┘
//!                                                  │ Collection<T>
//!                         ┌────────────────────────┤
//!                         ▼                        ▼
//!                  ┌──────────────┐        ┌──────────────┐
//!                  │ RestCollection│        │ InMemory     │
//!                  │ (reqwest)     │        │ Collection   │
//!                  └──────────────┘        └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! bizdesk list customers --search ana --pages 2
//! bizdesk browse products
//! bizdesk order create --customer c1 --item product:p1=2 --item service:s1 --discount "R$ 5,00"
//! bizdesk invoice 42 --out pedido-42.html
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`notify`] | User-facing notices: `Notifier` trait, stderr/JSON/memory sinks |
//! | [`rest`] | `Collection` implementation over the backend REST API |
//! | [`list`] | Async paginated list controller with stale-response guard |
//! | [`search`] | Debouncer and debounced search controller |
//! | [`listing`] | `list` and `browse` commands |
//! | [`orders`] | Order draft building and the `order create` command |
//! | [`invoice`] | HTML invoice command |
//!
//! Records, money parsing, the paging state machine, and the order draft
//! live in the `bizdesk-core` crate; the types most callers need are
//! re-exported at the crate root.

pub mod config;
pub mod invoice;
pub mod list;
pub mod listing;
pub mod notify;
pub mod orders;
pub mod rest;
pub mod search;

pub use bizdesk_core::collection::{memory::InMemoryCollection, Collection, PageQuery};
pub use bizdesk_core::models::{Customer, Order, Product, Record, Service};
pub use list::{ListController, PageLoad};
pub use notify::{Notice, Notifier};
pub use search::{Debouncer, SearchController};
