//! Captured exchanges and the read side of the exchange log.
//!
//! # Module Structure
//!
//! - `types` - `LoggedRequest`, `LoggedResponse`, `ServeEvent`
//! - `log` - `ServeEventLog` collaborator and the in-memory log
//! - `filter` - proxied-only + caller predicates over exchanges

mod filter;
mod log;
mod types;

pub use filter::{ExchangeFilter, ServeEventFilters, ServeEventPredicate};
pub use log::{InMemoryServeEventLog, ServeEventLog};
pub use types::{LoggedRequest, LoggedResponse, ServeEvent};
