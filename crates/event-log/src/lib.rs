//! Append-only event log.
//!
//! The log is the durable source of truth for the store: every state change
//! is recorded as an immutable [`EventEnvelope`] and read tables are derived
//! from it by replaying envelopes in [`Sequence`] order.

pub mod error;
pub mod event;
pub mod log;
pub mod memory;
pub mod query;
pub mod sqlite;

pub use common::EventId;
pub use error::{EventLogError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, Sequence};
pub use log::{EventLog, EventLogExt, EventStream};
pub use memory::InMemoryEventLog;
pub use query::EventQuery;
pub use sqlite::SqliteEventLog;
