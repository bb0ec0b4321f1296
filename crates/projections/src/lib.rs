//! Read tables and queries for the reading-companion store.
//!
//! This crate provides the read side of the store:
//! - [`materialize`], the pure event → row-mutation function
//! - [`ReadTables`] and [`Table`], the in-memory tables derived from the log
//! - [`Query`], a declarative filter/sort builder over one table
//! - [`LiveQueries`], a registry of subscriptions refreshed after commits
//! - [`ProjectionProcessor`] for replaying the event log into tables

pub mod error;
pub mod live;
pub mod materialize;
pub mod processor;
pub mod query;
pub mod read_model;
pub mod table;

pub use error::{ProjectionError, Result};
pub use live::{LiveQueries, LiveQuery, Snapshot};
pub use materialize::{Mutation, MutationKind, TableMutation, materialize};
pub use processor::ProjectionProcessor;
pub use query::Query;
pub use read_model::ReadTables;
pub use table::{Row, Table};
