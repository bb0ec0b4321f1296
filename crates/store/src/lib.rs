//! Local-first, event-sourced store for reading notes.
//!
//! A [`Store`] owns an append-only event log and the read tables
//! materialized from it. Every change is a validated domain event passed to
//! [`Store::commit`]; the service methods add the referential checks a caller
//! needs (the book exists, the notes belong to the same book). Reads go
//! through [`projections::Query`], either once or as a live subscription.
//!
//! Spoiler-safe views filter notes and relationships by the reader's page
//! (see [`visibility`]), and deletes cascade from books to notes to
//! relationships (see [`cascade`]).

pub mod cascade;
pub mod commands;
pub mod config;
pub mod error;
pub mod graph;
pub mod service;
pub mod store;
pub mod view;
pub mod visibility;

pub use cascade::{
    CascadeDelete, CascadeFailure, CascadePlan, CascadeReport, plan_book_deletion,
    plan_note_deletion,
};
pub use commands::{
    CreateBook, CreateNote, CreateRelationship, UpdateBook, UpdateNote, UpdateRelationship,
};
pub use config::StoreConfig;
pub use error::{InvalidRelationship, Result, StoreError};
pub use graph::{CharacterGraph, GroupLink, OrganizationGroup, character_graph};
pub use service::NoteDetail;
pub use store::Store;
pub use view::BookView;
pub use visibility::{VisibleSet, is_visible, max_page};
