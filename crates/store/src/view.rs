//! A book's notes and relationships as a reader at a given page sees them.

use common::BookId;
use domain::{Book, Note, NoteRelationship};
use projections::{Query, ReadTables};
use serde::Serialize;

use crate::error::Result;
use crate::service::live_book;
use crate::store::Store;
use crate::visibility;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    pub book: Book,
    /// The page the view was filtered at; `None` shows everything.
    pub current_page: Option<u32>,
    pub notes: Vec<Note>,
    pub relationships: Vec<NoteRelationship>,
    /// Highest page of any live note or relationship in the book, filtered or not.
    pub max_page: Option<u32>,
}

fn build_view(tables: &ReadTables, book: BookId, current_page: Option<u32>) -> Result<BookView> {
    let found = live_book(tables, book)?;
    let notes = Query::<Note>::new().book(book).run(tables);
    let relationships = Query::<NoteRelationship>::new()
        .touching_any(notes.iter().map(|n| n.id))
        .run(tables);
    let max_page = visibility::max_page(&notes, &relationships);
    let visible = visibility::filter(&notes, &relationships, current_page);

    Ok(BookView {
        book: found,
        current_page,
        notes: visible.notes,
        relationships: visible.relationships,
        max_page,
    })
}

impl Store {
    /// Returns the book's live notes and relationships visible at `current_page`.
    pub async fn book_view(&self, book: BookId, current_page: Option<u32>) -> Result<BookView> {
        self.read(|tables| build_view(tables, book, current_page))
            .await
    }

    /// Like [`book_view`](Self::book_view), at the reading progress stored on the book.
    pub async fn book_view_at_progress(&self, book: BookId) -> Result<BookView> {
        self.read(|tables| {
            let current_page = live_book(tables, book)?.current_page;
            build_view(tables, book, current_page)
        })
        .await
    }
}
