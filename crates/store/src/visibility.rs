//! Spoiler-safe filtering by reading progress.
//!
//! Pure functions over query results: no I/O, no store access. A note is
//! visible at `current_page` when its page has been reached. A relationship
//! additionally needs both of its endpoints to be visible. `None` as the
//! current page disables filtering.

use std::collections::HashSet;

use common::NoteId;
use domain::{Note, NoteRelationship};

/// Returns true if something first known at `page_number` may be shown to a
/// reader at `current_page`.
pub fn is_visible(page_number: u32, current_page: Option<u32>) -> bool {
    current_page.is_none_or(|current| page_number <= current)
}

/// The notes and relationships that pass the filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleSet {
    pub notes: Vec<Note>,
    pub relationships: Vec<NoteRelationship>,
}

impl VisibleSet {
    /// Returns true if the note with `id` passed the filter.
    pub fn contains_note(&self, id: NoteId) -> bool {
        self.notes.iter().any(|n| n.id == id)
    }
}

/// Keeps the notes reached by `current_page`, preserving order.
pub fn visible_notes(notes: &[Note], current_page: Option<u32>) -> Vec<Note> {
    notes
        .iter()
        .filter(|n| is_visible(n.page_number, current_page))
        .cloned()
        .collect()
}

/// Keeps the relationships whose own page and both endpoints are visible.
///
/// An endpoint missing from `notes` counts as not visible.
pub fn visible_relationships(
    relationships: &[NoteRelationship],
    notes: &[Note],
    current_page: Option<u32>,
) -> Vec<NoteRelationship> {
    let visible: HashSet<NoteId> = notes
        .iter()
        .filter(|n| is_visible(n.page_number, current_page))
        .map(|n| n.id)
        .collect();

    relationships
        .iter()
        .filter(|r| {
            is_visible(r.page_number, current_page)
                && visible.contains(&r.from_note_id)
                && visible.contains(&r.to_note_id)
        })
        .cloned()
        .collect()
}

/// Applies the filter to a book's notes and relationships.
pub fn filter(
    notes: &[Note],
    relationships: &[NoteRelationship],
    current_page: Option<u32>,
) -> VisibleSet {
    VisibleSet {
        notes: visible_notes(notes, current_page),
        relationships: visible_relationships(relationships, notes, current_page),
    }
}

/// The highest page any of the given live notes or relationships is tied
/// to, or `None` if there are none. Bounds page-selection controls.
pub fn max_page(notes: &[Note], relationships: &[NoteRelationship]) -> Option<u32> {
    notes
        .iter()
        .filter(|n| !n.is_deleted())
        .map(|n| n.page_number)
        .chain(
            relationships
                .iter()
                .filter(|r| !r.is_deleted())
                .map(|r| r.page_number),
        )
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use common::{BookId, RelationshipId};
    use domain::{NoteType, RelationshipType};

    fn note(page: u32) -> Note {
        let at = DateTime::from_timestamp_millis(0).unwrap();
        Note {
            id: NoteId::new(),
            book_id: BookId::new(),
            note_type: NoteType::Character,
            title: format!("p{page}"),
            content: None,
            page_number: page,
            metadata: None,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    fn rel(from: &Note, to: &Note, page: u32) -> NoteRelationship {
        NoteRelationship {
            id: RelationshipId::new(),
            from_note_id: from.id,
            to_note_id: to.id,
            relationship_type: RelationshipType::Ally,
            description: None,
            page_number: page,
            created_at: DateTime::from_timestamp_millis(0).unwrap(),
            deleted_at: None,
        }
    }

    #[test]
    fn note_visibility_is_monotonic_in_current_page() {
        for page in 1..=20u32 {
            assert!(is_visible(page, None));
            for current in 0..=20u32 {
                assert_eq!(is_visible(page, Some(current)), current >= page);
            }
        }
    }

    #[test]
    fn zero_hides_everything() {
        let notes = vec![note(1), note(2)];
        assert!(visible_notes(&notes, Some(0)).is_empty());
        assert_eq!(visible_notes(&notes, None).len(), 2);
    }

    #[test]
    fn relationship_needs_all_three_gates() {
        let early = note(1);
        let late = note(10);
        let notes = vec![early.clone(), late.clone()];

        let both_early = rel(&early, &early.clone(), 2);
        let to_late = rel(&early, &late, 2);
        let late_edge = rel(&early, &early.clone(), 8);
        let rels = vec![both_early.clone(), to_late.clone(), late_edge.clone()];

        let at_5 = visible_relationships(&rels, &notes, Some(5));
        assert_eq!(at_5, vec![both_early.clone()]);

        let at_10 = visible_relationships(&rels, &notes, Some(10));
        assert_eq!(at_10.len(), 3);

        let unfiltered = visible_relationships(&rels, &notes, None);
        assert_eq!(unfiltered.len(), 3);
    }

    #[test]
    fn relationship_to_unknown_note_is_hidden() {
        let a = note(1);
        let outsider = note(1);
        let rels = vec![rel(&a, &outsider, 1)];

        assert!(visible_relationships(&rels, std::slice::from_ref(&a), None).is_empty());
    }

    #[test]
    fn max_page_spans_notes_and_relationships() {
        let a = note(3);
        let b = note(7);
        let mut gone = note(50);
        gone.deleted_at = DateTime::from_timestamp_millis(1);
        let link = rel(&a, &b, 12);

        assert_eq!(max_page(&[a.clone(), b.clone(), gone], &[link]), Some(12));
        assert_eq!(max_page(&[a], &[]), Some(3));
        assert_eq!(max_page(&[], &[]), None);
    }

    #[test]
    fn filter_combines_both() {
        let a = note(1);
        let b = note(4);
        let link = rel(&a, &b, 4);
        let notes = vec![a.clone(), b.clone()];

        let at_3 = filter(&notes, std::slice::from_ref(&link), Some(3));
        assert_eq!(at_3.notes, vec![a.clone()]);
        assert!(at_3.relationships.is_empty());
        assert!(at_3.contains_note(a.id));
        assert!(!at_3.contains_note(b.id));

        let at_4 = filter(&notes, std::slice::from_ref(&link), Some(4));
        assert_eq!(at_4.notes.len(), 2);
        assert_eq!(at_4.relationships, vec![link]);
    }
}
