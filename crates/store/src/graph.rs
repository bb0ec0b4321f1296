//! Character graph for a book, as seen at a given page.
//!
//! Nodes are visible character notes. Edges are visible relationships
//! between two of them. Organizations with at least two visible
//! `member_of` characters form groups, and visible ally or enemy
//! relationships between two such organizations link the groups.

use std::collections::HashSet;

use common::{BookId, NoteId};
use domain::{Note, NoteRelationship, NoteType, RelationshipType};
use projections::Query;
use serde::Serialize;

use crate::error::Result;
use crate::service::live_book;
use crate::store::Store;
use crate::visibility::{self, VisibleSet};

/// An organization and the characters that belong to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationGroup {
    pub organization: Note,
    pub members: Vec<NoteId>,
}

/// An ally or enemy relationship between two grouped organizations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GroupLink {
    pub relationship: NoteRelationship,
}

impl GroupLink {
    pub fn from_organization(&self) -> NoteId {
        self.relationship.from_note_id
    }

    pub fn to_organization(&self) -> NoteId {
        self.relationship.to_note_id
    }

    pub fn relationship_type(&self) -> RelationshipType {
        self.relationship.relationship_type
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterGraph {
    pub nodes: Vec<Note>,
    pub edges: Vec<NoteRelationship>,
    pub groups: Vec<OrganizationGroup>,
    pub group_links: Vec<GroupLink>,
}

impl CharacterGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builds the character graph from an already filtered set.
pub fn character_graph(visible: &VisibleSet) -> CharacterGraph {
    let nodes: Vec<Note> = visible
        .notes
        .iter()
        .filter(|n| n.note_type == NoteType::Character)
        .cloned()
        .collect();
    let characters: HashSet<NoteId> = nodes.iter().map(|n| n.id).collect();

    let edges = visible
        .relationships
        .iter()
        .filter(|r| characters.contains(&r.from_note_id) && characters.contains(&r.to_note_id))
        .cloned()
        .collect();

    let groups: Vec<OrganizationGroup> = visible
        .notes
        .iter()
        .filter(|n| n.note_type == NoteType::Organization)
        .filter_map(|org| {
            let mut members: Vec<NoteId> = Vec::new();
            for rel in &visible.relationships {
                if rel.relationship_type == RelationshipType::MemberOf
                    && rel.to_note_id == org.id
                    && characters.contains(&rel.from_note_id)
                    && !members.contains(&rel.from_note_id)
                {
                    members.push(rel.from_note_id);
                }
            }
            (members.len() >= 2).then(|| OrganizationGroup {
                organization: org.clone(),
                members,
            })
        })
        .collect();

    let grouped: HashSet<NoteId> = groups.iter().map(|g| g.organization.id).collect();
    let group_links = visible
        .relationships
        .iter()
        .filter(|r| {
            matches!(
                r.relationship_type,
                RelationshipType::Ally | RelationshipType::Enemy
            ) && grouped.contains(&r.from_note_id)
                && grouped.contains(&r.to_note_id)
        })
        .map(|r| GroupLink {
            relationship: r.clone(),
        })
        .collect();

    CharacterGraph {
        nodes,
        edges,
        groups,
        group_links,
    }
}

impl Store {
    /// Returns the character graph of a live book at `current_page`.
    pub async fn graph(&self, book: BookId, current_page: Option<u32>) -> Result<CharacterGraph> {
        self.read(|tables| {
            live_book(tables, book)?;
            let notes = Query::<Note>::new().book(book).run(tables);
            let relationships = Query::<NoteRelationship>::new()
                .touching_any(notes.iter().map(|n| n.id))
                .run(tables);
            let visible = visibility::filter(&notes, &relationships, current_page);
            Ok(character_graph(&visible))
        })
        .await
    }
}
