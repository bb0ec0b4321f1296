//! Closed enum domains and field limits.
//!
//! The string forms below are part of the persisted event contract. Adding,
//! removing or renaming a member requires a new versioned event schema.

use serde::{Deserialize, Serialize};

/// Maximum length of book and note titles, in characters.
pub const TITLE_MAX_LEN: usize = 255;

/// Maximum length of a book's author, in characters.
pub const AUTHOR_MAX_LEN: usize = 255;

/// Maximum length of a note's content, in characters.
pub const CONTENT_MAX_LEN: usize = 10_000;

/// Maximum length of a relationship description, in characters.
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// The kind of subject a note describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Character,
    Organization,
    Event,
    Location,
    Item,
    Concept,
}

impl NoteType {
    /// Every note type, in declaration order.
    pub const ALL: [NoteType; 6] = [
        NoteType::Character,
        NoteType::Organization,
        NoteType::Event,
        NoteType::Location,
        NoteType::Item,
        NoteType::Concept,
    ];

    /// Wire names of every note type.
    pub const NAMES: &'static [&'static str] = &[
        "character",
        "organization",
        "event",
        "location",
        "item",
        "concept",
    ];

    /// Returns the wire name of this note type.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteType::Character => "character",
            NoteType::Organization => "organization",
            NoteType::Event => "event",
            NoteType::Location => "location",
            NoteType::Item => "item",
            NoteType::Concept => "concept",
        }
    }
}

impl std::fmt::Display for NoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of a directed relationship between two notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Impacts,
    MemberOf,
    Ally,
    Enemy,
    Family,
    Friend,
    Owns,
    LocatedIn,
    Causes,
}

impl RelationshipType {
    /// Every relationship type, in declaration order.
    pub const ALL: [RelationshipType; 9] = [
        RelationshipType::Impacts,
        RelationshipType::MemberOf,
        RelationshipType::Ally,
        RelationshipType::Enemy,
        RelationshipType::Family,
        RelationshipType::Friend,
        RelationshipType::Owns,
        RelationshipType::LocatedIn,
        RelationshipType::Causes,
    ];

    /// Wire names of every relationship type.
    pub const NAMES: &'static [&'static str] = &[
        "impacts",
        "member_of",
        "ally",
        "enemy",
        "family",
        "friend",
        "owns",
        "located_in",
        "causes",
    ];

    /// Returns the wire name of this relationship type.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Impacts => "impacts",
            RelationshipType::MemberOf => "member_of",
            RelationshipType::Ally => "ally",
            RelationshipType::Enemy => "enemy",
            RelationshipType::Family => "family",
            RelationshipType::Friend => "friend",
            RelationshipType::Owns => "owns",
            RelationshipType::LocatedIn => "located_in",
            RelationshipType::Causes => "causes",
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_type_names_match_serde() {
        for (ty, name) in NoteType::ALL.iter().zip(NoteType::NAMES) {
            assert_eq!(ty.as_str(), *name);
            assert_eq!(serde_json::to_value(ty).unwrap(), *name);
        }
    }

    #[test]
    fn relationship_type_names_match_serde() {
        for (ty, name) in RelationshipType::ALL.iter().zip(RelationshipType::NAMES) {
            assert_eq!(ty.as_str(), *name);
            assert_eq!(serde_json::to_value(ty).unwrap(), *name);
        }
    }

    #[test]
    fn unknown_relationship_type_does_not_parse() {
        let result: Result<RelationshipType, _> = serde_json::from_str("\"rival\"");
        assert!(result.is_err());
    }
}
