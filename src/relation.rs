//! User relation descriptors used by relation predicates.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Direction of a relation edge relative to the queried record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outward,
    Inward,
    Mutual,
}

impl Direction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "outward" => Some(Self::Outward),
            "inward" => Some(Self::Inward),
            "mutual" => Some(Self::Mutual),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outward => write!(f, "outward"),
            Direction::Inward => write!(f, "inward"),
            Direction::Mutual => write!(f, "mutual"),
        }
    }
}

fn name_format() -> &'static Regex {
    static NAME_FORMAT: OnceLock<Regex> = OnceLock::new();
    NAME_FORMAT.get_or_init(|| Regex::new("^[a-zA-Z]*$").expect("relation name pattern"))
}

/// A named, directed relation between user records.
///
/// The built-in `friend` and `follow` relations map onto reserved server-side
/// names when they appear in a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    identifier: String,
    direction: Direction,
}

impl Relation {
    pub fn new(identifier: impl Into<String>, direction: Direction) -> Result<Self> {
        let identifier = identifier.into();
        if !name_format().is_match(&identifier) {
            return Err(Error::InvalidArgumentType(
                "relation identifier can only be [a-zA-Z]".to_string(),
            ));
        }
        Ok(Self {
            identifier,
            direction,
        })
    }

    pub fn friend() -> Self {
        Self {
            identifier: "friend".to_string(),
            direction: Direction::Mutual,
        }
    }

    pub fn follower() -> Self {
        Self {
            identifier: "follow".to_string(),
            direction: Direction::Inward,
        }
    }

    pub fn following() -> Self {
        Self {
            identifier: "follow".to_string(),
            direction: Direction::Outward,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Identifier as it appears on the wire. Built-in relations live under
    /// reserved names; the mapping is fixed, not user-configurable.
    pub fn wire_name(&self) -> String {
        match self.identifier.as_str() {
            "friend" => "_friend".to_string(),
            "follow" => "_follow".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_relations() {
        assert_eq!(Relation::friend().direction(), Direction::Mutual);
        assert_eq!(Relation::follower().direction(), Direction::Inward);
        assert_eq!(Relation::following().direction(), Direction::Outward);
    }

    #[test]
    fn test_wire_name_remap() {
        assert_eq!(Relation::friend().wire_name(), "_friend");
        assert_eq!(Relation::follower().wire_name(), "_follow");
        let custom = Relation::new("colleague", Direction::Mutual).unwrap();
        assert_eq!(custom.wire_name(), "colleague");
    }

    #[test]
    fn test_identifier_validation() {
        assert!(Relation::new("has space", Direction::Mutual).is_err());
        assert!(Relation::new("_friend", Direction::Mutual).is_err());
        assert!(Relation::new("colleague", Direction::Mutual).is_ok());
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("outward"), Some(Direction::Outward));
        assert_eq!(Direction::parse("sideways"), None);
        assert_eq!(Direction::Mutual.to_string(), "mutual");
    }
}
