//! Identity types for Tempo entities

use chrono::NaiveDateTime;
use std::fmt;
use std::hash::Hash;

/// Timestamp type. The backend emits ISO-8601 without an offset, always UTC.
pub type Timestamp = NaiveDateTime;

/// Common behaviour of the typed entity identifiers.
///
/// Backend ids are auto-increment integers, so any id `<= 0` can never name a
/// real row. Stores use [`EntityIdType::is_valid`] to reject such ids before
/// issuing a request.
pub trait EntityIdType:
    Copy + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Wrap a raw backend id.
    fn new(raw: i64) -> Self;

    /// The raw backend id.
    fn as_i64(&self) -> i64;

    /// Whether this id can refer to a persisted entity.
    fn is_valid(&self) -> bool {
        self.as_i64() > 0
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl EntityIdType for $name {
            fn new(raw: i64) -> Self {
                Self(raw)
            }

            fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a project.
    ProjectId
);
define_entity_id!(
    /// Identifier of a task.
    TaskId
);
define_entity_id!(
    /// Identifier of a sprint.
    SprintId
);
define_entity_id!(
    /// Identifier of a cost record.
    CostId
);
define_entity_id!(
    /// Identifier of a team member.
    TeamMemberId
);
define_entity_id!(
    /// Identifier of a project membership (member allocated to a project).
    ProjectMemberId
);
define_entity_id!(
    /// Identifier of a user account.
    UserId
);
define_entity_id!(
    /// Identifier of an activity feed entry.
    ActivityId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_ids_are_valid() {
        assert!(ProjectId::new(1).is_valid());
        assert!(TaskId::new(i64::MAX).is_valid());
    }

    #[test]
    fn test_zero_and_negative_ids_are_invalid() {
        assert!(!ProjectId::new(0).is_valid());
        assert!(!SprintId::new(-3).is_valid());
    }

    #[test]
    fn test_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&CostId::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: CostId = serde_json::from_str("42").unwrap();
        assert_eq!(back, CostId::new(42));
    }

    #[test]
    fn test_id_display_is_raw_value() {
        assert_eq!(TeamMemberId::from(7).to_string(), "7");
    }
}
