//! FLARE Core - Entity Schemas and the Where/Query Model
//!
//! Pure data structures and evaluation rules with no I/O. All other crates
//! depend on this.

use chrono::{DateTime, Utc};
use uuid::Uuid;

mod entities;
mod error;
mod filter;
mod query;
mod record;
mod schema;
mod value;

pub use entities::*;
pub use error::*;
pub use filter::*;
pub use query::*;
pub use record::*;
pub use schema::*;
pub use value::*;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Entity identifier. Stored as text so callers may supply their own.
pub type EntityId = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a fresh random identifier (UUIDv4, hyphenated).
pub fn new_entity_id() -> EntityId {
    Uuid::new_v4().to_string()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entity_id_is_v4() {
        let id = new_entity_id();
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_entity_ids_are_unique() {
        let ids: std::collections::HashSet<_> = (0..1000).map(|_| new_entity_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
