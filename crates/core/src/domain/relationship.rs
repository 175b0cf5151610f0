use serde::{Deserialize, Serialize};

use crate::domain::person::PersonId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipCategory {
    Family,
    Business,
    Other,
}

impl RelationshipCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Family => "FAMILY",
            Self::Business => "BUSINESS",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "FAMILY" => Some(Self::Family),
            "BUSINESS" => Some(Self::Business),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }

    /// Family and business ties compromise board independence.
    pub fn is_disqualifying(&self) -> bool {
        matches!(self, Self::Family | Self::Business)
    }
}

/// Undirected tie between two people.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRelationship {
    pub person1_id: PersonId,
    pub person2_id: PersonId,
    pub category: RelationshipCategory,
    pub details: String,
}

impl PersonRelationship {
    pub fn connects(&self, left: &PersonId, right: &PersonId) -> bool {
        (self.person1_id == *left && self.person2_id == *right)
            || (self.person1_id == *right && self.person2_id == *left)
    }

    pub fn counterpart(&self, person_id: &PersonId) -> Option<&PersonId> {
        if self.person1_id == *person_id {
            Some(&self.person2_id)
        } else if self.person2_id == *person_id {
            Some(&self.person1_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PersonRelationship, RelationshipCategory};
    use crate::domain::person::PersonId;

    #[test]
    fn relationship_is_undirected() {
        let relationship = PersonRelationship {
            person1_id: PersonId::from("P-1"),
            person2_id: PersonId::from("P-2"),
            category: RelationshipCategory::Family,
            details: "siblings".to_string(),
        };

        assert!(relationship.connects(&PersonId::from("P-2"), &PersonId::from("P-1")));
        assert_eq!(relationship.counterpart(&PersonId::from("P-2")), Some(&PersonId::from("P-1")));
        assert_eq!(relationship.counterpart(&PersonId::from("P-3")), None);
    }

    #[test]
    fn only_family_and_business_ties_disqualify() {
        assert!(RelationshipCategory::Family.is_disqualifying());
        assert!(RelationshipCategory::Business.is_disqualifying());
        assert!(!RelationshipCategory::Other.is_disqualifying());
        assert_eq!(RelationshipCategory::parse("business"), Some(RelationshipCategory::Business));
    }
}
