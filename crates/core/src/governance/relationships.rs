use std::collections::{BTreeMap, BTreeSet};

use crate::domain::person::PersonId;
use crate::domain::relationship::{PersonRelationship, RelationshipCategory};

/// Adjacency view over person-to-person ties, shared by constructive attribution
/// and the board independence rule.
#[derive(Clone, Debug, Default)]
pub struct RelationshipIndex {
    ties: BTreeMap<PersonId, BTreeMap<PersonId, BTreeSet<RelationshipCategory>>>,
}

impl RelationshipIndex {
    pub fn build(relationships: &[PersonRelationship]) -> Self {
        let mut ties: BTreeMap<PersonId, BTreeMap<PersonId, BTreeSet<RelationshipCategory>>> =
            BTreeMap::new();

        for relationship in relationships {
            if relationship.person1_id == relationship.person2_id {
                continue;
            }
            ties.entry(relationship.person1_id.clone())
                .or_default()
                .entry(relationship.person2_id.clone())
                .or_default()
                .insert(relationship.category);
            ties.entry(relationship.person2_id.clone())
                .or_default()
                .entry(relationship.person1_id.clone())
                .or_default()
                .insert(relationship.category);
        }

        Self { ties }
    }

    /// People linked to `person_id` by a direct FAMILY relationship.
    pub fn family_of(&self, person_id: &PersonId) -> BTreeSet<PersonId> {
        self.related_by(person_id, RelationshipCategory::Family)
    }

    pub fn related_by(
        &self,
        person_id: &PersonId,
        category: RelationshipCategory,
    ) -> BTreeSet<PersonId> {
        self.ties
            .get(person_id)
            .into_iter()
            .flatten()
            .filter(|(_, categories)| categories.contains(&category))
            .map(|(other, _)| other.clone())
            .collect()
    }

    pub fn categories_between(
        &self,
        left: &PersonId,
        right: &PersonId,
    ) -> BTreeSet<RelationshipCategory> {
        self.ties.get(left).and_then(|others| others.get(right)).cloned().unwrap_or_default()
    }

    /// The strongest tie that compromises independence between two people, family first.
    pub fn disqualifying_tie(
        &self,
        left: &PersonId,
        right: &PersonId,
    ) -> Option<RelationshipCategory> {
        self.categories_between(left, right)
            .into_iter()
            .find(RelationshipCategory::is_disqualifying)
    }
}

#[cfg(test)]
mod tests {
    use super::RelationshipIndex;
    use crate::domain::person::PersonId;
    use crate::domain::relationship::{PersonRelationship, RelationshipCategory};

    fn tie(left: &str, right: &str, category: RelationshipCategory) -> PersonRelationship {
        PersonRelationship {
            person1_id: PersonId::from(left),
            person2_id: PersonId::from(right),
            category,
            details: String::new(),
        }
    }

    #[test]
    fn family_lookup_is_symmetric_and_category_scoped() {
        let index = RelationshipIndex::build(&[
            tie("P-1", "P-2", RelationshipCategory::Family),
            tie("P-3", "P-1", RelationshipCategory::Business),
            tie("P-4", "P-1", RelationshipCategory::Family),
        ]);

        let family = index.family_of(&PersonId::from("P-1"));
        assert_eq!(family.len(), 2);
        assert!(family.contains(&PersonId::from("P-2")));
        assert!(family.contains(&PersonId::from("P-4")));
        assert!(index.family_of(&PersonId::from("P-2")).contains(&PersonId::from("P-1")));
        assert!(index.family_of(&PersonId::from("P-3")).is_empty());
    }

    #[test]
    fn other_ties_are_not_disqualifying() {
        let index = RelationshipIndex::build(&[
            tie("P-1", "P-2", RelationshipCategory::Other),
            tie("P-1", "P-3", RelationshipCategory::Business),
        ]);

        assert_eq!(index.disqualifying_tie(&PersonId::from("P-1"), &PersonId::from("P-2")), None);
        assert_eq!(
            index.disqualifying_tie(&PersonId::from("P-3"), &PersonId::from("P-1")),
            Some(RelationshipCategory::Business)
        );
    }

    #[test]
    fn family_wins_when_a_pair_has_several_ties() {
        let index = RelationshipIndex::build(&[
            tie("P-1", "P-2", RelationshipCategory::Business),
            tie("P-2", "P-1", RelationshipCategory::Family),
            tie("P-1", "P-2", RelationshipCategory::Other),
        ]);

        assert_eq!(
            index.categories_between(&PersonId::from("P-1"), &PersonId::from("P-2")).len(),
            3
        );
        assert_eq!(
            index.disqualifying_tie(&PersonId::from("P-2"), &PersonId::from("P-1")),
            Some(RelationshipCategory::Family)
        );
    }
}
