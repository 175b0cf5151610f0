use serde::{Deserialize, Serialize};

use crate::domain::organization::{Organization, Owner};
use crate::domain::person::PersonId;
use crate::governance::relationships::RelationshipIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribution {
    Direct,
    ConstructiveFamily,
}

impl Attribution {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Direct => "Direct",
            Self::ConstructiveFamily => "Constructive (Family)",
        }
    }
}

/// Shared majority owner of two organizations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonControl {
    pub attribution: Attribution,
    /// Majority owner on the first organization's side.
    pub owner: Owner,
    pub owner_label: String,
    /// Majority owner on the second organization's side; differs from `owner` only
    /// under constructive attribution.
    pub counterpart: Owner,
    pub counterpart_label: String,
}

/// Finds a majority owner common to both organizations, either the same owner
/// record or two people tied by a FAMILY relationship.
pub fn common_major_owner(
    first: &Organization,
    second: &Organization,
    relationships: &RelationshipIndex,
) -> Option<CommonControl> {
    for left in first.majority_owners() {
        if let Some(right) = second.majority_owners().find(|right| right.owner == left.owner) {
            return Some(CommonControl {
                attribution: Attribution::Direct,
                owner: left.owner.clone(),
                owner_label: left.owner_label(),
                counterpart: right.owner.clone(),
                counterpart_label: right.owner_label(),
            });
        }
    }

    for left in first.majority_owners() {
        let Owner::Person(left_person) = &left.owner else {
            continue;
        };
        let family = relationships.family_of(left_person);
        if family.is_empty() {
            continue;
        }

        let matched = second.majority_owners().find(|right| {
            matches!(&right.owner, Owner::Person(right_person) if family.contains(right_person))
        });
        if let Some(right) = matched {
            return Some(CommonControl {
                attribution: Attribution::ConstructiveFamily,
                owner: left.owner.clone(),
                owner_label: left.owner_label(),
                counterpart: right.owner.clone(),
                counterpart_label: right.owner_label(),
            });
        }
    }

    None
}

impl CommonControl {
    pub fn family_pair(&self) -> Option<(&PersonId, &PersonId)> {
        match (self.attribution, &self.owner, &self.counterpart) {
            (Attribution::ConstructiveFamily, Owner::Person(left), Owner::Person(right)) => {
                Some((left, right))
            }
            _ => None,
        }
    }
}
