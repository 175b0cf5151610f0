use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::domain::organization::{Organization, OrganizationId, Owner};

/// Majority-control chain from `parent` down to `child`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlChain {
    pub parent: OrganizationId,
    pub child: OrganizationId,
    /// Organizations between child and parent, nearest to the child first.
    pub intermediaries: Vec<OrganizationId>,
    pub path: Vec<String>,
}

impl ControlChain {
    pub fn is_direct(&self) -> bool {
        self.intermediaries.is_empty()
    }
}

/// Ownership edges indexed by child organization for repeated control queries.
#[derive(Clone, Debug, Default)]
pub struct OwnershipGraph {
    majority_parents: BTreeMap<OrganizationId, Vec<OrganizationId>>,
    names: BTreeMap<OrganizationId, String>,
}

impl OwnershipGraph {
    pub fn build(organizations: &[Organization]) -> Self {
        let mut majority_parents: BTreeMap<OrganizationId, Vec<OrganizationId>> = BTreeMap::new();
        let mut names = BTreeMap::new();

        for organization in organizations {
            names.insert(organization.id.clone(), organization.legal_name.clone());
            for edge in organization.majority_owners() {
                if let Owner::Organization(owner_id) = &edge.owner {
                    majority_parents
                        .entry(organization.id.clone())
                        .or_default()
                        .push(owner_id.clone());
                }
            }
        }

        Self { majority_parents, names }
    }

    /// Breadth-first walk upstream from `child` along majority organization owners.
    /// Edges at or below 50% never carry control. The visited set keeps cyclic
    /// ownership data from looping.
    pub fn resolve_control(
        &self,
        child: &OrganizationId,
        candidate_parent: &OrganizationId,
    ) -> Option<ControlChain> {
        if child == candidate_parent {
            return None;
        }

        let mut visited = BTreeSet::from([child.clone()]);
        let mut queue = VecDeque::from([(child.clone(), Vec::<OrganizationId>::new())]);

        while let Some((current, intermediaries)) = queue.pop_front() {
            for owner in self.majority_parents.get(&current).into_iter().flatten() {
                if owner == candidate_parent {
                    return Some(ControlChain {
                        parent: candidate_parent.clone(),
                        child: child.clone(),
                        path: intermediaries.iter().map(|id| self.name_of(id)).collect(),
                        intermediaries,
                    });
                }

                if visited.insert(owner.clone()) {
                    let mut next = intermediaries.clone();
                    next.push(owner.clone());
                    queue.push_back((owner.clone(), next));
                }
            }
        }

        None
    }

    pub fn name_of(&self, id: &OrganizationId) -> String {
        self.names.get(id).cloned().unwrap_or_else(|| id.0.clone())
    }
}
