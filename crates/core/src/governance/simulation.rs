//! What-if evaluation over cloned snapshot data.
//!
//! Hydration is the only step that touches the source, and it only reads. Applying
//! modifications and re-running the analysis work on clones of the baseline seats and
//! relationships; organizations and ownership edges are never altered.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::organization::{OrganizationId, OrganizationRef};
use crate::domain::person::{Person, PersonId};
use crate::domain::relationship::{PersonRelationship, RelationshipCategory};
use crate::domain::seat::{BoardSeat, RoleCategory, SeatId, Tenure};
use crate::errors::AnalysisError;
use crate::governance::overlap::OverlapResult;
use crate::governance::risk::{RiskFlag, RiskId};
use crate::governance::snapshot::GovernanceSnapshot;
use crate::governance::source::{GovernanceSource, SourceError};
use crate::governance::{AnalysisRequest, GovernanceAnalyzer};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modification {
    AddSeat(SeatAddition),
    RemoveSeat(SeatRemoval),
    AddRelationship(RelationshipAddition),
    RemoveRelationship(RelationshipRemoval),
}

impl Modification {
    pub fn action(&self) -> &'static str {
        match self {
            Self::AddSeat(_) => "ADD_SEAT",
            Self::RemoveSeat(_) => "REMOVE_SEAT",
            Self::AddRelationship(_) => "ADD_RELATIONSHIP",
            Self::RemoveRelationship(_) => "REMOVE_RELATIONSHIP",
        }
    }

    fn is_removal(&self) -> bool {
        matches!(self, Self::RemoveSeat(_) | Self::RemoveRelationship(_))
    }
}

/// Hypothetical seat. Unset fields fall back to a voting, uncompensated Director seat
/// starting on the request date with no end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAddition {
    pub person_id: PersonId,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub category: Option<RoleCategory>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub voting_rights: Option<bool>,
    #[serde(default)]
    pub compensated: Option<bool>,
}

impl SeatAddition {
    pub fn new(person_id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            person_id: PersonId(person_id.into()),
            organization_id: OrganizationId(organization_id.into()),
            category: None,
            title: None,
            start_date: None,
            end_date: None,
            voting_rights: None,
            compensated: None,
        }
    }
}

/// Drops every seat the person holds at the organization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRemoval {
    pub person_id: PersonId,
    pub organization_id: OrganizationId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipAddition {
    pub person1_id: PersonId,
    pub person2_id: PersonId,
    pub category: RelationshipCategory,
    #[serde(default)]
    pub details: Option<String>,
}

/// Drops ties between the two people; limited to one category when given.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRemoval {
    pub person1_id: PersonId,
    pub person2_id: PersonId,
    #[serde(default)]
    pub category: Option<RelationshipCategory>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedModification {
    /// Position of the modification in the submitted list.
    pub index: usize,
    pub action: String,
    pub reason: String,
}

/// Modifications together with every person and organization their additions refer
/// to, resolved up front so the apply step stays free of I/O.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModificationSet {
    modifications: Vec<Modification>,
    people: BTreeMap<PersonId, Person>,
    organizations: BTreeMap<OrganizationId, OrganizationRef>,
}

impl ModificationSet {
    /// Builds a set from records already in memory, without consulting a source.
    pub fn resolved(
        modifications: Vec<Modification>,
        people: impl IntoIterator<Item = Person>,
        organizations: impl IntoIterator<Item = OrganizationRef>,
    ) -> Self {
        Self {
            modifications,
            people: people.into_iter().map(|person| (person.id.clone(), person)).collect(),
            organizations: organizations
                .into_iter()
                .map(|organization| (organization.id.clone(), organization))
                .collect(),
        }
    }

    pub async fn hydrate<S>(
        source: &S,
        modifications: Vec<Modification>,
    ) -> Result<Self, SourceError>
    where
        S: GovernanceSource + ?Sized,
    {
        let mut person_ids = BTreeSet::new();
        let mut organization_ids = BTreeSet::new();
        for modification in &modifications {
            match modification {
                Modification::AddSeat(addition) => {
                    person_ids.insert(addition.person_id.clone());
                    organization_ids.insert(addition.organization_id.clone());
                }
                Modification::AddRelationship(addition) => {
                    person_ids.insert(addition.person1_id.clone());
                    person_ids.insert(addition.person2_id.clone());
                }
                Modification::RemoveSeat(_) | Modification::RemoveRelationship(_) => {}
            }
        }

        let mut people = BTreeMap::new();
        for id in person_ids {
            if let Some(person) = source.fetch_person_by_id(&id).await? {
                people.insert(id, person);
            }
        }

        let mut organizations = BTreeMap::new();
        for id in organization_ids {
            if let Some(organization) = source.fetch_organization_by_id(&id).await? {
                organizations.insert(id, organization.to_ref());
            }
        }

        Ok(Self { modifications, people, organizations })
    }

    /// Applies removals then additions, each group in submission order, to clones of
    /// the baseline seats and relationships.
    pub fn apply(
        &self,
        baseline: &GovernanceSnapshot,
        as_of: NaiveDate,
    ) -> (GovernanceSnapshot, Vec<SkippedModification>) {
        let mut seats = baseline.seats.clone();
        let mut relationships = baseline.relationships.clone();
        let mut skipped = Vec::new();

        let ordered = self
            .modifications
            .iter()
            .enumerate()
            .filter(|(_, modification)| modification.is_removal())
            .chain(
                self.modifications
                    .iter()
                    .enumerate()
                    .filter(|(_, modification)| !modification.is_removal()),
            );

        for (index, modification) in ordered {
            let outcome = match modification {
                Modification::RemoveSeat(removal) => {
                    seats.retain(|seat| {
                        seat.person.id != removal.person_id
                            || seat.organization.id != removal.organization_id
                    });
                    Ok(())
                }
                Modification::RemoveRelationship(removal) => {
                    relationships.retain(|relationship| {
                        !relationship.connects(&removal.person1_id, &removal.person2_id)
                            || removal
                                .category
                                .is_some_and(|category| relationship.category != category)
                    });
                    Ok(())
                }
                Modification::AddSeat(addition) => {
                    self.add_seat(index, addition, as_of, &mut seats)
                }
                Modification::AddRelationship(addition) => {
                    self.add_relationship(addition, &mut relationships)
                }
            };

            if let Err(reason) = outcome {
                warn!(
                    event_name = "governance.simulation.modification_skipped",
                    index,
                    action = modification.action(),
                    reason = %reason,
                    "simulated modification skipped"
                );
                skipped.push(SkippedModification {
                    index,
                    action: modification.action().to_string(),
                    reason,
                });
            }
        }

        let snapshot = GovernanceSnapshot {
            seats,
            organizations: baseline.organizations.clone(),
            relationships,
        };
        (snapshot, skipped)
    }

    fn add_seat(
        &self,
        index: usize,
        addition: &SeatAddition,
        as_of: NaiveDate,
        seats: &mut Vec<BoardSeat>,
    ) -> Result<(), String> {
        let person = self
            .people
            .get(&addition.person_id)
            .ok_or_else(|| format!("person {} not found", addition.person_id))?;
        let organization = self
            .organizations
            .get(&addition.organization_id)
            .ok_or_else(|| format!("organization {} not found", addition.organization_id))?;

        let exists = seats.iter().any(|seat| {
            seat.person.id == addition.person_id && seat.organization.id == addition.organization_id
        });
        if exists {
            return Ok(());
        }

        let category = addition.category.unwrap_or_default();
        let tenure = Tenure::new(Some(addition.start_date.unwrap_or(as_of)), addition.end_date)
            .map_err(|error| error.to_string())?;
        seats.push(BoardSeat {
            id: SeatId(format!("simulated-{index}")),
            person: person.clone(),
            organization: organization.clone(),
            category,
            title: addition.title.clone().unwrap_or_else(|| category.label().to_string()),
            tenure,
            voting_rights: addition.voting_rights.unwrap_or(true),
            compensated: addition.compensated.unwrap_or(false),
        });
        Ok(())
    }

    fn add_relationship(
        &self,
        addition: &RelationshipAddition,
        relationships: &mut Vec<PersonRelationship>,
    ) -> Result<(), String> {
        for id in [&addition.person1_id, &addition.person2_id] {
            if !self.people.contains_key(id) {
                return Err(format!("person {id} not found"));
            }
        }

        // Any existing tie between the pair, whatever its category, makes this a no-op.
        let exists = relationships
            .iter()
            .any(|relationship| relationship.connects(&addition.person1_id, &addition.person2_id));
        if !exists {
            relationships.push(PersonRelationship {
                person1_id: addition.person1_id.clone(),
                person2_id: addition.person2_id.clone(),
                category: addition.category,
                details: addition.details.clone().unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedRisk {
    #[serde(flatten)]
    pub risk: RiskFlag,
    pub is_new: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub risks: Vec<SimulatedRisk>,
    pub overlaps: Vec<OverlapResult>,
    pub baseline_risk_count: usize,
    pub new_risk_count: usize,
    /// Baseline risks absent from the hypothetical result.
    pub resolved_risk_ids: Vec<RiskId>,
    pub skipped_modifications: Vec<SkippedModification>,
}

impl SimulationOutcome {
    pub fn new_risks(&self) -> impl Iterator<Item = &SimulatedRisk> {
        self.risks.iter().filter(|risk| risk.is_new)
    }
}

impl GovernanceAnalyzer {
    /// Diffs the hypothetical analysis against the baseline by risk identifier.
    pub fn simulate(
        &self,
        baseline: &GovernanceSnapshot,
        modifications: &ModificationSet,
        request: &AnalysisRequest,
    ) -> Result<SimulationOutcome, AnalysisError> {
        let before = self.analyze(baseline, request)?;
        let baseline_ids = before.risks.iter().map(|risk| risk.id.clone()).collect::<BTreeSet<_>>();

        let (hypothetical, skipped_modifications) = modifications.apply(baseline, request.as_of);
        let after = self.analyze(&hypothetical, request)?;

        let after_ids = after.risks.iter().map(|risk| &risk.id).collect::<BTreeSet<_>>();
        let resolved_risk_ids =
            baseline_ids.iter().filter(|id| !after_ids.contains(id)).cloned().collect::<Vec<_>>();

        let risks = after
            .risks
            .into_iter()
            .map(|risk| SimulatedRisk { is_new: !baseline_ids.contains(&risk.id), risk })
            .collect::<Vec<_>>();

        Ok(SimulationOutcome {
            new_risk_count: risks.iter().filter(|risk| risk.is_new).count(),
            baseline_risk_count: before.risks.len(),
            overlaps: after.overlaps,
            risks,
            resolved_risk_ids,
            skipped_modifications,
        })
    }
}
