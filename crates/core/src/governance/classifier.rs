use std::collections::{BTreeMap, BTreeSet};

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::organization::{Organization, OrganizationId, OrganizationRef};
use crate::domain::person::{Person, PersonId};
use crate::domain::relationship::RelationshipCategory;
use crate::domain::seat::{BoardSeat, DateWindow, RoleCategory};
use crate::governance::common_control::{common_major_owner, Attribution, CommonControl};
use crate::governance::control::{ControlChain, OwnershipGraph};
use crate::governance::overlap::OverlapResult;
use crate::governance::relationships::RelationshipIndex;
use crate::governance::risk::{RiskFlag, RiskId, RiskLedger, RiskSeverity, RiskType};
use crate::governance::snapshot::GovernanceSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSettings {
    pub lookback_years: u32,
    /// Shared-seat share of a board above which the overlap reads as control.
    pub board_majority_threshold: f64,
    /// Non-independent share of the current voting roster above which a charity is flagged.
    pub independence_threshold: f64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self { lookback_years: 5, board_majority_threshold: 0.5, independence_threshold: 0.49 }
    }
}

/// Stateless rule set turning a snapshot plus detected overlaps into ranked risk flags.
#[derive(Clone, Debug, Default)]
pub struct RiskClassifier {
    settings: ClassifierSettings,
}

impl RiskClassifier {
    pub fn new(settings: ClassifierSettings) -> Self {
        Self { settings }
    }

    pub fn classify(
        &self,
        snapshot: &GovernanceSnapshot,
        overlaps: &[OverlapResult],
        as_of: NaiveDate,
    ) -> Vec<RiskFlag> {
        let graph = OwnershipGraph::build(&snapshot.organizations);
        let relationships = RelationshipIndex::build(&snapshot.relationships);
        let mut ledger = RiskLedger::default();

        let verified = self.ownership_rules(snapshot, &graph, &relationships, &mut ledger);

        let board_sizes = current_board_sizes(&snapshot.seats, as_of);
        let compensated = compensated_organizations(&snapshot.seats);
        for overlap in overlaps {
            let expected =
                verified.contains(&canonical_pair(&overlap.first.id, &overlap.second.id));
            self.board_overlap_rules(overlap, &board_sizes, expected, &mut ledger);
            disclosure_rule(overlap, &mut ledger);
            political_rule(overlap, &mut ledger);
            interlock_rule(overlap, &compensated, &mut ledger);
        }

        for organization in &snapshot.organizations {
            if organization.entity_type.is_public_charity() {
                self.independence_rules(
                    organization,
                    &snapshot.seats,
                    &relationships,
                    as_of,
                    &mut ledger,
                );
            }
            if organization.parent_appoints_board {
                ledger.push(parent_appointment_flag(organization));
            }
        }

        ledger.into_ranked()
    }

    /// Ownership control and common control over every organization pair. Returns the
    /// pairs whose structural relationship was verified, keyed canonically.
    fn ownership_rules(
        &self,
        snapshot: &GovernanceSnapshot,
        graph: &OwnershipGraph,
        relationships: &RelationshipIndex,
        ledger: &mut RiskLedger,
    ) -> BTreeSet<(OrganizationId, OrganizationId)> {
        let mut organizations = snapshot.organizations.iter().collect::<Vec<_>>();
        organizations.sort_by(|left, right| left.id.cmp(&right.id));
        organizations.dedup_by(|left, right| left.id == right.id);

        let mut verified = BTreeSet::new();
        for (index, &first) in organizations.iter().enumerate() {
            for &second in &organizations[index + 1..] {
                let mut controlled = false;
                for (parent, child) in [(first, second), (second, first)] {
                    if let Some(chain) = graph.resolve_control(&child.id, &parent.id) {
                        controlled = true;
                        ledger.push(control_flag(parent, child, &chain));
                    }
                }

                if controlled {
                    verified.insert(canonical_pair(&first.id, &second.id));
                    continue;
                }

                if let Some(common) = common_major_owner(first, second, relationships) {
                    verified.insert(canonical_pair(&first.id, &second.id));
                    ledger.push(common_control_flag(first, second, &common));
                }
            }
        }
        verified
    }

    /// Board-majority control, evaluated separately for each side of the pair.
    fn board_overlap_rules(
        &self,
        overlap: &OverlapResult,
        board_sizes: &BTreeMap<&OrganizationId, BTreeSet<&PersonId>>,
        expected: bool,
        ledger: &mut RiskLedger,
    ) {
        let sides = [(&overlap.first, &overlap.second), (&overlap.second, &overlap.first)];
        for (side, other) in sides {
            let board_size = board_sizes.get(&side.id).map_or(0, BTreeSet::len);
            if board_size == 0 {
                continue;
            }

            let ratio = overlap.shared_count as f64 / board_size as f64;
            if ratio <= self.settings.board_majority_threshold {
                continue;
            }

            let (severity, note) = if expected {
                (RiskSeverity::Info, "; expected given verified ownership or common control")
            } else {
                (RiskSeverity::High, "")
            };
            ledger.push(RiskFlag {
                id: RiskId::for_rule("board-control", &[&side.id.0, &other.id.0]),
                risk_type: RiskType::Control,
                severity,
                message: format!(
                    "A majority of {}'s board also serves on {}",
                    side.legal_name, other.legal_name
                ),
                details: format!(
                    "{} of {} current voting board members shared{}",
                    overlap.shared_count, board_size, note
                ),
                organization_ids: vec![side.id.clone(), other.id.clone()],
                person_id: None,
            });
        }
    }

    /// Roster independence and business ties for one public charity.
    fn independence_rules(
        &self,
        organization: &Organization,
        seats: &[BoardSeat],
        relationships: &RelationshipIndex,
        as_of: NaiveDate,
        ledger: &mut RiskLedger,
    ) {
        let lookback = self.lookback_window(as_of);
        let at_organization =
            seats.iter().filter(|seat| seat.organization.id == organization.id).collect::<Vec<_>>();

        let key_persons = at_organization
            .iter()
            .filter(|seat| seat.is_current(as_of))
            .map(|seat| &seat.person.id)
            .collect::<BTreeSet<_>>();
        let names = at_organization
            .iter()
            .map(|seat| (&seat.person.id, seat.person.full_name()))
            .collect::<BTreeMap<_, _>>();
        let roster = at_organization
            .iter()
            .copied()
            .filter(|seat| seat.category != RoleCategory::KeyEmployee)
            .filter(|seat| seat.tenure.intersects_window(&lookback))
            .collect::<Vec<_>>();
        let current_voting = roster
            .iter()
            .filter(|seat| seat.is_current(as_of) && seat.voting_rights)
            .map(|seat| &seat.person.id)
            .collect::<BTreeSet<_>>();

        let name_of = |id: &PersonId| names.get(id).cloned().unwrap_or_else(|| id.0.clone());

        let mut non_independent = Vec::new();
        for &person_id in &current_voting {
            let mut reasons = Vec::new();
            let compensated = at_organization.iter().any(|seat| {
                &seat.person.id == person_id && seat.is_current(as_of) && seat.compensated
            });
            if compensated {
                reasons.push("compensated".to_string());
            }

            for &other in key_persons.iter().filter(|other| **other != person_id) {
                if let Some(category) = relationships.disqualifying_tie(person_id, other) {
                    reasons.push(format!(
                        "{} tie to {}",
                        category.as_str().to_ascii_lowercase(),
                        name_of(other)
                    ));
                }
            }

            if !reasons.is_empty() {
                non_independent.push(format!("{} ({})", name_of(person_id), reasons.join(", ")));
            }
        }

        if !current_voting.is_empty() {
            let ratio = non_independent.len() as f64 / current_voting.len() as f64;
            if ratio > self.settings.independence_threshold {
                ledger.push(RiskFlag {
                    id: RiskId::for_rule("independence", &[&organization.id.0]),
                    risk_type: RiskType::Independence,
                    severity: RiskSeverity::High,
                    message: format!(
                        "{} lacks a majority of independent voting members",
                        organization.legal_name
                    ),
                    details: format!(
                        "{} of {} current voting members are not independent: {}",
                        non_independent.len(),
                        current_voting.len(),
                        non_independent.join("; ")
                    ),
                    organization_ids: vec![organization.id.clone()],
                    person_id: None,
                });
            }
        }

        let members = roster
            .iter()
            .map(|seat| (&seat.person.id, &seat.person))
            .collect::<BTreeMap<&PersonId, &Person>>();
        for (&person_id, person) in &members {
            let business = relationships.related_by(person_id, RelationshipCategory::Business);
            let tied = key_persons
                .iter()
                .filter(|other| **other != person_id && business.contains(**other))
                .map(|other| name_of(*other))
                .collect::<Vec<_>>();
            if tied.is_empty() {
                continue;
            }

            let standing = if key_persons.contains(person_id) { "current" } else { "former" };
            ledger.push(RiskFlag {
                id: RiskId::for_rule("business-conflict", &[&organization.id.0, &person_id.0]),
                risk_type: RiskType::Conflict,
                severity: RiskSeverity::Medium,
                message: format!(
                    "{} has a business relationship with key persons at {}",
                    person.full_name(),
                    organization.legal_name
                ),
                details: format!("{standing} roster member tied to {}", tied.join(", ")),
                organization_ids: vec![organization.id.clone()],
                person_id: Some(person_id.clone()),
            });
        }
    }

    fn lookback_window(&self, as_of: NaiveDate) -> DateWindow {
        DateWindow {
            from: as_of
                .checked_sub_months(Months::new(self.settings.lookback_years.saturating_mul(12))),
            to: Some(as_of),
        }
    }
}

fn canonical_pair(
    left: &OrganizationId,
    right: &OrganizationId,
) -> (OrganizationId, OrganizationId) {
    if left <= right {
        (left.clone(), right.clone())
    } else {
        (right.clone(), left.clone())
    }
}

/// Distinct people holding a current voting Director/Trustee seat, per organization.
fn current_board_sizes(
    seats: &[BoardSeat],
    as_of: NaiveDate,
) -> BTreeMap<&OrganizationId, BTreeSet<&PersonId>> {
    let mut boards: BTreeMap<&OrganizationId, BTreeSet<&PersonId>> = BTreeMap::new();
    let sitting =
        seats.iter().filter(|seat| seat.is_current(as_of) && seat.is_voting_board_member());
    for seat in sitting {
        boards.entry(&seat.organization.id).or_default().insert(&seat.person.id);
    }
    boards
}

fn compensated_organizations(
    seats: &[BoardSeat],
) -> BTreeMap<&PersonId, BTreeSet<&OrganizationId>> {
    let mut compensated: BTreeMap<&PersonId, BTreeSet<&OrganizationId>> = BTreeMap::new();
    for seat in seats.iter().filter(|seat| seat.compensated) {
        compensated.entry(&seat.person.id).or_default().insert(&seat.organization.id);
    }
    compensated
}

fn control_flag(parent: &Organization, child: &Organization, chain: &ControlChain) -> RiskFlag {
    let details = if chain.is_direct() {
        format!("Direct majority ownership by {}", parent.legal_name)
    } else {
        format!("Indirect control via {}", chain.path.join(" -> "))
    };

    RiskFlag {
        id: RiskId::for_rule("control", &[&parent.id.0, &child.id.0]),
        risk_type: RiskType::Control,
        severity: RiskSeverity::Info,
        message: format!(
            "{} is a controlled subsidiary of {}",
            child.legal_name, parent.legal_name
        ),
        details,
        organization_ids: vec![parent.id.clone(), child.id.clone()],
        person_id: None,
    }
}

fn common_control_flag(
    first: &Organization,
    second: &Organization,
    common: &CommonControl,
) -> RiskFlag {
    let details = match common.attribution {
        Attribution::Direct => format!("Common majority owner: {}", common.owner_label),
        Attribution::ConstructiveFamily => format!(
            "Majority owners {} and {} are family members",
            common.owner_label, common.counterpart_label
        ),
    };

    RiskFlag {
        id: RiskId::for_rule("common-control", &[&first.id.0, &second.id.0]),
        risk_type: RiskType::ScheduleR,
        severity: RiskSeverity::Info,
        message: format!(
            "{} and {} are under common control ({})",
            first.legal_name,
            second.legal_name,
            common.attribution.label()
        ),
        details,
        organization_ids: vec![first.id.clone(), second.id.clone()],
        person_id: None,
    }
}

fn disclosure_rule(overlap: &OverlapResult, ledger: &mut RiskLedger) {
    let names = overlap.shared_people.iter().map(|person| person.name.as_str()).collect::<Vec<_>>();
    ledger.push(RiskFlag {
        id: RiskId::for_rule("disclosure", &[&overlap.first.id.0, &overlap.second.id.0]),
        risk_type: RiskType::ScheduleR,
        severity: RiskSeverity::Info,
        message: format!(
            "Board overlap between {} and {} is disclosure-relevant",
            overlap.first.legal_name, overlap.second.legal_name
        ),
        details: format!("{} shared: {}", overlap.shared_count, names.join(", ")),
        organization_ids: vec![overlap.first.id.clone(), overlap.second.id.clone()],
        person_id: None,
    });
}

fn political_rule(overlap: &OverlapResult, ledger: &mut RiskLedger) {
    let crosses = |charity: &OrganizationRef, other: &OrganizationRef| {
        charity.entity_type.is_public_charity()
            && other.entity_type.is_political_or_social_welfare()
    };
    if !crosses(&overlap.first, &overlap.second) && !crosses(&overlap.second, &overlap.first) {
        return;
    }

    ledger.push(RiskFlag {
        id: RiskId::for_rule("political-overlap", &[&overlap.first.id.0, &overlap.second.id.0]),
        risk_type: RiskType::ScheduleR,
        severity: RiskSeverity::High,
        message: format!(
            "Shared leadership between {} ({}) and {} ({})",
            overlap.first.legal_name,
            overlap.first.entity_type.as_str(),
            overlap.second.legal_name,
            overlap.second.entity_type.as_str()
        ),
        details: "Public charity shares leadership with a social welfare or political organization"
            .to_string(),
        organization_ids: vec![overlap.first.id.clone(), overlap.second.id.clone()],
        person_id: None,
    });
}

fn interlock_rule(
    overlap: &OverlapResult,
    compensated: &BTreeMap<&PersonId, BTreeSet<&OrganizationId>>,
    ledger: &mut RiskLedger,
) {
    for shared in &overlap.shared_people {
        let Some(paid_at) = compensated.get(&shared.person_id) else {
            continue;
        };
        let paying = [&overlap.first, &overlap.second]
            .into_iter()
            .filter(|organization| paid_at.contains(&organization.id))
            .map(|organization| organization.legal_name.as_str())
            .collect::<Vec<_>>();
        if paying.is_empty() {
            continue;
        }

        ledger.push(RiskFlag {
            id: RiskId::for_rule(
                "interlock",
                &[&shared.person_id.0, &overlap.first.id.0, &overlap.second.id.0],
            ),
            risk_type: RiskType::Conflict,
            severity: RiskSeverity::Medium,
            message: format!(
                "{} is compensated while serving both {} and {}",
                shared.name, overlap.first.legal_name, overlap.second.legal_name
            ),
            details: format!("Compensated at {}", paying.join(" and ")),
            organization_ids: vec![overlap.first.id.clone(), overlap.second.id.clone()],
            person_id: Some(shared.person_id.clone()),
        });
    }
}

fn parent_appointment_flag(organization: &Organization) -> RiskFlag {
    RiskFlag {
        id: RiskId::for_rule("parent-appointment", &[&organization.id.0]),
        risk_type: RiskType::Control,
        severity: RiskSeverity::High,
        message: format!(
            "{}'s board is appointed by a parent organization",
            organization.legal_name
        ),
        details: "Appointment power establishes control regardless of ownership percentage"
            .to_string(),
        organization_ids: vec![organization.id.clone()],
        person_id: None,
    }
}
