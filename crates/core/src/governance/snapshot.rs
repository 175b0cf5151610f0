use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::organization::{Organization, OrganizationId};
use crate::domain::relationship::PersonRelationship;
use crate::domain::seat::{BoardSeat, DateWindow, Tenure};
use crate::governance::source::{GovernanceSource, SeatRecord, SourceError};

/// Immutable view of every persisted governance record needed for one analysis run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceSnapshot {
    pub seats: Vec<BoardSeat>,
    pub organizations: Vec<Organization>,
    pub relationships: Vec<PersonRelationship>,
}

impl GovernanceSnapshot {
    pub async fn load<S>(source: &S) -> Result<Self, SourceError>
    where
        S: GovernanceSource + ?Sized,
    {
        let seat_records = source.fetch_all_seats().await?;
        let organizations = source.fetch_all_organizations().await?;
        let relationships = source.fetch_all_relationships().await?;

        Ok(Self::assemble(seat_records, organizations, relationships))
    }

    /// Drops seat rows with dangling references or inverted tenures instead of failing.
    pub fn assemble(
        seat_records: Vec<SeatRecord>,
        organizations: Vec<Organization>,
        relationships: Vec<PersonRelationship>,
    ) -> Self {
        let mut seats = Vec::with_capacity(seat_records.len());
        let mut skipped = 0usize;

        for record in seat_records {
            match seat_from_record(record) {
                Ok(seat) => seats.push(seat),
                Err((seat_id, reason)) => {
                    skipped += 1;
                    warn!(
                        event_name = "governance.snapshot.seat_skipped",
                        seat_id = %seat_id,
                        reason,
                        "skipping seat with unusable references"
                    );
                }
            }
        }

        debug!(
            event_name = "governance.snapshot.assembled",
            seat_count = seats.len(),
            skipped_seat_count = skipped,
            organization_count = organizations.len(),
            relationship_count = relationships.len(),
            "governance snapshot assembled"
        );

        Self { seats, organizations, relationships }
    }

    pub fn organization(&self, id: &OrganizationId) -> Option<&Organization> {
        self.organizations.iter().find(|organization| organization.id == *id)
    }

    pub fn seats_within(&self, window: Option<&DateWindow>) -> Vec<&BoardSeat> {
        match window {
            Some(window) => {
                self.seats.iter().filter(|seat| seat.tenure.intersects_window(window)).collect()
            }
            None => self.seats.iter().collect(),
        }
    }
}

fn seat_from_record(record: SeatRecord) -> Result<BoardSeat, (String, &'static str)> {
    let seat_id = record.id.0.clone();
    let Some(person) = record.person else {
        return Err((seat_id, "missing person"));
    };
    let Some(organization) = record.organization else {
        return Err((seat_id, "missing organization"));
    };
    if person.id != record.person_id || organization.id != record.organization_id {
        return Err((seat_id, "hydrated record does not match seat reference"));
    }
    let tenure = Tenure::new(record.tenure.start, record.tenure.end)
        .map_err(|_| (seat_id.clone(), "end date precedes start date"))?;

    Ok(BoardSeat {
        id: record.id,
        person,
        organization,
        category: record.category,
        title: record.title,
        tenure,
        voting_rights: record.voting_rights,
        compensated: record.compensated,
    })
}
