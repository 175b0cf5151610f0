use std::collections::BTreeMap;

use tokio::sync::RwLock;

use boardwatch_core::domain::organization::{Organization, OrganizationId, Owner};
use boardwatch_core::domain::person::{Person, PersonId};
use boardwatch_core::domain::relationship::PersonRelationship;
use boardwatch_core::governance::source::{GovernanceSource, SeatRecord, SourceError};

use super::{relationship_key, GovernanceRepository, RepositoryError};

/// Map-backed store with the same read semantics as the SQLite repository.
#[derive(Default)]
pub struct InMemoryGovernanceRepository {
    people: RwLock<BTreeMap<String, Person>>,
    organizations: RwLock<BTreeMap<String, Organization>>,
    seats: RwLock<BTreeMap<String, SeatRecord>>,
    relationships: RwLock<BTreeMap<String, PersonRelationship>>,
}

impl InMemoryGovernanceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl GovernanceSource for InMemoryGovernanceRepository {
    async fn fetch_all_seats(&self) -> Result<Vec<SeatRecord>, SourceError> {
        let people = self.people.read().await;
        let organizations = self.organizations.read().await;
        let seats = self.seats.read().await;

        Ok(seats
            .values()
            .map(|seat| SeatRecord {
                person: people.get(&seat.person_id.0).cloned(),
                organization: organizations.get(&seat.organization_id.0).map(Organization::to_ref),
                ..seat.clone()
            })
            .collect())
    }

    async fn fetch_all_organizations(&self) -> Result<Vec<Organization>, SourceError> {
        let people = self.people.read().await;
        let organizations = self.organizations.read().await;

        Ok(organizations
            .values()
            .map(|organization| resolve_owners(organization, &people, &organizations))
            .collect())
    }

    async fn fetch_all_relationships(&self) -> Result<Vec<PersonRelationship>, SourceError> {
        let relationships = self.relationships.read().await;
        Ok(relationships.values().cloned().collect())
    }

    async fn fetch_person_by_id(&self, id: &PersonId) -> Result<Option<Person>, SourceError> {
        let people = self.people.read().await;
        Ok(people.get(&id.0).cloned())
    }

    async fn fetch_organization_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, SourceError> {
        let people = self.people.read().await;
        let organizations = self.organizations.read().await;
        Ok(organizations
            .get(&id.0)
            .map(|organization| resolve_owners(organization, &people, &organizations)))
    }
}

#[async_trait::async_trait]
impl GovernanceRepository for InMemoryGovernanceRepository {
    async fn save_person(&self, person: Person) -> Result<(), RepositoryError> {
        let mut people = self.people.write().await;
        people.insert(person.id.0.clone(), person);
        Ok(())
    }

    async fn save_organization(&self, organization: Organization) -> Result<(), RepositoryError> {
        let mut organizations = self.organizations.write().await;
        organizations.insert(organization.id.0.clone(), organization);
        Ok(())
    }

    async fn save_seat(&self, seat: SeatRecord) -> Result<(), RepositoryError> {
        let mut seats = self.seats.write().await;
        seats.insert(seat.id.0.clone(), SeatRecord { person: None, organization: None, ..seat });
        Ok(())
    }

    async fn save_relationship(
        &self,
        relationship: PersonRelationship,
    ) -> Result<(), RepositoryError> {
        let mut relationships = self.relationships.write().await;
        let key = relationship_key(&relationship);
        match relationships.get_mut(&key) {
            Some(existing) => existing.details = relationship.details,
            None => {
                relationships.insert(key, relationship);
            }
        }
        Ok(())
    }
}

/// Drops edges whose owner is unknown and fills in the owner's display name.
fn resolve_owners(
    organization: &Organization,
    people: &BTreeMap<String, Person>,
    organizations: &BTreeMap<String, Organization>,
) -> Organization {
    let owners = organization
        .owners
        .iter()
        .filter_map(|edge| {
            let name = match &edge.owner {
                Owner::Organization(id) => {
                    organizations.get(&id.0).map(|owner| owner.legal_name.clone())
                }
                Owner::Person(id) => people.get(&id.0).map(Person::full_name),
            }?;
            let mut edge = edge.clone();
            edge.owner_name = Some(name);
            Some(edge)
        })
        .collect();

    Organization { owners, ..organization.clone() }
}
