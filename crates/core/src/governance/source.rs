use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::organization::{Organization, OrganizationId, OrganizationRef};
use crate::domain::person::{Person, PersonId};
use crate::domain::relationship::PersonRelationship;
use crate::domain::seat::{RoleCategory, SeatId, Tenure};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("governance store unavailable: {0}")]
    Unavailable(String),
    #[error("governance record could not be decoded: {0}")]
    Decode(String),
}

/// Seat row as delivered by the store; the nested records are absent when the
/// referenced person or organization no longer exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRecord {
    pub id: SeatId,
    pub person_id: PersonId,
    pub organization_id: OrganizationId,
    pub category: RoleCategory,
    pub title: String,
    pub tenure: Tenure,
    pub voting_rights: bool,
    pub compensated: bool,
    pub person: Option<Person>,
    pub organization: Option<OrganizationRef>,
}

/// Read-only access to the persisted governance records.
#[async_trait]
pub trait GovernanceSource: Send + Sync {
    async fn fetch_all_seats(&self) -> Result<Vec<SeatRecord>, SourceError>;

    async fn fetch_all_organizations(&self) -> Result<Vec<Organization>, SourceError>;

    async fn fetch_all_relationships(&self) -> Result<Vec<PersonRelationship>, SourceError>;

    async fn fetch_person_by_id(&self, id: &PersonId) -> Result<Option<Person>, SourceError>;

    async fn fetch_organization_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, SourceError>;
}
