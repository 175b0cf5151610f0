use async_trait::async_trait;
use thiserror::Error;

use boardwatch_core::domain::organization::Organization;
use boardwatch_core::domain::person::Person;
use boardwatch_core::domain::relationship::PersonRelationship;
use boardwatch_core::governance::source::{GovernanceSource, SeatRecord, SourceError};

pub mod governance;
pub mod memory;

pub use governance::SqlGovernanceRepository;
pub use memory::InMemoryGovernanceRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for SourceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(error) => SourceError::Unavailable(error.to_string()),
            RepositoryError::Decode(message) => SourceError::Decode(message),
        }
    }
}

/// Write side of the governance store. Every save is an upsert keyed by the record id.
#[async_trait]
pub trait GovernanceRepository: GovernanceSource {
    async fn save_person(&self, person: Person) -> Result<(), RepositoryError>;

    /// Replaces the organization row and its full set of ownership edges.
    async fn save_organization(&self, organization: Organization) -> Result<(), RepositoryError>;

    async fn save_seat(&self, seat: SeatRecord) -> Result<(), RepositoryError>;

    async fn save_relationship(
        &self,
        relationship: PersonRelationship,
    ) -> Result<(), RepositoryError>;
}

/// Relationships are undirected, so the key sorts the pair before joining it with the category.
pub fn relationship_key(relationship: &PersonRelationship) -> String {
    let (first, second) = if relationship.person1_id <= relationship.person2_id {
        (&relationship.person1_id, &relationship.person2_id)
    } else {
        (&relationship.person2_id, &relationship.person1_id)
    };
    format!("{first}:{second}:{}", relationship.category.as_str())
}
