pub mod config;
pub mod domain;
pub mod errors;
pub mod governance;

pub use domain::organization::{
    EntityType, Organization, OrganizationId, OrganizationRef, Owner, OwnershipEdge,
};
pub use domain::person::{Person, PersonId};
pub use domain::relationship::{PersonRelationship, RelationshipCategory};
pub use domain::seat::{BoardSeat, DateWindow, RoleCategory, SeatId, Tenure};
pub use errors::{AnalysisError, ApplicationError, DomainError, InterfaceError};
pub use governance::risk::{RiskFlag, RiskId, RiskSeverity, RiskSummary, RiskType};
pub use governance::simulation::{Modification, SimulatedRisk, SimulationOutcome};
pub use governance::snapshot::GovernanceSnapshot;
pub use governance::source::{GovernanceSource, SeatRecord, SourceError};
pub use governance::{
    AnalysisRequest, AnalysisSettings, GovernanceAnalysis, GovernanceAnalyzer, GovernanceService,
};
