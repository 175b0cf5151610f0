//! Governance overlap and risk analysis.
//!
//! A run loads one [`GovernanceSnapshot`] from a [`GovernanceSource`], detects concurrent
//! board overlaps, resolves ownership control and common control, then classifies all of
//! it into severity-ranked [`RiskFlag`]s. Everything after the snapshot fetch is pure.

pub mod classifier;
pub mod common_control;
pub mod control;
pub mod overlap;
pub mod relationships;
pub mod risk;
pub mod simulation;
pub mod snapshot;
pub mod source;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::seat::DateWindow;
use crate::errors::{AnalysisError, ApplicationError, DomainError};
use classifier::{ClassifierSettings, RiskClassifier};
use overlap::{OverlapDetector, OverlapResult};
use risk::{RiskFlag, RiskSummary};
use simulation::{Modification, ModificationSet, SimulationOutcome};
use snapshot::GovernanceSnapshot;
use source::GovernanceSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Reference date for "currently active" seats and the roster lookback.
    pub as_of: NaiveDate,
    /// Restricts the seats fed to overlap detection.
    pub window: Option<DateWindow>,
}

impl AnalysisRequest {
    pub fn as_of(as_of: NaiveDate) -> Self {
        Self { as_of, window: None }
    }

    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.window.as_ref().map_or(Ok(()), DateWindow::validate)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceAnalysis {
    pub overlaps: Vec<OverlapResult>,
    pub risks: Vec<RiskFlag>,
}

impl GovernanceAnalysis {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> RiskSummary {
        RiskSummary::from_flags(&self.risks)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub classifier: ClassifierSettings,
    pub max_organizations: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self { classifier: ClassifierSettings::default(), max_organizations: 2000 }
    }
}

/// Runs overlap detection and risk classification over an in-memory snapshot.
#[derive(Clone, Debug)]
pub struct GovernanceAnalyzer {
    max_organizations: usize,
    detector: OverlapDetector,
    classifier: RiskClassifier,
}

impl GovernanceAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self {
            max_organizations: settings.max_organizations,
            detector: OverlapDetector::new(),
            classifier: RiskClassifier::new(settings.classifier),
        }
    }

    pub fn analyze(
        &self,
        snapshot: &GovernanceSnapshot,
        request: &AnalysisRequest,
    ) -> Result<GovernanceAnalysis, AnalysisError> {
        let count = snapshot.organizations.len();
        if count > self.max_organizations {
            return Err(AnalysisError::TooManyOrganizations {
                count,
                max_allowed: self.max_organizations,
            });
        }

        let seats = snapshot.seats_within(request.window.as_ref());
        let overlaps = self.detector.detect(&seats);
        let risks = self.classifier.classify(snapshot, &overlaps, request.as_of);
        debug!(
            event_name = "governance.analysis.classified",
            organization_count = count,
            seat_count = seats.len(),
            overlap_count = overlaps.len(),
            risk_count = risks.len(),
            "governance snapshot classified"
        );

        Ok(GovernanceAnalysis { overlaps, risks })
    }
}

impl Default for GovernanceAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisSettings::default())
    }
}

/// Fetches a fresh snapshot per call and hands it to the analyzer.
pub struct GovernanceService<S> {
    source: S,
    analyzer: GovernanceAnalyzer,
}

impl<S> GovernanceService<S>
where
    S: GovernanceSource,
{
    pub fn new(source: S, settings: AnalysisSettings) -> Self {
        Self { source, analyzer: GovernanceAnalyzer::new(settings) }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<GovernanceAnalysis, ApplicationError> {
        request.validate()?;
        let run_id = Uuid::new_v4().to_string();
        info!(
            event_name = "governance.analysis.started",
            run_id = %run_id,
            as_of = %request.as_of,
            "governance analysis started"
        );

        let snapshot = self.load_snapshot(&run_id).await?;
        let analysis = self.analyzer.analyze(&snapshot, request).map_err(|error| {
            warn!(
                event_name = "governance.analysis.rejected",
                run_id = %run_id,
                error = %error,
                "governance analysis rejected"
            );
            ApplicationError::from(error)
        })?;

        let summary = analysis.summary();
        info!(
            event_name = "governance.analysis.completed",
            run_id = %run_id,
            overlap_count = analysis.overlaps.len(),
            high = summary.high,
            medium = summary.medium,
            info = summary.info,
            "governance analysis completed"
        );
        Ok(analysis)
    }

    /// Evaluates hypothetical modifications against a fresh snapshot without writing anything.
    pub async fn simulate(
        &self,
        request: &AnalysisRequest,
        modifications: Vec<Modification>,
    ) -> Result<SimulationOutcome, ApplicationError> {
        request.validate()?;
        let run_id = Uuid::new_v4().to_string();
        info!(
            event_name = "governance.simulation.started",
            run_id = %run_id,
            modification_count = modifications.len(),
            "governance simulation started"
        );

        let snapshot = self.load_snapshot(&run_id).await?;
        let modifications = ModificationSet::hydrate(&self.source, modifications).await?;
        let outcome = self.analyzer.simulate(&snapshot, &modifications, request)?;

        info!(
            event_name = "governance.simulation.completed",
            run_id = %run_id,
            baseline_risk_count = outcome.baseline_risk_count,
            new_risk_count = outcome.new_risk_count,
            resolved_risk_count = outcome.resolved_risk_ids.len(),
            skipped_count = outcome.skipped_modifications.len(),
            "governance simulation completed"
        );
        Ok(outcome)
    }

    async fn load_snapshot(&self, run_id: &str) -> Result<GovernanceSnapshot, ApplicationError> {
        GovernanceSnapshot::load(&self.source).await.map_err(|error| {
            warn!(
                event_name = "governance.snapshot.unavailable",
                run_id = %run_id,
                error = %error,
                "governance snapshot could not be fetched"
            );
            ApplicationError::from(error)
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::{
        AnalysisRequest, AnalysisSettings, GovernanceAnalysis, GovernanceAnalyzer,
        GovernanceService,
    };
    use crate::domain::organization::{EntityType, Organization, OrganizationId};
    use crate::domain::person::{Person, PersonId};
    use crate::domain::relationship::PersonRelationship;
    use crate::domain::seat::{BoardSeat, DateWindow, RoleCategory, SeatId, Tenure};
    use crate::errors::{AnalysisError, ApplicationError, DomainError};
    use crate::governance::snapshot::GovernanceSnapshot;
    use crate::governance::source::{GovernanceSource, SeatRecord, SourceError};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn seat(person: &str, organization: &Organization, tenure: Tenure) -> BoardSeat {
        BoardSeat {
            id: SeatId(format!("S-{person}-{}", organization.id)),
            person: Person::new(person, "Member", person),
            organization: organization.to_ref(),
            category: RoleCategory::Director,
            title: "Director".to_string(),
            tenure,
            voting_rights: true,
            compensated: false,
        }
    }

    struct FailingSource;

    #[async_trait]
    impl GovernanceSource for FailingSource {
        async fn fetch_all_seats(&self) -> Result<Vec<SeatRecord>, SourceError> {
            Err(SourceError::Unavailable("connection refused".to_string()))
        }

        async fn fetch_all_organizations(&self) -> Result<Vec<Organization>, SourceError> {
            Ok(Vec::new())
        }

        async fn fetch_all_relationships(&self) -> Result<Vec<PersonRelationship>, SourceError> {
            Ok(Vec::new())
        }

        async fn fetch_person_by_id(&self, _id: &PersonId) -> Result<Option<Person>, SourceError> {
            Ok(None)
        }

        async fn fetch_organization_by_id(
            &self,
            _id: &OrganizationId,
        ) -> Result<Option<Organization>, SourceError> {
            Ok(None)
        }
    }

    #[test]
    fn organization_guardrail_rejects_oversized_snapshots() {
        let analyzer = GovernanceAnalyzer::new(AnalysisSettings {
            max_organizations: 2,
            ..AnalysisSettings::default()
        });
        let snapshot = GovernanceSnapshot {
            seats: Vec::new(),
            organizations: ["A", "B", "C"]
                .iter()
                .map(|id| Organization::new(*id, *id, EntityType::Other))
                .collect(),
            relationships: Vec::new(),
        };

        let error = analyzer
            .analyze(&snapshot, &AnalysisRequest::as_of(date(2024, 1, 1)))
            .expect_err("guardrail");
        assert_eq!(error, AnalysisError::TooManyOrganizations { count: 3, max_allowed: 2 });
    }

    #[test]
    fn window_limits_the_seats_used_for_overlaps() {
        let alder = Organization::new("E-1", "Alder", EntityType::ForProfit);
        let birch = Organization::new("E-2", "Birch", EntityType::ForProfit);
        let past = Tenure { start: Some(date(2015, 1, 1)), end: Some(date(2016, 1, 1)) };
        let snapshot = GovernanceSnapshot {
            seats: vec![seat("P-1", &alder, past), seat("P-1", &birch, past)],
            organizations: vec![alder, birch],
            relationships: Vec::new(),
        };
        let analyzer = GovernanceAnalyzer::default();

        let unbounded = analyzer
            .analyze(&snapshot, &AnalysisRequest::as_of(date(2024, 1, 1)))
            .expect("analysis");
        assert_eq!(unbounded.overlaps.len(), 1);

        let recent = AnalysisRequest::as_of(date(2024, 1, 1))
            .with_window(DateWindow { from: Some(date(2020, 1, 1)), to: None });
        let windowed = analyzer.analyze(&snapshot, &recent).expect("analysis");
        assert!(windowed.overlaps.is_empty());
        assert!(windowed.risks.is_empty());
    }

    #[test]
    fn empty_analysis_has_zero_summary() {
        let summary = GovernanceAnalysis::empty().summary();
        assert_eq!(summary.total, 0);
    }

    #[tokio::test]
    async fn reversed_window_is_rejected_before_any_fetch() {
        let service = GovernanceService::new(FailingSource, AnalysisSettings::default());
        let request = AnalysisRequest::as_of(date(2024, 1, 1))
            .with_window(DateWindow { from: Some(date(2023, 6, 1)), to: Some(date(2023, 1, 1)) });

        let error = service.analyze(&request).await.expect_err("inverted window");
        assert!(matches!(error, ApplicationError::Domain(DomainError::InvertedWindow { .. })));

        let error = service.simulate(&request, Vec::new()).await.expect_err("inverted window");
        assert!(matches!(error, ApplicationError::Domain(_)));
    }

    #[tokio::test]
    async fn fetch_failure_surfaces_as_data_unavailable() {
        let service = GovernanceService::new(FailingSource, AnalysisSettings::default());

        let error = service
            .analyze(&AnalysisRequest::as_of(date(2024, 1, 1)))
            .await
            .expect_err("source failure");
        assert!(matches!(error, ApplicationError::DataUnavailable(_)));
    }
}
