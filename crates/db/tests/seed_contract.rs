use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use chrono::NaiveDate;
use boardwatch_core::{
    AnalysisRequest, AnalysisSettings, GovernanceService, GovernanceSource, Modification,
    RiskSeverity,
};
use boardwatch_db::{
    connect_with_settings, migrations, GovernanceSeedDataset, SqlGovernanceRepository,
};

type SeedContractTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

#[derive(Debug, Deserialize)]
struct SeedContract {
    as_of: NaiveDate,
    people: Vec<String>,
    organizations: Vec<OrganizationContract>,
    seat_count: usize,
    ownership_edge_count: usize,
    relationship_count: usize,
    expected_overlaps: Vec<(String, String, usize)>,
    expected_risks: BTreeMap<String, Vec<String>>,
    simulation: SimulationContract,
}

#[derive(Debug, Deserialize)]
struct OrganizationContract {
    id: String,
    entity_type: String,
    parent_appoints_board: bool,
}

#[derive(Debug, Deserialize)]
struct SimulationContract {
    modifications: Vec<Modification>,
    new_risk_ids: Vec<String>,
    resolved_risk_ids: Vec<String>,
}

fn load_contract() -> SeedContractTestResult<SeedContract> {
    serde_json::from_str(include_str!("../../../config/fixtures/governance_seed_contract.json"))
        .map_err(|error| format!("seed contract should parse: {error}"))
}

fn seed_sql() -> &'static str {
    include_str!("../../../config/fixtures/governance_seed.sql")
}

/// Values of the `id` column for every row the seed SQL inserts into `table`.
fn inserted_ids(table: &str) -> Vec<String> {
    let marker = format!("INSERT OR IGNORE INTO {table} ");
    let Some(start) = seed_sql().find(&marker) else {
        return Vec::new();
    };
    let block = &seed_sql()[start..];
    let block = &block[..block.find(';').unwrap_or(block.len())];

    block
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("('"))
        .filter_map(|line| line.split('\'').nth(1))
        .map(str::to_string)
        .collect()
}

async fn seeded_repository() -> SeedContractTestResult<SqlGovernanceRepository> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect should succeed: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrations: {error}"))?;
    GovernanceSeedDataset::load(&pool).await.map_err(|error| format!("seed: {error}"))?;
    Ok(SqlGovernanceRepository::new(pool))
}

#[test]
fn seed_sql_inserts_exactly_the_contract_records() -> SeedContractTestResult {
    let contract = load_contract()?;

    let mut people = inserted_ids("person");
    people.sort();
    require_eq!(people, contract.people);

    let organizations = inserted_ids("organization");
    require_eq!(organizations.len(), contract.organizations.len());
    for organization in &contract.organizations {
        require!(
            organizations.contains(&organization.id),
            "seed SQL should insert organization {}",
            organization.id
        );
        let row = seed_sql()
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with(&format!("('{}'", organization.id)))
            .ok_or_else(|| format!("organization row {} should exist", organization.id))?;
        let flag = i32::from(organization.parent_appoints_board);
        require!(
            row.contains(&format!("'{}', {flag})", organization.entity_type)),
            "organization row {row} should carry {} and flag {flag}",
            organization.entity_type
        );
    }

    require_eq!(inserted_ids("board_seat").len(), contract.seat_count);
    require_eq!(inserted_ids("entity_owner").len(), contract.ownership_edge_count);
    require_eq!(inserted_ids("person_relationship").len(), contract.relationship_count);
    Ok(())
}

#[test]
fn contract_risk_ids_are_unique_and_sorted_within_severity() -> SeedContractTestResult {
    let contract = load_contract()?;
    let mut seen = BTreeSet::new();

    for (severity, ids) in &contract.expected_risks {
        require!(
            ["HIGH", "MEDIUM", "LOW", "INFO"].contains(&severity.as_str()),
            "unknown severity bucket {severity}"
        );
        let mut sorted = ids.clone();
        sorted.sort();
        require_eq!(&sorted, ids, "{severity} risk ids should be sorted");
        for id in ids {
            require!(seen.insert(id.clone()), "risk id {id} listed twice");
        }
    }
    Ok(())
}

#[tokio::test]
async fn seeded_store_produces_the_contract_analysis() -> SeedContractTestResult {
    let contract = load_contract()?;
    let repository = seeded_repository().await?;

    let seats = repository.fetch_all_seats().await.map_err(|error| error.to_string())?;
    require_eq!(seats.len(), contract.seat_count);

    let service = GovernanceService::new(repository, AnalysisSettings::default());
    let analysis = service
        .analyze(&AnalysisRequest::as_of(contract.as_of))
        .await
        .map_err(|error| format!("analysis should succeed: {error}"))?;

    let overlaps = analysis
        .overlaps
        .iter()
        .map(|overlap| {
            (overlap.first.id.0.clone(), overlap.second.id.0.clone(), overlap.shared_count)
        })
        .collect::<Vec<_>>();
    require_eq!(overlaps, contract.expected_overlaps);

    let mut by_severity: BTreeMap<String, Vec<String>> =
        ["HIGH", "MEDIUM", "LOW", "INFO"].iter().map(|s| (s.to_string(), Vec::new())).collect();
    for risk in &analysis.risks {
        let bucket = match risk.severity {
            RiskSeverity::High => "HIGH",
            RiskSeverity::Medium => "MEDIUM",
            RiskSeverity::Low => "LOW",
            RiskSeverity::Info => "INFO",
        };
        by_severity.entry(bucket.to_string()).or_default().push(risk.id.0.clone());
    }
    require_eq!(by_severity, contract.expected_risks);

    let ordered = analysis.risks.iter().map(|risk| risk.id.0.clone()).collect::<Vec<_>>();
    let expected_order = ["HIGH", "MEDIUM", "LOW", "INFO"]
        .iter()
        .flat_map(|severity| contract.expected_risks.get(*severity).cloned().unwrap_or_default())
        .collect::<Vec<_>>();
    require_eq!(ordered, expected_order, "risks should be ranked by severity then id");
    Ok(())
}

#[tokio::test]
async fn seeded_store_simulation_matches_contract_and_leaves_store_untouched(
) -> SeedContractTestResult {
    let contract = load_contract()?;
    let repository = seeded_repository().await?;
    let before = repository.fetch_all_seats().await.map_err(|error| error.to_string())?;

    let service = GovernanceService::new(repository, AnalysisSettings::default());
    let outcome = service
        .simulate(&AnalysisRequest::as_of(contract.as_of), contract.simulation.modifications)
        .await
        .map_err(|error| format!("simulation should succeed: {error}"))?;

    let new_ids = outcome.new_risks().map(|risk| risk.risk.id.0.clone()).collect::<BTreeSet<_>>();
    let expected_new = contract.simulation.new_risk_ids.iter().cloned().collect::<BTreeSet<_>>();
    require_eq!(new_ids, expected_new);
    require_eq!(outcome.new_risk_count, contract.simulation.new_risk_ids.len());

    let resolved = outcome.resolved_risk_ids.iter().map(|id| id.0.clone()).collect::<Vec<_>>();
    require_eq!(resolved, contract.simulation.resolved_risk_ids);
    require!(outcome.skipped_modifications.is_empty());

    let total: usize = contract.expected_risks.values().map(Vec::len).sum();
    require_eq!(outcome.baseline_risk_count, total);

    let after = service.source().fetch_all_seats().await.map_err(|error| error.to_string())?;
    require_eq!(after, before, "simulation must not write to the store");
    Ok(())
}
