use boardwatch_core::config::LoadOptions;
use boardwatch_db::{GovernanceSeedDataset, SeedResult};

use crate::commands::{build_runtime, load_config, open_database, CommandResult, StepFailure};

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;

        let seed_result = GovernanceSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = GovernanceSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedResult, StepFailure> = if verification.all_present {
            Ok(seed_result)
        } else {
            let failed_checks = verification
                .checks
                .iter()
                .filter_map(|(check, passed)| (!passed).then_some(*check))
                .collect::<Vec<_>>();
            Err(("seed_verification", verification_failure_message(&failed_checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", seed_summary(&seeded)),
        Err(failure) => CommandResult::from_step("seed", failure),
    }
}

fn seed_summary(seeded: &SeedResult) -> String {
    format!(
        "governance demo dataset loaded (reference date {}):\n  - people: {}\n  \
         - organizations: {}\n  - ownership edges: {}\n  - board seats: {}\n  \
         - relationships: {}",
        GovernanceSeedDataset::AS_OF,
        seeded.people,
        seeded.organizations,
        seeded.ownership_edges,
        seeded.seats,
        seeded.relationships
    )
}

fn verification_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
