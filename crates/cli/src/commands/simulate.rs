use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use boardwatch_core::config::LoadOptions;
use boardwatch_core::{AnalysisRequest, GovernanceService, Modification};
use boardwatch_db::SqlGovernanceRepository;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::commands::{
    application_failure, build_runtime, load_config, open_database, CommandResult,
};

#[derive(Debug, Clone)]
pub struct SimulateArgs {
    pub file: PathBuf,
    pub as_of: Option<NaiveDate>,
}

/// A modification file is either a bare list or an object with a `modifications` list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModificationFile {
    List(Vec<Modification>),
    Wrapped { modifications: Vec<Modification> },
}

impl ModificationFile {
    fn into_modifications(self) -> Vec<Modification> {
        match self {
            Self::List(modifications) | Self::Wrapped { modifications } => modifications,
        }
    }
}

pub fn read_modifications(path: &Path) -> anyhow::Result<Vec<Modification>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read `{}`", path.display()))?;
    let file: ModificationFile = serde_json::from_str(&raw)
        .with_context(|| format!("could not parse `{}`", path.display()))?;
    Ok(file.into_modifications())
}

pub fn run(options: LoadOptions, args: SimulateArgs) -> CommandResult {
    let modifications = match read_modifications(&args.file) {
        Ok(modifications) => modifications,
        Err(error) => {
            return CommandResult::failure("simulate", "invalid_input", format!("{error:#}"), 2)
        }
    };
    let request = AnalysisRequest::as_of(args.as_of.unwrap_or_else(|| Utc::now().date_naive()));
    let config = match load_config("simulate", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("simulate") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let service = GovernanceService::new(
            SqlGovernanceRepository::new(pool.clone()),
            config.analysis.settings(),
        );
        let outcome = service
            .simulate(&request, modifications)
            .await
            .map_err(|error| application_failure("simulate", error));
        pool.close().await;
        outcome
    });

    match result {
        Ok(outcome) => {
            let message = format!(
                "{} risks under the hypothetical ({} new, {} resolved, {} modifications skipped)",
                outcome.risks.len(),
                outcome.new_risk_count,
                outcome.resolved_risk_ids.len(),
                outcome.skipped_modifications.len()
            );
            match serde_json::to_value(&outcome) {
                Ok(data) => CommandResult::success_with_data("simulate", message, Some(data)),
                Err(error) => {
                    CommandResult::failure("simulate", "serialization", error.to_string(), 8)
                }
            }
        }
        Err(failure) => CommandResult::from_step("simulate", failure),
    }
}
