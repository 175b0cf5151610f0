use boardwatch_core::config::LoadOptions;
use boardwatch_core::{
    AnalysisRequest, DateWindow, DomainError, GovernanceAnalysis, GovernanceService,
};
use boardwatch_db::SqlGovernanceRepository;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};

use crate::commands::{
    application_failure, build_runtime, load_config, open_database, CommandResult,
};

#[derive(Debug, Clone, Default)]
pub struct AnalyzeArgs {
    pub as_of: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AnalyzeArgs {
    /// Builds the request, rejecting a window whose bounds are reversed.
    pub fn request(&self) -> Result<AnalysisRequest, DomainError> {
        let as_of = self.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let request = AnalysisRequest::as_of(as_of);
        if self.from.is_none() && self.to.is_none() {
            return Ok(request);
        }
        Ok(request.with_window(DateWindow::new(self.from, self.to)?))
    }
}

pub fn run(options: LoadOptions, args: AnalyzeArgs) -> CommandResult {
    let request = match args.request() {
        Ok(request) => request,
        Err(error) => {
            return CommandResult::failure("analyze", "invalid_input", error.to_string(), 2)
        }
    };
    let config = match load_config("analyze", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime("analyze") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let service = GovernanceService::new(
            SqlGovernanceRepository::new(pool.clone()),
            config.analysis.settings(),
        );
        let analysis = service
            .analyze(&request)
            .await
            .map_err(|error| application_failure("analyze", error));
        pool.close().await;
        analysis
    });

    match result {
        Ok(analysis) => {
            let summary = analysis.summary();
            CommandResult::success_with_data(
                "analyze",
                format!(
                    "{} overlaps, {} risks ({} high, {} medium, {} low, {} info)",
                    analysis.overlaps.len(),
                    summary.total,
                    summary.high,
                    summary.medium,
                    summary.low,
                    summary.info
                ),
                Some(analysis_payload(&request, &analysis)),
            )
        }
        Err((error_class, message, exit_code)) if error_class == "data_unavailable" => {
            CommandResult::failure_with_data(
                "analyze",
                error_class,
                message,
                exit_code,
                Some(analysis_payload(&request, &GovernanceAnalysis::empty())),
            )
        }
        Err(failure) => CommandResult::from_step("analyze", failure),
    }
}

fn analysis_payload(request: &AnalysisRequest, analysis: &GovernanceAnalysis) -> Value {
    json!({
        "as_of": request.as_of,
        "window": request.window,
        "summary": analysis.summary(),
        "overlaps": analysis.overlaps,
        "risks": analysis.risks,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use boardwatch_core::DomainError;

    use super::AnalyzeArgs;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn reversed_window_is_rejected() {
        let args = AnalyzeArgs {
            as_of: Some(date(2024, 6, 30)),
            from: Some(date(2024, 1, 1)),
            to: Some(date(2023, 1, 1)),
        };

        assert!(matches!(args.request(), Err(DomainError::InvertedWindow { .. })));
    }

    #[test]
    fn half_open_window_is_kept() {
        let args =
            AnalyzeArgs { as_of: Some(date(2024, 6, 30)), from: Some(date(2020, 1, 1)), to: None };

        let request = args.request().expect("request");
        assert_eq!(request.as_of, date(2024, 6, 30));
        assert_eq!(request.window.and_then(|window| window.from), Some(date(2020, 1, 1)));
        assert_eq!(request.window.and_then(|window| window.to), None);
    }

    #[test]
    fn no_bounds_means_no_window() {
        let request = AnalyzeArgs::default().request().expect("request");
        assert!(request.window.is_none());
    }
}
