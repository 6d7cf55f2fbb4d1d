use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use super::engine::{StageExecutor, StageResult};
use super::stage::Stage;
use super::validation::Validator;
use crate::error::StageError;

/// Supplies the validator for each stage.
pub trait ValidatorProvider: Send + Sync {
    fn validator_for(&self, stage: Stage) -> Arc<dyn Validator>;
}

impl<F> ValidatorProvider for F
where
    F: Fn(Stage) -> Arc<dyn Validator> + Send + Sync,
{
    fn validator_for(&self, stage: Stage) -> Arc<dyn Validator> {
        self(stage)
    }
}

/// Completed stages of a sequential run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct WorkflowReport {
    pub spec_name: String,
    pub results: Vec<StageResult>,
}

impl WorkflowReport {
    pub fn total_attempts(&self) -> u32 {
        self.results.iter().map(|r| r.attempts).sum()
    }
}

/// Runs a list of stages one agent session each, in canonical order.
pub struct WorkflowOrchestrator {
    executor: StageExecutor,
    validators: Arc<dyn ValidatorProvider>,
    specs_dir: PathBuf,
    skip_preflight: bool,
}

impl WorkflowOrchestrator {
    pub fn new(
        executor: StageExecutor,
        validators: Arc<dyn ValidatorProvider>,
        specs_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            validators,
            specs_dir: specs_dir.into(),
            skip_preflight: false,
        }
    }

    pub fn skip_preflight(mut self, skip: bool) -> Self {
        self.skip_preflight = skip;
        self
    }

    /// Where `stage` writes its artifacts for `spec_name`.
    ///
    /// The constitution is project-wide and lives directly under the specs dir.
    pub fn artifact_dir(&self, spec_name: &str, stage: Stage) -> PathBuf {
        match stage {
            Stage::Constitution => self.specs_dir.clone(),
            _ => self.specs_dir.join(spec_name),
        }
    }

    /// Fail fast when an earlier stage's artifacts are missing.
    pub fn check_prerequisites(&self, spec_name: &str, stage: Stage) -> Result<(), StageError> {
        if self.skip_preflight {
            return Ok(());
        }
        let missing = stage.missing_prerequisites(&self.artifact_dir(spec_name, stage));
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StageError::MissingPrerequisites { stage, missing })
        }
    }

    /// Run a single stage with free-form arguments appended to its command.
    pub async fn run_stage(
        &self,
        spec_name: &str,
        stage: Stage,
        args: &str,
    ) -> Result<StageResult, StageError> {
        self.check_prerequisites(spec_name, stage)?;

        let artifact_dir = self.artifact_dir(spec_name, stage);
        let validator = self.validators.validator_for(stage);
        let command = stage.command(args);

        self.executor
            .execute_stage(spec_name, stage, &command, &artifact_dir, validator.as_ref())
            .await?
            .into_result(stage)
    }

    /// Run `stages` sorted into canonical order, stopping at the first failure.
    ///
    /// `args` is the feature description and only goes to `specify`; later
    /// stages read what earlier ones wrote.
    pub async fn run_stages(
        &self,
        spec_name: &str,
        stages: &[Stage],
        args: &str,
    ) -> Result<WorkflowReport, StageError> {
        let mut ordered = stages.to_vec();
        ordered.sort();
        ordered.dedup();

        info!(
            spec = spec_name,
            stages = %ordered.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(","),
            "workflow started"
        );

        let mut report = WorkflowReport {
            spec_name: spec_name.to_string(),
            results: Vec::with_capacity(ordered.len()),
        };

        for stage in ordered {
            let stage_args = if stage == Stage::Specify { args } else { "" };
            let result = self.run_stage(spec_name, stage, stage_args).await?;
            report.results.push(result);
        }

        info!(
            spec = spec_name,
            stages = report.results.len(),
            attempts = report.total_attempts(),
            "workflow completed"
        );
        Ok(report)
    }
}
