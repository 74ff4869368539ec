mod dry_run;
mod pbs;

use crate::{
    config::{ConfigErrors, SubmitterConfig},
    params::{JobRecord, ParamsError},
};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to read job parameters")]
    InvalidParams(#[from] ParamsError),
}

/// counters for one submission run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmitSummary {
    pub submitted: usize,
    pub failed: usize,
}

pub trait Executor: Sized {
    /// create an executor instance from the loaded config
    fn load(config: &SubmitterConfig) -> Result<Self, ExecutorError>;

    /// drive the per-record submission loop
    fn execute(
        &self,
        records: impl Iterator<Item = Result<JobRecord, ParamsError>>,
    ) -> Result<SubmitSummary, ExecutorError>;
}

/// render the variable list handed to the scheduler via `-v`
pub(crate) fn format_variables(record: &JobRecord) -> String {
    format!(
        "WEEK={},SOURCE={},DATA={}",
        record.week, record.source, record.data
    )
}

/// render a submission as it would read on a shell prompt
pub(crate) fn render_command(qsub: &Path, template: &Path, record: &JobRecord) -> String {
    format!(
        "{} -v {} {}",
        qsub.display(),
        format_variables(record),
        template.display()
    )
}

#[derive(Debug)]
pub enum Executors {
    Pbs(pbs::PbsExecutor),
    DryRun(dry_run::DryRunExecutor),
}

impl Executors {
    pub fn load(config: &SubmitterConfig) -> Result<Self, ConfigErrors> {
        match config.executor.name.as_str() {
            "pbs" => Ok(Self::Pbs(pbs::PbsExecutor::load(config)?)),
            "dry-run" => Ok(Self::DryRun(dry_run::DryRunExecutor::load(config)?)),
            _ => Err(ConfigErrors::UnsupportedExecutor(
                config.executor.name.clone(),
            )),
        }
    }

    pub fn execute(
        &self,
        records: impl Iterator<Item = Result<JobRecord, ParamsError>>,
    ) -> Result<SubmitSummary, ExecutorError> {
        match self {
            Self::Pbs(executor) => executor.execute(records),
            Self::DryRun(executor) => executor.execute(records),
        }
    }
}
