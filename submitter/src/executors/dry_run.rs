use super::{render_command, Executor, ExecutorError, SubmitSummary};
use crate::{
    config::SubmitterConfig,
    params::{JobRecord, ParamsError},
};
use std::path::PathBuf;
use tracing::info;

/// executor that prints submission commands instead of running them
#[derive(Debug)]
pub struct DryRunExecutor {
    qsub: PathBuf,
    template: PathBuf,
}

impl Executor for DryRunExecutor {
    fn load(config: &SubmitterConfig) -> Result<Self, ExecutorError> {
        Ok(Self {
            qsub: config.executor.qsub.clone(),
            template: config.executor.template.clone(),
        })
    }

    fn execute(
        &self,
        records: impl Iterator<Item = Result<JobRecord, ParamsError>>,
    ) -> Result<SubmitSummary, ExecutorError> {
        let mut summary = SubmitSummary::default();

        for record in records {
            let record = record?;

            println!("{}", render_command(&self.qsub, &self.template, &record));
            summary.submitted += 1;
        }

        info!(
            "Rendered {} submissions without running them",
            summary.submitted
        );

        Ok(summary)
    }
}
