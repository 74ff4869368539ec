use super::{format_variables, render_command, Executor, ExecutorError, SubmitSummary};
use crate::{
    config::{FailurePolicy, SubmitterConfig},
    params::{JobRecord, ParamsError},
};
use std::{io, path::PathBuf, process::Command, time::Duration};
use tracing::{debug, info, instrument, warn};
use wait_timeout::ChildExt;

/// Executor that hands every record to the scheduler's submission command.
///
/// Submissions run strictly one after another; each child is spawned directly
/// from an argument list, so field values never pass through a shell.
#[derive(Debug)]
pub struct PbsExecutor {
    qsub: PathBuf,
    template: PathBuf,
    timeout: Option<Duration>,
    policy: FailurePolicy,
}

impl PbsExecutor {
    /// spawn one submission and wait for it
    /// returns the child's exit code, `None` when it finished without one
    fn submit(&self, record: &JobRecord) -> io::Result<Option<i32>> {
        let mut child = Command::new(&self.qsub)
            .arg("-v")
            .arg(format_variables(record))
            .arg(&self.template)
            .spawn()?;

        match self.timeout {
            Some(timeout) => match child.wait_timeout(timeout)? {
                Some(status) => Ok(status.code()),
                None => {
                    // child hasn't exited yet
                    child.kill()?;
                    child.wait()?;

                    Ok(None)
                }
            },
            None => Ok(child.wait()?.code()),
        }
    }
}

impl Executor for PbsExecutor {
    fn load(config: &SubmitterConfig) -> Result<Self, ExecutorError> {
        Ok(Self {
            qsub: config.executor.qsub.clone(),
            template: config.executor.template.clone(),
            timeout: config.executor.timeout.map(Duration::from_millis),
            policy: config.executor.failure_policy,
        })
    }

    /// submit jobs sequentially, one child process per record
    #[instrument(skip(self, records), level = "info")]
    fn execute(
        &self,
        records: impl Iterator<Item = Result<JobRecord, ParamsError>>,
    ) -> Result<SubmitSummary, ExecutorError> {
        let mut summary = SubmitSummary::default();

        for record in records {
            // a malformed record aborts here, everything before it has
            // already been submitted and everything after it never is
            let record = record?;
            let command = render_command(&self.qsub, &self.template, &record);

            debug!("Submitting {command}");

            let failed = match self.submit(&record) {
                Ok(code) => {
                    debug!("Submission exited with {code:?}");

                    self.policy.is_failure(code)
                }
                Err(e) => {
                    warn!("Failed with {e}");

                    true
                }
            };

            if failed {
                summary.failed += 1;
                println!("Job {command} failed to submit");
            } else {
                summary.submitted += 1;
            }
        }

        info!(
            "Submitted {} jobs, {} failed",
            summary.submitted, summary.failed
        );

        Ok(summary)
    }
}
