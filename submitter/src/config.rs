use crate::executors::ExecutorError;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io,
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::error;

// check if a file is executable
pub fn check_executable(path: &Path) -> Result<bool, ConfigErrors> {
    if !path.is_file() {
        Err(ConfigErrors::FileNotFound)
    } else {
        match File::open(path).map(|file| file.metadata()) {
            Ok(Ok(metadata)) => Ok((metadata.mode() & 0o111) != 0),
            Ok(Err(e)) | Err(e) => Err(ConfigErrors::MetadataNotFound(e)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Failed to read config file")]
    UnreadableConfig(#[from] io::Error),
    #[error("Config file is not valid")]
    InvalidConfig(#[from] serde_yaml::Error),
    #[error("Executor not supported")]
    UnsupportedExecutor(String),
    #[error("Executor failed to load")]
    FailedLoadExecutor(#[from] ExecutorError),
    #[error("File not found")]
    FileNotFound,
    #[error("Metadata not found")]
    MetadataNotFound(io::Error),
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct SubmitterConfig {
    // executor selection and scheduler invocation settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    // where the job parameter records come from
    #[serde(alias = "params", default)]
    pub parameters: ParameterConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields, default)]
pub struct ExecutorConfig {
    // Name of the selected executor, see Executors::load for the selection proccess
    pub name: String,

    // program name or path of the scheduler submission command
    pub qsub: PathBuf,

    // job template handed to the scheduler on every submission
    pub template: PathBuf,

    // per-submission timeout in milliseconds, wait indefinitely when unset
    pub timeout: Option<u64>,

    pub failure_policy: FailurePolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            name: "pbs".to_owned(),
            qsub: PathBuf::from_str("qsub").unwrap(),
            template: PathBuf::from_str("template_1.pbs").unwrap(),
            timeout: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct ParameterConfig {
    #[serde(default = "default_parameter_path")]
    pub path: PathBuf,
}

impl Default for ParameterConfig {
    fn default() -> Self {
        Self {
            path: default_parameter_path(),
        }
    }
}

/// How a submission child's exit status is classified.
///
/// `ExitCodeOne` keeps the narrow historical check where only an exit status
/// of exactly one counts as a failed submission and every other nonzero
/// status passes silently. `AnyNonzero` treats everything but a clean zero,
/// including children without an exit status, as failed.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    #[default]
    AnyNonzero,
    ExitCodeOne,
}

impl FailurePolicy {
    /// decide whether an observed exit code counts as a failed submission
    /// `None` covers children that died without a status (signal, timeout kill)
    pub fn is_failure(&self, code: Option<i32>) -> bool {
        match self {
            Self::AnyNonzero => code != Some(0),
            Self::ExitCodeOne => code == Some(1),
        }
    }
}

impl SubmitterConfig {
    /// read and deserialize a config file
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let file = File::open(path)?;

        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn preflight_checks(&mut self) -> bool {
        // attempt to catch all errors instead of piece-by-piece to make debugging easier for users
        let mut contains_error = false;

        self.executor.name = self.executor.name.to_lowercase();

        if !self.parameters.path.is_file() {
            error!(
                "parameters.path not found or not a file: {}",
                self.parameters.path.display()
            );
            contains_error = true;
        }

        match self.executor.name.as_str() {
            "pbs" => {
                if !self.executor.template.is_file() {
                    error!(
                        "executor.template not found at {}",
                        self.executor.template.display()
                    );
                    contains_error = true;
                }

                // bare program names are left to PATH resolution at spawn time
                if self.executor.qsub.components().count() > 1 {
                    match check_executable(&self.executor.qsub) {
                        Ok(true) => {}
                        Ok(false) => {
                            error!(
                                "executor.qsub target {} is not executable, this might cause problems",
                                self.executor.qsub.display()
                            );
                            contains_error = true;
                        }
                        Err(e) => {
                            error!(
                                "Failed to determine if executor.qsub ({}) is an executable: {e}",
                                self.executor.qsub.display()
                            );
                            contains_error = true;
                        }
                    }
                }
            }
            // renders commands without running them, nothing to look up
            "dry-run" => {}
            executor_name => {
                error!(
                    "executor.name ({executor_name}) is not supported, please use `pbs` or `dry-run`"
                );
                contains_error = true;
            }
        }

        if self.executor.timeout == Some(0) {
            error!("executor.timeout cannot be 0. Leave it unset to wait indefinitely.");
            contains_error = true;
        }

        contains_error
    }
}

fn default_parameter_path() -> PathBuf {
    PathBuf::from_str("job_params.csv").unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_nonzero_fails_everything_but_zero() {
        let policy = FailurePolicy::AnyNonzero;

        assert!(!policy.is_failure(Some(0)));
        assert!(policy.is_failure(Some(1)));
        assert!(policy.is_failure(Some(2)));
        assert!(policy.is_failure(Some(127)));
        assert!(policy.is_failure(None));
    }

    #[test]
    fn exit_code_one_only_matches_one() {
        let policy = FailurePolicy::ExitCodeOne;

        assert!(!policy.is_failure(Some(0)));
        assert!(policy.is_failure(Some(1)));
        assert!(!policy.is_failure(Some(2)));
        assert!(!policy.is_failure(Some(127)));
        assert!(!policy.is_failure(None));
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: SubmitterConfig = serde_yaml::from_str(
            "executor:\n  name: pbs\nparams:\n  path: week42/job_params.csv\n",
        )
        .unwrap();

        assert_eq!(config.executor.qsub, PathBuf::from("qsub"));
        assert_eq!(config.executor.template, PathBuf::from("template_1.pbs"));
        assert_eq!(config.executor.timeout, None);
        assert_eq!(config.executor.failure_policy, FailurePolicy::AnyNonzero);
        assert_eq!(
            config.parameters.path,
            PathBuf::from("week42/job_params.csv")
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_yaml::from_str::<SubmitterConfig>("retries: 3\n").is_err());
    }

    #[test]
    fn failure_policy_names_are_kebab_case() {
        let config: SubmitterConfig =
            serde_yaml::from_str("executor:\n  failure_policy: exit-code-one\n").unwrap();

        assert_eq!(config.executor.failure_policy, FailurePolicy::ExitCodeOne);
    }

    #[test]
    fn preflight_accepts_a_complete_setup() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("job_params.csv");
        let template = dir.path().join("template_1.pbs");
        std::fs::write(&params, "W1,srcA,dataA\n").unwrap();
        std::fs::write(&template, "#!/bin/sh\n").unwrap();

        let mut config = SubmitterConfig::default();
        config.parameters.path = params;
        config.executor.template = template;

        assert!(!config.preflight_checks());
    }

    #[test]
    fn preflight_rejects_missing_parameter_file() {
        let mut config = SubmitterConfig::default();
        config.executor.name = "dry-run".to_owned();
        config.parameters.path = PathBuf::from("/definitely/not/here.csv");

        assert!(config.preflight_checks());
    }

    #[test]
    fn preflight_rejects_a_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("job_params.csv");
        std::fs::write(&params, "W1,srcA,dataA\n").unwrap();

        let mut config = SubmitterConfig::default();
        config.executor.name = "dry-run".to_owned();
        config.parameters.path = params;
        config.executor.timeout = Some(0);

        assert!(config.preflight_checks());
    }

    #[test]
    fn preflight_rejects_unknown_executor_names() {
        let dir = tempfile::tempdir().unwrap();
        let params = dir.path().join("job_params.csv");
        std::fs::write(&params, "W1,srcA,dataA\n").unwrap();

        let mut config = SubmitterConfig::default();
        config.executor.name = "slurm".to_owned();
        config.parameters.path = params;

        assert!(config.preflight_checks());
    }
}
