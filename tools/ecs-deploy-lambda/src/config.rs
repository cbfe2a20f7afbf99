use crate::error::{self, Result};
use serde::Deserialize;
use simplelog::LevelFilter;
use snafu::{ensure, ResultExt};
use std::path::PathBuf;
use std::str::FromStr;

/// Name of the archive entry holding the new image reference.
pub(crate) const DEFAULT_ARTIFACT_ENTRY: &str = "build.out";
/// Desired task count applied to the service when `DesiredCount` is not given.
pub(crate) const DEFAULT_DESIRED_COUNT: u16 = 1;

/// Settings read from the function's environment variables.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EnvConfig {
    #[serde(default = "default_log_level")]
    pub(crate) log_level: String,
    #[serde(default = "default_artifact_entry")]
    pub(crate) artifact_entry: String,
    #[serde(default = "std::env::temp_dir")]
    pub(crate) download_dir: PathBuf,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_artifact_entry() -> String {
    DEFAULT_ARTIFACT_ENTRY.to_string()
}

impl EnvConfig {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    pub(crate) fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars).context(error::EnvConfigSnafu)
    }

    pub(crate) fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level).context(error::LogLevelSnafu {
            level: &self.log_level,
        })
    }
}

/// The action's `UserParameters`, given as a JSON string in the pipeline definition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UserParameters {
    pub(crate) cluster: String,
    pub(crate) service: String,
    pub(crate) family: String,
    #[serde(default = "default_desired_count")]
    pub(crate) desired_count: u16,
}

fn default_desired_count() -> u16 {
    DEFAULT_DESIRED_COUNT
}

impl FromStr for UserParameters {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(s).context(error::UserParametersParseSnafu)?;
        for (key, value) in [
            ("Cluster", &params.cluster),
            ("Service", &params.service),
            ("Family", &params.family),
        ] {
            ensure!(
                !value.is_empty(),
                error::UserParametersEmptySnafu { key }
            );
        }
        Ok(params)
    }
}
