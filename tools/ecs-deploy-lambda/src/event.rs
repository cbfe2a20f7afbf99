//! The event module models the CodePipeline job event that invokes the function.
//!
//! Parsing happens in two stages.  `JobEvent` only needs the job id, so that every later problem
//! with the event can still be reported back to the pipeline against that id.  `JobData` holds
//! the rest and is parsed inside the deployment.

use crate::error::{self, Result};
use serde::Deserialize;
use snafu::{OptionExt, ResultExt};
use std::fmt;

#[derive(Debug, Deserialize)]
pub(crate) struct JobEvent {
    #[serde(rename = "CodePipeline.job")]
    pub(crate) job: Job,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Job {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) data: serde_json::Value,
}

impl JobEvent {
    pub(crate) fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).context(error::JobEventSnafu)
    }
}

impl Job {
    /// Parses the job's `data` block.
    pub(crate) fn data(&self) -> Result<JobData> {
        JobData::deserialize(&self.data).context(error::JobDataSnafu)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobData {
    pub(crate) action_configuration: ActionConfiguration,
    #[serde(default)]
    pub(crate) input_artifacts: Vec<InputArtifact>,
    pub(crate) artifact_credentials: ArtifactCredentials,
}

impl JobData {
    /// Returns the S3 location of the first input artifact; only one is consumed.
    pub(crate) fn artifact_location(&self) -> Result<&S3Location> {
        self.input_artifacts
            .first()
            .map(|artifact| &artifact.location.s3_location)
            .context(error::MissingInputArtifactSnafu)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionConfiguration {
    pub(crate) configuration: ConfigurationMap,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfigurationMap {
    #[serde(rename = "UserParameters", default)]
    pub(crate) user_parameters: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InputArtifact {
    pub(crate) location: ArtifactLocation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArtifactLocation {
    pub(crate) s3_location: S3Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct S3Location {
    pub(crate) bucket_name: String,
    pub(crate) object_key: String,
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket_name, self.object_key)
    }
}

/// Temporary credentials CodePipeline hands out for reading the input artifact.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArtifactCredentials {
    pub(crate) access_key_id: String,
    pub(crate) secret_access_key: String,
    pub(crate) session_token: String,
}

// Keep secrets out of the logs.
impl fmt::Debug for ArtifactCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .finish()
    }
}
