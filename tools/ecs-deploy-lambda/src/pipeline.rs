//! The pipeline module reports the outcome of a job back to CodePipeline.
//!
//! CodePipeline waits on every Lambda invoke action until the function calls either
//! `PutJobSuccessResult` or `PutJobFailureResult` for the job, so exactly one of them is called
//! per invocation.

use crate::deploy::Deployment;
use crate::error::{self, Result};
use async_trait::async_trait;
use aws_sdk_codepipeline::types::{ExecutionDetails, FailureDetails, FailureType};
use aws_sdk_codepipeline::Client as CodePipelineClient;
use log::{error, info};
use snafu::ResultExt;

/// CodePipeline rejects failure messages longer than this.
const MAX_FAILURE_MESSAGE_CHARS: usize = 5000;
/// CodePipeline rejects execution summaries longer than this.
const MAX_SUMMARY_CHARS: usize = 2048;

#[async_trait]
pub(crate) trait PipelineReporter {
    async fn report_success(&self, job_id: &str, summary: &str) -> Result<()>;

    async fn report_failure(&self, job_id: &str, message: &str) -> Result<()>;
}

pub(crate) struct CodePipeline {
    client: CodePipelineClient,
}

impl CodePipeline {
    pub(crate) fn new(client: CodePipelineClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PipelineReporter for CodePipeline {
    async fn report_success(&self, job_id: &str, summary: &str) -> Result<()> {
        self.client
            .put_job_success_result()
            .job_id(job_id)
            .execution_details(
                ExecutionDetails::builder()
                    .summary(truncate(summary, MAX_SUMMARY_CHARS))
                    .build(),
            )
            .send()
            .await
            .context(error::PutJobSuccessSnafu { job_id })?;
        Ok(())
    }

    async fn report_failure(&self, job_id: &str, message: &str) -> Result<()> {
        self.client
            .put_job_failure_result()
            .job_id(job_id)
            .failure_details(
                FailureDetails::builder()
                    .r#type(FailureType::JobFailed)
                    .message(truncate(message, MAX_FAILURE_MESSAGE_CHARS))
                    .build(),
            )
            .send()
            .await
            .context(error::PutJobFailureSnafu { job_id })?;
        Ok(())
    }
}

/// Tells the pipeline how the deployment for `job_id` went.
pub(crate) async fn signal_outcome<R>(
    reporter: &R,
    job_id: &str,
    outcome: &Result<Deployment>,
) -> Result<()>
where
    R: PipelineReporter + ?Sized,
{
    match outcome {
        Ok(deployment) => {
            info!("Job {} succeeded: {}", job_id, deployment.summary());
            reporter.report_success(job_id, &deployment.summary()).await
        }
        Err(e) => {
            error!("Job {} failed: {:?}", job_id, e);
            reporter.report_failure(job_id, &e.to_string()).await
        }
    }
}

/// Returns at most the first `max_chars` characters of `s`.
fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}
