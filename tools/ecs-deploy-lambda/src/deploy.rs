//! The deploy module holds the deployment itself: find the new image, swap it into the current
//! task definition, register the result as a new revision, and point the service at it.
//!
//! `deploy` returns a `Result` and never talks to the pipeline; `Handler` runs it for one job and
//! hands the result to `pipeline::signal_outcome`.

use crate::artifact::ArtifactSource;
use crate::config::UserParameters;
use crate::ecs::TaskDefinitionApi;
use crate::error::Result;
use crate::event::{Job, JobEvent};
use crate::image::substitute_image;
use crate::pipeline::{signal_outcome, PipelineReporter};
use log::{info, warn};

/// What a successful deployment did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Deployment {
    pub(crate) task_definition_arn: String,
    pub(crate) image: String,
    /// Index of the container whose image was replaced, if any matched.
    pub(crate) updated_container: Option<usize>,
}

impl Deployment {
    pub(crate) fn summary(&self) -> String {
        match self.updated_container {
            Some(index) => format!(
                "Deployed {} with image {} in container {}",
                self.task_definition_arn, self.image, index
            ),
            None => format!(
                "Deployed {} unchanged, no container matched image {}",
                self.task_definition_arn, self.image
            ),
        }
    }
}

/// Deploys the artifact of `job` to the service named in its user parameters.
pub(crate) async fn deploy<E, A>(ecs: &E, artifacts: &A, job: &Job) -> Result<Deployment>
where
    E: TaskDefinitionApi + ?Sized,
    A: ArtifactSource + ?Sized,
{
    let data = job.data()?;
    let params: UserParameters = data.action_configuration.configuration.user_parameters.parse()?;
    let location = data.artifact_location()?;
    info!(
        "Job {}: deploying {} to service '{}' in cluster '{}' using family '{}'",
        job.id, location, params.service, params.cluster, params.family
    );

    let mut task_definition = ecs.describe_task_definition(&params.family).await?;
    let image = artifacts
        .fetch_image(location, &data.artifact_credentials)
        .await?;
    info!("New image is '{}'", image);

    let updated_container = substitute_image(&mut task_definition.container_definitions, &image);
    match updated_container {
        Some(index) => info!(
            "Updated container '{}' (index {}) to '{}'",
            task_definition.container_definitions[index]
                .name
                .as_deref()
                .unwrap_or_default(),
            index,
            image
        ),
        None => warn!(
            "No container in family '{}' matches image '{}', registering it unchanged",
            task_definition.family, image
        ),
    }

    let task_definition_arn = ecs.register_task_definition(&task_definition).await?;
    info!("Registered task definition {}", task_definition_arn);

    ecs.update_service(
        &params.cluster,
        &params.service,
        &task_definition_arn,
        i32::from(params.desired_count),
    )
    .await?;
    info!(
        "Updated service '{}' in cluster '{}' to {} with desired count {}",
        params.service, params.cluster, task_definition_arn, params.desired_count
    );

    Ok(Deployment {
        task_definition_arn,
        image,
        updated_container,
    })
}

/// Long-lived clients shared by every invocation of the function.
pub(crate) struct Handler<E, A, R> {
    ecs: E,
    artifacts: A,
    pipeline: R,
}

impl<E, A, R> Handler<E, A, R>
where
    E: TaskDefinitionApi + Send + Sync,
    A: ArtifactSource + Send + Sync,
    R: PipelineReporter + Send + Sync,
{
    pub(crate) fn new(ecs: E, artifacts: A, pipeline: R) -> Self {
        Self {
            ecs,
            artifacts,
            pipeline,
        }
    }

    /// Runs the job in `event` and reports its outcome to the pipeline.  Errors are only returned
    /// when there is no job to report against, or when reporting itself fails.
    pub(crate) async fn handle(&self, event: serde_json::Value) -> Result<()> {
        let event = JobEvent::from_value(event)?;
        let outcome = deploy(&self.ecs, &self.artifacts, &event.job).await;
        signal_outcome(&self.pipeline, &event.job.id, &outcome).await
    }
}
