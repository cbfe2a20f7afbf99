//! The ecs module owns the calls to the ECS management API.

use crate::error::{self, Result};
use async_trait::async_trait;
use aws_sdk_ecs::types::{ContainerDefinition, Volume};
use aws_sdk_ecs::Client as EcsClient;
use log::{debug, info};
use snafu::{OptionExt, ResultExt};

/// The parts of a task definition that are carried into a new revision.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TaskDefinition {
    pub(crate) family: String,
    pub(crate) volumes: Vec<Volume>,
    pub(crate) container_definitions: Vec<ContainerDefinition>,
}

#[async_trait]
pub(crate) trait TaskDefinitionApi {
    /// Fetches the latest active revision of `family`.
    async fn describe_task_definition(&self, family: &str) -> Result<TaskDefinition>;

    /// Registers `task_definition` as a new revision of its family and returns the revision's ARN.
    async fn register_task_definition(&self, task_definition: &TaskDefinition) -> Result<String>;

    /// Points `service` in `cluster` at `task_definition`.
    async fn update_service(
        &self,
        cluster: &str,
        service: &str,
        task_definition: &str,
        desired_count: i32,
    ) -> Result<()>;
}

pub(crate) struct Ecs {
    client: EcsClient,
}

impl Ecs {
    pub(crate) fn new(client: EcsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TaskDefinitionApi for Ecs {
    async fn describe_task_definition(&self, family: &str) -> Result<TaskDefinition> {
        debug!("Describing task definition '{}'", family);
        let task_definition = self
            .client
            .describe_task_definition()
            .task_definition(family)
            .send()
            .await
            .context(error::DescribeTaskDefinitionSnafu { family })?
            .task_definition
            .context(error::MissingInResponseSnafu {
                request_type: "DescribeTaskDefinition",
                missing: "taskDefinition",
            })?;

        if let Some(arn) = &task_definition.task_definition_arn {
            info!("Found current task definition {}", arn);
        }
        Ok(TaskDefinition {
            family: task_definition
                .family
                .context(error::MissingInResponseSnafu {
                    request_type: "DescribeTaskDefinition",
                    missing: "family",
                })?,
            volumes: task_definition.volumes.unwrap_or_default(),
            container_definitions: task_definition.container_definitions.unwrap_or_default(),
        })
    }

    async fn register_task_definition(&self, task_definition: &TaskDefinition) -> Result<String> {
        let family = &task_definition.family;
        self.client
            .register_task_definition()
            .family(family)
            .set_volumes(Some(task_definition.volumes.clone()))
            .set_container_definitions(Some(task_definition.container_definitions.clone()))
            .send()
            .await
            .context(error::RegisterTaskDefinitionSnafu { family })?
            .task_definition
            .and_then(|registered| registered.task_definition_arn)
            .context(error::MissingInResponseSnafu {
                request_type: "RegisterTaskDefinition",
                missing: "taskDefinitionArn",
            })
    }

    async fn update_service(
        &self,
        cluster: &str,
        service: &str,
        task_definition: &str,
        desired_count: i32,
    ) -> Result<()> {
        self.client
            .update_service()
            .cluster(cluster)
            .service(service)
            .task_definition(task_definition)
            .desired_count(desired_count)
            .send()
            .await
            .context(error::UpdateServiceSnafu { cluster, service })?;
        Ok(())
    }
}
