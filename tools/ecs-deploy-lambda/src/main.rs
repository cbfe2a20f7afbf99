/*!
# Introduction

This is a lambda function that deploys a freshly built container image to an ECS service, as an
invoke action in a CodePipeline pipeline.

For each job it:
* reads the new image reference from the `build.out` entry of the job's input artifact (a zip
  archive in the pipeline's artifact bucket), using the temporary credentials in the job;
* takes the latest revision of the task definition family, and replaces the image of the first
  container whose image comes from the same repository as the new image;
* registers the result as a new revision of the family;
* updates the service to run the new revision;
* reports success or failure for the job back to CodePipeline.

A failure anywhere in the deployment is reported to the pipeline as a `JobFailed` failure with
the error message; the function itself only fails if the event isn't a CodePipeline job or if the
result can't be reported.

# Configuration

The action's `UserParameters` must be a JSON object:

```json
{"Cluster": "my-cluster", "Service": "my-service", "Family": "my-task-family", "DesiredCount": 1}
```

`Cluster`, `Service`, and `Family` are required.  `DesiredCount` is optional and defaults to 1.

The function also reads these environment variables:
* `LOG_LEVEL`: how much detail to log; from least to most: ERROR, WARN, INFO, DEBUG, TRACE.
  Defaults to INFO.
* `ARTIFACT_ENTRY`: the archive entry holding the image reference.  Defaults to `build.out`.
* `DOWNLOAD_DIR`: where artifacts are staged while they're read.  Defaults to the system
  temporary directory.

# Compiling & Building

The binary is named `bootstrap` so it can be zipped as-is for the `provided.al2` runtime.
*/

#![deny(rust_2018_idioms)]

mod artifact;
mod config;
mod deploy;
mod ecs;
mod error;
mod event;
mod image;
mod pipeline;

use crate::artifact::S3Artifacts;
use crate::config::EnvConfig;
use crate::deploy::Handler;
use crate::ecs::Ecs;
use crate::error::Result;
use crate::pipeline::CodePipeline;
use lambda_runtime::{service_fn, LambdaEvent};
use simplelog::{CombinedLogger, Config as LogConfig, ConfigBuilder, LevelFilter, SimpleLogger};
use snafu::ResultExt;
use std::process;

/// Crates whose logging is held at WARN unless a more detailed level than INFO is requested.
const NOISY_LOG_SOURCES: &[&str] = &[
    "aws_config",
    "aws_credential_types",
    "aws_http",
    "aws_smithy",
    "hyper",
    "lambda_runtime",
    "tracing::span",
];

fn init_logger(level: LevelFilter) -> Result<()> {
    // SimpleLogger will send errors to stderr and anything less to stdout.  To reduce verbosity
    // of the AWS SDK and the runtime we spin up two loggers with different levels.
    match level {
        LevelFilter::Info => {
            let mut ours = ConfigBuilder::new();
            let mut theirs = ConfigBuilder::new();
            for &source in NOISY_LOG_SOURCES {
                ours.add_filter_ignore_str(source);
                theirs.add_filter_allow_str(source);
            }
            CombinedLogger::init(vec![
                SimpleLogger::new(LevelFilter::Info, ours.build()),
                SimpleLogger::new(LevelFilter::Warn, theirs.build()),
            ])
            .context(error::LoggerSnafu)
        }
        _ => SimpleLogger::init(level, LogConfig::default()).context(error::LoggerSnafu),
    }
}

async fn run() -> Result<()> {
    let config = EnvConfig::from_env()?;
    init_logger(config.level_filter()?)?;

    // Clients for the function's own role are built once and reused by every invocation.
    let sdk_config = aws_config::load_from_env().await;
    let handler = Handler::new(
        Ecs::new(aws_sdk_ecs::Client::new(&sdk_config)),
        S3Artifacts::new(
            sdk_config.clone(),
            config.artifact_entry,
            config.download_dir,
        ),
        CodePipeline::new(aws_sdk_codepipeline::Client::new(&sdk_config)),
    );

    let handler = &handler;
    lambda_runtime::run(service_fn(
        move |event: LambdaEvent<serde_json::Value>| async move {
            handler.handle(event.payload).await
        },
    ))
    .await
    .context(error::RuntimeSnafu)
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn logger_holds_sdk_crates_at_warn() {
        init_logger(LevelFilter::Info).unwrap();
        assert_eq!(log::max_level(), LevelFilter::Info);
        // The global logger can only be installed once.
        assert!(matches!(
            init_logger(LevelFilter::Debug).unwrap_err(),
            error::Error::Logger { .. }
        ));
    }
}
