//! Provides the list of errors for `ecs-deploy-lambda`.

use aws_smithy_types::error::display::DisplayErrorContext;
use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to read environment configuration: {}", source))]
    EnvConfig { source: envy::Error },

    #[snafu(display("Invalid log level '{}': {}", level, source))]
    LogLevel {
        level: String,
        source: log::ParseLevelError,
    },

    #[snafu(display("Logger setup error: {}", source))]
    Logger { source: log::SetLoggerError },

    #[snafu(display("Lambda runtime error: {}", source))]
    Runtime { source: lambda_runtime::Error },

    #[snafu(display("Invocation event is not a CodePipeline job: {}", source))]
    JobEvent { source: serde_json::Error },

    #[snafu(display("Malformed job data: {}", source))]
    JobData { source: serde_json::Error },

    #[snafu(display("Job has no input artifacts"))]
    MissingInputArtifact,

    #[snafu(display("Failed to parse UserParameters: {}", source))]
    UserParametersParse { source: serde_json::Error },

    #[snafu(display("UserParameters key '{}' must be a non-empty string", key))]
    UserParametersEmpty { key: String },

    #[snafu(display("Failed to describe task definition '{}': {}", family, DisplayErrorContext(source)))]
    DescribeTaskDefinition {
        family: String,
        source: aws_sdk_ecs::error::SdkError<
            aws_sdk_ecs::operation::describe_task_definition::DescribeTaskDefinitionError,
        >,
    },

    #[snafu(display("Failed to register task definition '{}': {}", family, DisplayErrorContext(source)))]
    RegisterTaskDefinition {
        family: String,
        source: aws_sdk_ecs::error::SdkError<
            aws_sdk_ecs::operation::register_task_definition::RegisterTaskDefinitionError,
        >,
    },

    #[snafu(display(
        "Failed to update service '{}' in cluster '{}': {}",
        service,
        cluster,
        DisplayErrorContext(source)
    ))]
    UpdateService {
        cluster: String,
        service: String,
        source: aws_sdk_ecs::error::SdkError<
            aws_sdk_ecs::operation::update_service::UpdateServiceError,
        >,
    },

    #[snafu(display("Response to {} was missing {}", request_type, missing))]
    MissingInResponse {
        request_type: String,
        missing: String,
    },

    #[snafu(display("Failed to get s3://{}/{}: {}", bucket, key, DisplayErrorContext(source)))]
    GetObject {
        bucket: String,
        key: String,
        source: aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::get_object::GetObjectError>,
    },

    #[snafu(display("Failed to read artifact {}: {}", path.display(), source))]
    ArtifactRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to create temporary file in {}: {}", path.display(), source))]
    TempFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to write artifact to {}: {}", path.display(), source))]
    ArtifactWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to open artifact {} as a zip archive: {}", path.display(), source))]
    ArchiveOpen {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[snafu(display("Failed to find '{}' in artifact {}: {}", entry, path.display(), source))]
    ArchiveEntry {
        entry: String,
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[snafu(display("Failed to read '{}' from artifact {}: {}", entry, path.display(), source))]
    ArchiveRead {
        entry: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Image reference in '{}' is not valid UTF-8: {}", entry, source))]
    ImageNotUtf8 {
        entry: String,
        source: std::string::FromUtf8Error,
    },

    #[snafu(display("Failed to report success for job '{}': {}", job_id, DisplayErrorContext(source)))]
    PutJobSuccess {
        job_id: String,
        source: aws_sdk_codepipeline::error::SdkError<
            aws_sdk_codepipeline::operation::put_job_success_result::PutJobSuccessResultError,
        >,
    },

    #[snafu(display("Failed to report failure for job '{}': {}", job_id, DisplayErrorContext(source)))]
    PutJobFailure {
        job_id: String,
        source: aws_sdk_codepipeline::error::SdkError<
            aws_sdk_codepipeline::operation::put_job_failure_result::PutJobFailureResultError,
        >,
    },
}
