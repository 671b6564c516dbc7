use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("Missing required job argument: --{0}")]
    MissingArgument(String),

    #[error("Column not found in input: {0}")]
    MissingColumn(String),

    #[error("No input objects match s3://{bucket}/{pattern}")]
    NoInputObjects { bucket: String, pattern: String },

    #[error("StartJobRun response carried no JobRunId")]
    MissingRunId,
}
