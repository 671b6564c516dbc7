use anyhow::Result;
use aws_sdk_s3::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use daily_csv_processor::config::JobArgs;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // resolved the way the platform passes them: --JOB_NAME x --raw_bucket y ...
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = JobArgs::from_argv(&argv)?;

    let client: Client = daily_csv_processor::aws::make_s3_client().await;

    // any failure propagates and fails the run
    let summary = daily_csv_processor::job::run(&client, &args).await?;
    info!(
        objects = summary.input_objects,
        output = %format!("s3://{}/{}", args.processed_bucket, summary.output_key),
        "Processing completed in: {:?}",
        summary.elapsed
    );

    Ok(())
}
