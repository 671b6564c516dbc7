use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing_subscriber::EnvFilter;

use daily_csv_processor::config::TriggerConfig;
use daily_csv_processor::handler::{function_handler, StorageEvent};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .without_time()
        .init();

    let config = TriggerConfig::from_env();
    let glue_client = daily_csv_processor::aws::make_glue_client().await;

    let config = &config;
    let glue_client = &glue_client;
    run(service_fn(move |event: LambdaEvent<StorageEvent>| async move {
        Ok::<_, Error>(function_handler(&event.payload, glue_client, &config.job_name).await)
    }))
    .await
}
