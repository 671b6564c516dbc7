//! Lambda side: turns an S3 notification into one job run request.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Service able to start runs of a named job.
#[async_trait]
pub trait JobOrchestrator: Send + Sync {
    /// Starts one run and returns its run id.
    async fn start_run(&self, job_name: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub status_code: u16,
    pub body: String,
}

impl TriggerResponse {
    fn with_message(status_code: u16, message: String) -> Self {
        // body carries a JSON string literal; serializing a String cannot fail
        let body = serde_json::to_string(&message).unwrap_or_default();
        Self { status_code, body }
    }
}

/// `s3://bucket/key` for every record, in event order.
pub fn source_locations(event: &StorageEvent) -> Vec<String> {
    event
        .records
        .iter()
        .map(|r| format!("s3://{}/{}", r.s3.bucket.name, r.s3.object.key))
        .collect()
}

/// Logs each record's source, then starts exactly one run of `job_name`.
pub async fn function_handler<O: JobOrchestrator + ?Sized>(
    event: &StorageEvent,
    orchestrator: &O,
    job_name: &str,
) -> TriggerResponse {
    for location in source_locations(event) {
        info!(%location, "Triggered by: {location}");
    }

    match orchestrator.start_run(job_name).await {
        Ok(run_id) => {
            info!(job = job_name, run_id = %run_id, "job run started");
            TriggerResponse::with_message(200, format!("Glue job started: {run_id}"))
        }
        Err(e) => {
            error!(job = job_name, error = %e, "failed to start job run");
            TriggerResponse::with_message(500, format!("Error: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[derive(Default)]
    struct RecordingOrchestrator {
        calls: Mutex<Vec<String>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl JobOrchestrator for RecordingOrchestrator {
        async fn start_run(&self, job_name: &str) -> Result<String> {
            self.calls.lock().unwrap().push(job_name.to_string());
            match &self.fail_with {
                Some(msg) => Err(anyhow!(msg.clone())),
                None => Ok("jr_0123".to_string()),
            }
        }
    }

    fn event(value: serde_json::Value) -> StorageEvent {
        serde_json::from_value(value).unwrap()
    }

    fn s3_record(bucket: &str, key: &str) -> serde_json::Value {
        json!({
            "eventSource": "aws:s3",
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": { "name": bucket, "arn": format!("arn:aws:s3:::{bucket}") },
                "object": { "key": key, "size": 1024 }
            }
        })
    }

    #[tokio::test]
    async fn starts_one_run_without_records() {
        let glue = RecordingOrchestrator::default();
        let resp = function_handler(&event(json!({})), &glue, "nightly").await;

        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.body, "\"Glue job started: jr_0123\"");
        assert_eq!(*glue.calls.lock().unwrap(), vec!["nightly"]);
    }

    #[tokio::test]
    async fn starts_one_run_for_many_records() {
        let glue = RecordingOrchestrator::default();
        let ev = event(json!({
            "Records": [
                s3_record("raw", "input/a.csv"),
                s3_record("raw", "input/b.csv"),
                s3_record("raw", "input/c.csv"),
            ]
        }));

        let resp = function_handler(&ev, &glue, "nightly").await;

        assert_eq!(resp.status_code, 200);
        assert_eq!(glue.calls.lock().unwrap().len(), 1);
        assert_eq!(
            source_locations(&ev),
            vec!["s3://raw/input/a.csv", "s3://raw/input/b.csv", "s3://raw/input/c.csv"]
        );
    }

    #[tokio::test]
    async fn logs_each_record_source() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let glue = RecordingOrchestrator::default();
        let ev = event(json!({
            "Records": [
                s3_record("raw", "input/a.csv"),
                s3_record("raw", "input/b.csv"),
                s3_record("raw", "input/c.csv"),
            ]
        }));
        function_handler(&ev, &glue, "nightly").await;

        let out = logs.contents();
        for key in ["a", "b", "c"] {
            let line = format!("Triggered by: s3://raw/input/{key}.csv");
            assert_eq!(out.matches(&line).count(), 1, "{out}");
        }
        assert_eq!(out.matches("Triggered by:").count(), 3);
        assert_eq!(glue.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn orchestration_fault_becomes_500() {
        let glue = RecordingOrchestrator {
            fail_with: Some("EntityNotFoundException: Job \"nightly\" not found".into()),
            ..Default::default()
        };

        let resp = function_handler(&event(json!({ "Records": [] })), &glue, "nightly").await;

        assert_eq!(resp.status_code, 500);
        let body: String = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body, "Error: EntityNotFoundException: Job \"nightly\" not found");
        assert_eq!(glue.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn response_serializes_camel_case() {
        let resp = TriggerResponse::with_message(200, "ok".into());
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({ "statusCode": 200, "body": "\"ok\"" })
        );
    }

    #[test]
    fn malformed_record_is_rejected() {
        let res = serde_json::from_value::<StorageEvent>(json!({
            "Records": [ { "s3": { "bucket": { "name": "raw" } } } ]
        }));
        assert!(res.is_err());
    }
}
