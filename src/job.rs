use anyhow::Result;
use std::io::Cursor;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::{JobArgs, INPUT_EXTENSION, INPUT_PREFIX, OUTPUT_PREFIX};
use crate::error::EtlError;
use crate::models::Dataset;
use crate::parser::{parse_csv, parse_csv_rows};
use crate::sink::CsvPartWriter;
use crate::store::{list_matching, ObjectStore};
use crate::transform::transform;

/// A started run. Committing consumes it, so a run commits at most once.
#[derive(Debug)]
pub struct Job {
    name: String,
    run_id: Option<String>,
    started: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub job_name: String,
    pub run_id: Option<String>,
    pub input_objects: usize,
    pub rows_read: usize,
    pub rows_written: usize,
    pub output_key: String,
    pub elapsed: Duration,
}

impl Job {
    pub fn init(args: &JobArgs) -> Self {
        info!(job = %args.job_name, run_id = ?args.run_id, "job initialised");
        Self {
            name: args.job_name.clone(),
            run_id: args.run_id.clone(),
            started: Instant::now(),
        }
    }

    pub fn commit(
        self,
        input_objects: usize,
        rows_read: usize,
        rows_written: usize,
        output_key: String,
    ) -> JobSummary {
        let summary = JobSummary {
            job_name: self.name,
            run_id: self.run_id,
            input_objects,
            rows_read,
            rows_written,
            output_key,
            elapsed: self.started.elapsed(),
        };

        info!(
            job = %summary.job_name,
            run_id = ?summary.run_id,
            rows_read,
            rows_written,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "job committed"
        );
        summary
    }
}

/// Reads every input object into one dataset, in key order.
///
/// The first object with a header fixes the columns; every later object's
/// header row is skipped and its cells are taken by position.
pub async fn ingest<S: ObjectStore + ?Sized>(store: &S, bucket: &str) -> Result<(Dataset, usize)> {
    let keys = list_matching(store, bucket, INPUT_PREFIX, INPUT_EXTENSION).await?;
    if keys.is_empty() {
        return Err(EtlError::NoInputObjects {
            bucket: bucket.to_string(),
            pattern: format!("{INPUT_PREFIX}*{INPUT_EXTENSION}"),
        }
        .into());
    }

    let mut dataset = Dataset::default();
    for key in &keys {
        let bytes = store.get_object(bucket, key).await?;
        let before = dataset.len();
        if dataset.columns.is_empty() {
            dataset = parse_csv(Cursor::new(bytes))?;
        } else {
            let rows = parse_csv_rows(Cursor::new(bytes), dataset.columns.len())?;
            dataset.append_rows(rows);
        }
        info!(key = %key, rows = dataset.len() - before, "read input object");
    }

    Ok((dataset, keys.len()))
}

/// One full run: ingest, transform, emit, commit.
pub async fn run<S: ObjectStore + ?Sized>(store: &S, args: &JobArgs) -> Result<JobSummary> {
    let job = Job::init(args);

    let (dataset, input_objects) = ingest(store, &args.raw_bucket).await?;
    let records = transform(&dataset)?;

    let mut writer = CsvPartWriter::new(&args.processed_bucket, OUTPUT_PREFIX)?;
    for rec in &records {
        writer.write_record(rec)?;
    }
    let rows_written = writer.rows();
    let output_key = writer.finalize(store).await?;

    Ok(job.commit(input_objects, dataset.len(), rows_written, output_key))
}
