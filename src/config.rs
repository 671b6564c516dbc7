// Configuration for the trigger and the ETL job //

use std::collections::HashMap;

use anyhow::Result;

use crate::error::EtlError;

pub const INPUT_PREFIX: &str = "input/";
pub const INPUT_EXTENSION: &str = ".csv";
pub const OUTPUT_PREFIX: &str = "cleaned/";
pub const PART_FILE_NAME: &str = "part-00000.csv";
pub const SUCCESS_MARKER: &str = "_SUCCESS";
pub const AGE_THRESHOLD: i32 = 18;

pub const DEFAULT_JOB_NAME: &str = "daily-csv-processor-etl-job";
pub const JOB_NAME_ENV: &str = "GLUE_JOB_NAME";

const JOB_NAME_ARG: &str = "JOB_NAME";
const RAW_BUCKET_ARG: &str = "raw_bucket";
const PROCESSED_BUCKET_ARG: &str = "processed_bucket";
const JOB_RUN_ID_ARG: &str = "JOB_RUN_ID";

/// Options the platform passes to every run, resolved even when not asked for.
const PLATFORM_OPTIONS: [&str; 2] = [JOB_RUN_ID_ARG, "JOB_ID"];

/// Resolves `--KEY value` / `--KEY=value` pairs out of the job's argv.
///
/// Unknown options are skipped. The first required option that is absent
/// fails the whole resolution.
pub fn resolve_options(argv: &[String], required: &[&str]) -> Result<HashMap<String, String>> {
    let mut found: HashMap<String, String> = HashMap::new();
    let mut iter = argv.iter().peekable();

    while let Some(arg) = iter.next() {
        let Some(option) = arg.strip_prefix("--") else {
            continue;
        };

        let (key, value) = match option.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => {
                let value = match iter.peek() {
                    Some(next) if !next.starts_with("--") => iter.next().cloned().unwrap_or_default(),
                    _ => String::new(),
                };
                (option.to_string(), value)
            }
        };

        if required.contains(&key.as_str()) || PLATFORM_OPTIONS.contains(&key.as_str()) {
            found.insert(key, value);
        }
    }

    if let Some(missing) = required.iter().find(|k| !found.contains_key(**k)) {
        return Err(EtlError::MissingArgument(missing.to_string()).into());
    }

    Ok(found)
}

/// Arguments of one job run, fixed for its whole duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobArgs {
    pub job_name: String,
    pub raw_bucket: String,
    pub processed_bucket: String,
    pub run_id: Option<String>,
}

impl JobArgs {
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let mut opts = resolve_options(argv, &[JOB_NAME_ARG, RAW_BUCKET_ARG, PROCESSED_BUCKET_ARG])?;

        Ok(Self {
            job_name: opts.remove(JOB_NAME_ARG).unwrap_or_default(),
            raw_bucket: opts.remove(RAW_BUCKET_ARG).unwrap_or_default(),
            processed_bucket: opts.remove(PROCESSED_BUCKET_ARG).unwrap_or_default(),
            run_id: opts.remove(JOB_RUN_ID_ARG).filter(|s| !s.is_empty()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    pub job_name: String,
}

impl TriggerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let job_name = lookup(JOB_NAME_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_JOB_NAME.to_string());

        Self { job_name }
    }
}
