use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_glue::error::DisplayErrorContext;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::{primitives::ByteStream, Client};

use crate::error::EtlError;
use crate::handler::JobOrchestrator;
use crate::store::ObjectStore;

// DeleteObjects accepts at most this many keys per request
const DELETE_BATCH: usize = 1000;

pub async fn make_s3_client() -> Client {
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    Client::new(&config)
}

pub async fn make_glue_client() -> aws_sdk_glue::Client {
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    aws_sdk_glue::Client::new(&config)
}

#[async_trait]
impl ObjectStore for Client {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut pages = self
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(|s| s.to_string())),
            );
        }

        Ok(keys)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let resp = self.get_object().bucket(bucket).key(key).send().await?;
        let collected = resp.body.collect().await?;
        Ok(collected.into_bytes().to_vec())
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()> {
        self.put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await?;

        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        for batch in keys.chunks(DELETE_BATCH) {
            let ids = batch
                .iter()
                .map(|k| ObjectIdentifier::builder().key(k).build())
                .collect::<Result<Vec<_>, _>>()?;
            let delete = Delete::builder().set_objects(Some(ids)).quiet(true).build()?;

            self.delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl JobOrchestrator for aws_sdk_glue::Client {
    async fn start_run(&self, job_name: &str) -> Result<String> {
        let out = self
            .start_job_run()
            .job_name(job_name)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        out.job_run_id()
            .map(|id| id.to_string())
            .ok_or_else(|| EtlError::MissingRunId.into())
    }
}
