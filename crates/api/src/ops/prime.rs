//! Fill the vector index pool once (`kbase prime`).

use std::sync::Arc;

use anyhow::Context;
use kbase_cloud::{AwsConfig, AwsServices};
use kbase_db::PoolConfig;

use crate::config::ServerConfig;
use crate::provisioner::Provisioner;

pub async fn run(config: &ServerConfig, database_url: &str) -> anyhow::Result<()> {
    let pool = kbase_db::create_pool(database_url, &PoolConfig::from_env())
        .await
        .context("failed to connect to the database")?;
    let aws = AwsConfig::from_env().context("invalid AWS configuration")?;
    let services = AwsServices::connect(&aws).await;

    let provisioner = Provisioner::new(
        pool,
        Arc::new(services.vector_store),
        aws.vector_bucket_arn.clone(),
        config.provisioner.clone(),
    );

    let created = provisioner
        .reconcile()
        .await
        .context("index pool priming failed")?;
    tracing::info!(created, "Index pool primed");
    Ok(())
}
