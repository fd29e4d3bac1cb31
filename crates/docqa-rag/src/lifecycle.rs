//! Index provisioning against the active embedding schema

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use docqa_core::{
    Error, IndexAdmin, IndexConfig, IndexDescriptor, IndexSchema, ReadinessState, Result,
};

/// Makes sure the named index exists with the required shape and is queryable
///
/// An index whose dimensionality or metric disagrees with the schema is
/// deleted and recreated, which discards every vector it held. A matching
/// index is left alone.
pub struct IndexLifecycleManager<A: IndexAdmin> {
    admin: Arc<A>,
    poll_interval: Duration,
    max_poll_interval: Duration,
    max_wait: Duration,
}

impl<A: IndexAdmin> IndexLifecycleManager<A> {
    pub fn new(admin: Arc<A>, config: &IndexConfig) -> Self {
        Self {
            admin,
            poll_interval: config.poll_interval,
            max_poll_interval: config.max_poll_interval.max(config.poll_interval),
            max_wait: config.max_wait,
        }
    }

    pub fn admin(&self) -> &Arc<A> {
        &self.admin
    }

    /// Provision `schema` if needed and wait until it is ready
    pub async fn ensure(&self, schema: &IndexSchema) -> Result<IndexDescriptor> {
        let existing = self
            .admin
            .list_indexes()
            .await?
            .into_iter()
            .find(|d| d.name == schema.name);

        match existing {
            Some(descriptor) if descriptor.matches(schema) => {
                debug!(index = %schema.name, "index already matches schema");
            }
            Some(descriptor) => {
                warn!(
                    index = %schema.name,
                    existing_dimensionality = descriptor.dimensionality,
                    existing_metric = %descriptor.distance_metric,
                    required_dimensionality = schema.dimensionality,
                    required_metric = %schema.distance_metric,
                    "index schema mismatch, recreating (stored vectors are discarded)"
                );
                self.admin.delete_index(&schema.name).await?;
                self.admin.create_index(schema).await?;
            }
            None => {
                info!(
                    index = %schema.name,
                    dimensionality = schema.dimensionality,
                    metric = %schema.distance_metric,
                    "creating index"
                );
                self.admin.create_index(schema).await?;
            }
        }

        self.wait_until_ready(schema).await
    }

    /// Drop and recreate the index so it holds no vectors, then wait for it
    pub async fn reset(&self, schema: &IndexSchema) -> Result<IndexDescriptor> {
        warn!(index = %schema.name, "clearing index before re-ingestion");
        self.admin.delete_index(&schema.name).await?;
        self.admin.create_index(schema).await?;
        self.wait_until_ready(schema).await
    }

    async fn wait_until_ready(&self, schema: &IndexSchema) -> Result<IndexDescriptor> {
        let started = Instant::now();
        let mut delay = self.poll_interval;

        loop {
            match self.admin.describe_index(&schema.name).await? {
                Some(descriptor) if descriptor.is_ready() => {
                    if !descriptor.matches(schema) {
                        return Err(Error::DimensionMismatch {
                            expected: schema.dimensionality,
                            actual: descriptor.dimensionality,
                        });
                    }
                    info!(index = %schema.name, "index ready");
                    return Ok(descriptor);
                }
                Some(descriptor) if descriptor.readiness_state == ReadinessState::Failed => {
                    return Err(Error::VectorStore(format!(
                        "Index '{}' reported a failed state",
                        schema.name
                    )));
                }
                _ => debug!(index = %schema.name, ?delay, "index not ready yet"),
            }

            let waited = started.elapsed();
            if waited >= self.max_wait {
                return Err(Error::IndexProvisioningTimeout {
                    name: schema.name.clone(),
                    waited,
                });
            }

            sleep(delay.min(self.max_wait - waited)).await;
            delay = (delay * 2).min(self.max_poll_interval);
        }
    }
}
