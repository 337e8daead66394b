use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::{
    config::{Backend, Config},
    database::{MemoryRegistry, RedisRegistry, UserRegistry, init_redis},
    storage::{BlobStore, MemoryBlobStore, S3BlobStore},
    users::Users,
};

pub struct AppState {
    pub config: Config,
    pub users: Users,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let (registry, blobs): (Arc<dyn UserRegistry>, Arc<dyn BlobStore>) = match config.backend
        {
            Backend::Cloud => {
                let connection = init_redis(&config.redis_url)
                    .await
                    .with_context(|| format!("Failed to connect to Redis at {}", config.redis_url))?;
                info!(bucket = %config.dashboard_bucket, "Connected to Redis");

                let registry: Arc<dyn UserRegistry> = Arc::new(RedisRegistry::new(connection));
                let blobs: Arc<dyn BlobStore> = Arc::new(
                    S3BlobStore::new(&config.dashboard_bucket, config.s3_endpoint.as_deref()).await,
                );
                (registry, blobs)
            }
            Backend::Memory => {
                info!("Using in-memory user registry and blob store");

                let registry: Arc<dyn UserRegistry> = Arc::new(MemoryRegistry::default());
                let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::default());
                (registry, blobs)
            }
        };

        Ok(Arc::new(Self::with_backends(config, registry, blobs)))
    }

    pub fn with_backends(
        config: Config,
        registry: Arc<dyn UserRegistry>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            config,
            users: Users::new(registry),
            blobs,
        }
    }
}
