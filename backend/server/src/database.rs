//! # Redis
//!
//! User registry.
//!
//! Core purpose is to map a canonical user name to the sequence number that
//! names the user's dashboard folder.
//!
//! ## Implementation
//!
//! - Redis hash: 1 big key (`users`), then user name to count pairs
//! - `HGET` for lookups, `HGETALL` for the scan that assigns the next count
//! - Records are written once and never updated or removed
//!
//! ## Notes
//!
//! Assigning `max + 1` from a full scan is not atomic. Two registrations
//! racing each other can read the same maximum and get the same count, which
//! puts both users in the same folder. `HINCRBY` on a counter field would fix
//! this but changes which numbers get handed out, so the scan stays.
use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::users::UserRecord;

pub const USERS_KEY: &str = "users";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("No user count left after {0}")]
    CountOverflow(u32),
}

/// Key-value store holding one record per registered user, keyed by canonical name.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, RegistryError>;

    /// Every record in the registry.
    async fn all(&self) -> Result<Vec<UserRecord>, RegistryError>;

    async fn put(&self, record: &UserRecord) -> Result<(), RegistryError>;
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RegistryError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(500));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    Ok(connection_manager)
}

#[derive(Clone)]
pub struct RedisRegistry {
    connection: ConnectionManager,
}

impl RedisRegistry {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl UserRegistry for RedisRegistry {
    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, RegistryError> {
        let mut connection = self.connection.clone();
        let count: Option<u32> = connection.hget(USERS_KEY, user_id).await?;

        Ok(count.map(|count| UserRecord {
            user_id: user_id.to_string(),
            count,
        }))
    }

    async fn all(&self) -> Result<Vec<UserRecord>, RegistryError> {
        let mut connection = self.connection.clone();
        let users: HashMap<String, u32> = connection.hgetall(USERS_KEY).await?;

        Ok(users
            .into_iter()
            .map(|(user_id, count)| UserRecord { user_id, count })
            .collect())
    }

    async fn put(&self, record: &UserRecord) -> Result<(), RegistryError> {
        let mut connection = self.connection.clone();
        let _: () = connection
            .hset(USERS_KEY, &record.user_id, record.count)
            .await?;

        Ok(())
    }
}

/// In-process registry for local runs and tests.
#[derive(Default)]
pub struct MemoryRegistry {
    users: RwLock<HashMap<String, u32>>,
}

#[async_trait]
impl UserRegistry for MemoryRegistry {
    async fn get(&self, user_id: &str) -> Result<Option<UserRecord>, RegistryError> {
        Ok(self.users.read().await.get(user_id).map(|&count| UserRecord {
            user_id: user_id.to_string(),
            count,
        }))
    }

    async fn all(&self) -> Result<Vec<UserRecord>, RegistryError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .map(|(user_id, &count)| UserRecord {
                user_id: user_id.clone(),
                count,
            })
            .collect())
    }

    async fn put(&self, record: &UserRecord) -> Result<(), RegistryError> {
        self.users
            .write()
            .await
            .insert(record.user_id.clone(), record.count);

        Ok(())
    }
}
