use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    database::{RegistryError, UserRegistry},
    error::AppError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub count: u32,
}

/// Users are keyed by their lower-cased name.
pub fn canonical(name: &str) -> String {
    name.to_lowercase()
}

#[derive(Clone)]
pub struct Users {
    registry: Arc<dyn UserRegistry>,
}

impl Users {
    pub fn new(registry: Arc<dyn UserRegistry>) -> Self {
        Self { registry }
    }

    pub async fn find_user(&self, name: &str) -> Result<Option<UserRecord>, AppError> {
        Ok(self.registry.get(&canonical(name)).await?)
    }

    pub async fn find_user_or_fail(
        &self,
        name: &str,
        route: &'static str,
    ) -> Result<UserRecord, AppError> {
        self.find_user(name)
            .await?
            .ok_or_else(|| AppError::UserNotFound {
                user: name.to_string(),
                route,
            })
    }

    /// Assigns the next count by scanning the whole registry.
    ///
    /// The caller must already know `name` is absent; nothing here re-checks it,
    /// and two concurrent calls can hand out the same count.
    pub async fn create_user(&self, name: &str) -> Result<UserRecord, AppError> {
        let existing = self.registry.all().await?;
        let highest = existing.iter().map(|user| user.count).max().unwrap_or(0);
        let count = highest
            .checked_add(1)
            .ok_or(RegistryError::CountOverflow(highest))?;

        let record = UserRecord {
            user_id: canonical(name),
            count,
        };
        self.registry.put(&record).await?;

        info!(user = %record.user_id, count, "Created user");
        Ok(record)
    }

    pub async fn create_user_if_absent(&self, name: &str) -> Result<(), AppError> {
        if self.find_user(name).await?.is_none() {
            self.create_user(name).await?;
        }

        Ok(())
    }

    /// Explicit registration, refusing names that are already taken.
    pub async fn add_user(&self, name: &str) -> Result<UserRecord, AppError> {
        if self.find_user(name).await?.is_some() {
            return Err(AppError::UserAlreadyExists(canonical(name)));
        }

        self.create_user(name).await
    }
}
