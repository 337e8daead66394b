//! # Dashboards
//!
//! Publishing, listing, locating, reading and deleting dashboard documents.
//!
//! ## Publishing
//!
//! - A request carrying the studio secret and a user name registers that user
//!   on the fly if needed, so the dashboard lands in the user's own folder
//! - Without a valid secret an unknown user publishes into `dashboards/0`
//! - Writes always overwrite, there is no versioning
//! - Two publishes to the same path race, last write wins
use serde_json::Value;
use tracing::info;

use crate::{
    auth::is_valid_secret,
    error::AppError,
    paths::{dashboard_path, folder_prefix_for, folder_prefix_or_default, public_url},
    state::AppState,
    utils::non_empty,
};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Names of the dashboards in `user`'s folder, unordered.
pub async fn list_dashboards(state: &AppState, user: &str) -> Result<Vec<String>, AppError> {
    let prefix = folder_prefix_or_default(&state.users, Some(user)).await?;
    let folder = format!("{prefix}/");

    Ok(state
        .blobs
        .list(&folder)
        .await?
        .iter()
        .filter_map(|blob| blob.strip_prefix(&folder))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect())
}

/// Stores `document` and returns its public URL.
pub async fn publish_dashboard(
    state: &AppState,
    user: Option<&str>,
    name: &str,
    document: &Value,
    secret: Option<&str>,
) -> Result<String, AppError> {
    let user = non_empty(user);
    if let Some(user) = user {
        if is_valid_secret(state.config.studio_secret.as_deref(), secret) {
            state.users.create_user_if_absent(user).await?;
        }
    }

    let prefix = folder_prefix_or_default(&state.users, user).await?;
    let path = dashboard_path(&prefix, name);
    let body = serde_json::to_vec(document)?;

    state.blobs.put(&path, body, JSON_CONTENT_TYPE).await?;
    info!(path = %path, "Published dashboard");

    Ok(public_url(&state.config.public_base_url, &path))
}

pub async fn resolve_dashboard_location(
    state: &AppState,
    user: Option<&str>,
    name: Option<&str>,
    route: &'static str,
) -> Result<String, AppError> {
    let name = non_empty(name).ok_or(AppError::MissingParameter {
        route,
        parameter: "name",
    })?;
    let prefix = folder_prefix_or_default(&state.users, non_empty(user)).await?;

    Ok(dashboard_path(&prefix, name))
}

pub async fn dashboard_url(
    state: &AppState,
    user: Option<&str>,
    name: Option<&str>,
    route: &'static str,
) -> Result<String, AppError> {
    let path = resolve_dashboard_location(state, user, name, route).await?;

    Ok(public_url(&state.config.public_base_url, &path))
}

pub async fn read_dashboard(
    state: &AppState,
    user: Option<&str>,
    name: Option<&str>,
    route: &'static str,
) -> Result<Value, AppError> {
    let path = resolve_dashboard_location(state, user, name, route).await?;
    let Some(body) = state.blobs.get(&path).await? else {
        return Err(AppError::DashboardNotFound(path));
    };

    Ok(serde_json::from_slice(&body)?)
}

/// Removes a dashboard and returns its name.
///
/// A named user must be registered. Without a user the anonymous folder is used.
pub async fn delete_dashboard(
    state: &AppState,
    user: Option<&str>,
    name: Option<&str>,
    route: &'static str,
) -> Result<String, AppError> {
    let name = non_empty(name).ok_or(AppError::MissingParameter {
        route,
        parameter: "name",
    })?;

    let prefix = match non_empty(user) {
        Some(user) => folder_prefix_for(&state.users, user, route).await?,
        None => folder_prefix_or_default(&state.users, None).await?,
    };
    let path = dashboard_path(&prefix, name);

    if !state.blobs.exists(&path).await? {
        return Err(AppError::DashboardNotFound(path));
    }

    state.blobs.delete(&path).await?;
    info!(path = %path, "Deleted dashboard");

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        config::Config,
        database::MemoryRegistry,
        storage::{BlobStore, MemoryBlobStore},
    };

    const SECRET: &str = "studio-s3cret";
    const ROUTE: &str = "/test";

    fn state() -> (AppState, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::default());
        let state = AppState::with_backends(
            Config::memory(Some(SECRET)),
            Arc::new(MemoryRegistry::default()),
            blobs.clone(),
        );
        (state, blobs)
    }

    async fn register(state: &AppState, names: &[&str]) {
        for name in names {
            state.users.add_user(name).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_publish_then_list() {
        let (state, blobs) = state();
        register(&state, &["carol", "dave", "alice"]).await;

        let url = publish_dashboard(&state, Some("alice"), "chart1", &json!({"a": 1}), None)
            .await
            .unwrap();

        assert_eq!(url, "https://galyleo.app/dashboards/3/chart1");
        assert_eq!(list_dashboards(&state, "alice").await.unwrap(), vec!["chart1"]);
        assert_eq!(
            blobs.content_type("dashboards/3/chart1").await.as_deref(),
            Some(JSON_CONTENT_TYPE)
        );
    }

    #[tokio::test]
    async fn test_list_skips_folder_marker_and_other_folders() {
        let (state, blobs) = state();
        register(&state, &["alice"]).await;

        for path in ["dashboards/1", "dashboards/1/", "dashboards/1/x", "dashboards/10/y"] {
            blobs.put(path, b"{}".to_vec(), JSON_CONTENT_TYPE).await.unwrap();
        }

        assert_eq!(list_dashboards(&state, "alice").await.unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_unknown_user_lists_anonymous_folder() {
        let (state, _) = state();
        publish_dashboard(&state, None, "shared", &json!([]), None)
            .await
            .unwrap();

        assert_eq!(list_dashboards(&state, "ghost").await.unwrap(), vec!["shared"]);
    }

    #[tokio::test]
    async fn test_publish_overwrites() {
        let (state, _) = state();
        publish_dashboard(&state, None, "d", &json!({"v": 1}), None)
            .await
            .unwrap();
        publish_dashboard(&state, None, "d", &json!({"v": 2}), None)
            .await
            .unwrap();

        let document = read_dashboard(&state, None, Some("d"), ROUTE).await.unwrap();
        assert_eq!(document, json!({"v": 2}));
    }

    #[tokio::test]
    async fn test_correct_secret_provisions_user() {
        let (state, _) = state();
        register(&state, &["alice"]).await;

        let url = publish_dashboard(&state, Some("Bob"), "c", &json!({}), Some(SECRET))
            .await
            .unwrap();

        let bob = state.users.find_user("bob").await.unwrap().unwrap();
        assert_eq!(bob.count, 2);
        assert_eq!(url, "https://galyleo.app/dashboards/2/c");
    }

    #[tokio::test]
    async fn test_wrong_secret_publishes_anonymously() {
        let (state, _) = state();

        let url = publish_dashboard(&state, Some("bob"), "c", &json!({}), Some("guess"))
            .await
            .unwrap();

        assert_eq!(state.users.find_user("bob").await.unwrap(), None);
        assert_eq!(url, "https://galyleo.app/dashboards/0/c");
    }

    #[tokio::test]
    async fn test_unconfigured_secret_never_provisions() {
        let state = AppState::with_backends(
            Config::memory(None),
            Arc::new(MemoryRegistry::default()),
            Arc::new(MemoryBlobStore::default()),
        );

        publish_dashboard(&state, Some("bob"), "c", &json!({}), Some(SECRET))
            .await
            .unwrap();

        assert_eq!(state.users.find_user("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_user_is_anonymous() {
        let (state, _) = state();

        let url = publish_dashboard(&state, Some(""), "c", &json!({}), Some(SECRET))
            .await
            .unwrap();

        assert_eq!(url, "https://galyleo.app/dashboards/0/c");
        assert_eq!(state.users.find_user("").await.unwrap(), None);
        assert_eq!(
            delete_dashboard(&state, Some(""), Some("c"), ROUTE).await.unwrap(),
            "c"
        );
    }

    #[tokio::test]
    async fn test_empty_name_is_missing() {
        let (state, _) = state();

        assert!(matches!(
            resolve_dashboard_location(&state, None, Some(""), ROUTE).await,
            Err(AppError::MissingParameter { parameter: "name", .. })
        ));
        assert!(matches!(
            delete_dashboard(&state, None, Some(""), ROUTE).await,
            Err(AppError::MissingParameter { parameter: "name", .. })
        ));
    }

    #[tokio::test]
    async fn test_location_and_url() {
        let (state, _) = state();
        register(&state, &["alice"]).await;

        assert_eq!(
            resolve_dashboard_location(&state, Some("alice"), Some("c"), ROUTE)
                .await
                .unwrap(),
            "dashboards/1/c"
        );
        assert_eq!(
            dashboard_url(&state, None, Some("c"), ROUTE).await.unwrap(),
            "https://galyleo.app/dashboards/0/c"
        );
        assert!(matches!(
            dashboard_url(&state, Some("alice"), None, ROUTE).await,
            Err(AppError::MissingParameter { parameter: "name", .. })
        ));
    }

    #[tokio::test]
    async fn test_read_missing_dashboard() {
        let (state, _) = state();

        assert!(matches!(
            read_dashboard(&state, None, Some("nope"), ROUTE).await,
            Err(AppError::DashboardNotFound(path)) if path == "dashboards/0/nope"
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let (state, blobs) = state();
        register(&state, &["alice"]).await;
        publish_dashboard(&state, Some("alice"), "c", &json!({}), None)
            .await
            .unwrap();

        let deleted = delete_dashboard(&state, Some("alice"), Some("c"), ROUTE)
            .await
            .unwrap();
        assert_eq!(deleted, "c");
        assert!(blobs.is_empty().await);

        assert!(matches!(
            delete_dashboard(&state, Some("alice"), Some("c"), ROUTE).await,
            Err(AppError::DashboardNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_requires_known_user() {
        let (state, _) = state();
        publish_dashboard(&state, None, "c", &json!({}), None)
            .await
            .unwrap();

        assert!(matches!(
            delete_dashboard(&state, Some("ghost"), Some("c"), ROUTE).await,
            Err(AppError::UserNotFound { .. })
        ));
        assert_eq!(
            delete_dashboard(&state, None, Some("c"), ROUTE).await.unwrap(),
            "c"
        );
    }
}
