//! # Paths
//!
//! Where dashboards live in the blob store and how they are addressed publicly.
//!
//! - Registered user: `dashboards/<count>/<name>`
//! - Anonymous or unknown user: `dashboards/0/<name>`
//!
//! Dashboard names go into paths verbatim. A name like `../3/chart` lands
//! outside the caller's folder; nothing here rejects it.
use crate::{error::AppError, users::Users};

pub const DASHBOARD_ROOT: &str = "dashboards";
pub const ANONYMOUS_PREFIX: &str = "dashboards/0";

/// Hubs that get the beta build of the studio.
pub const BETA_HUBS: [&str; 2] = ["localhost", "galyleo-beta"];

pub fn folder_prefix(count: u32) -> String {
    format!("{DASHBOARD_ROOT}/{count}")
}

pub async fn folder_prefix_for(
    users: &Users,
    name: &str,
    route: &'static str,
) -> Result<String, AppError> {
    let record = users.find_user_or_fail(name, route).await?;

    Ok(folder_prefix(record.count))
}

/// Falls back to the anonymous folder when `name` is absent or not registered.
pub async fn folder_prefix_or_default(
    users: &Users,
    name: Option<&str>,
) -> Result<String, AppError> {
    let Some(name) = name else {
        return Ok(ANONYMOUS_PREFIX.to_string());
    };

    Ok(match users.find_user(name).await? {
        Some(record) => folder_prefix(record.count),
        None => ANONYMOUS_PREFIX.to_string(),
    })
}

pub fn dashboard_path(prefix: &str, name: &str) -> String {
    format!("{prefix}/{name}")
}

pub fn public_url(base: &str, path: &str) -> String {
    format!("{base}/{path}")
}

pub fn studio_url(base: &str, hub: Option<&str>, language: Option<&str>) -> String {
    let suffix = match language {
        Some(language) if language.starts_with("ja") => "jp",
        _ => "en",
    };

    let middle = match hub {
        Some(hub) if !BETA_HUBS.contains(&hub) => "studio",
        _ => "studio-beta",
    };

    format!("{base}/{middle}-{suffix}/index.html")
}
