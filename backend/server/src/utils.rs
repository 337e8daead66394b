use axum::{
    body::Bytes,
    http::{HeaderMap, header::CONTENT_TYPE},
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;

#[derive(Deserialize)]
pub struct PublishPayload {
    pub name: Option<String>,
    pub dashboard: Option<Value>,
    pub user: Option<String>,
    pub studio_secret: Option<String>,
}

/// Validated body of a publish request.
pub struct PublishRequest {
    pub name: String,
    pub dashboard: Value,
    pub user: Option<String>,
    pub studio_secret: Option<String>,
}

pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

/// Empty values count as absent, the way a blank form field or `?name=` does.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Checks the content type before touching the body, then requires `name` and `dashboard`.
pub fn get_publish_request(
    route: &'static str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<PublishRequest, AppError> {
    if !is_json_content_type(headers) {
        return Err(AppError::invalid_request(format!(
            "{route} requires a JSON body with fields name and dashboard"
        )));
    }

    let payload: PublishPayload = serde_json::from_slice(&body)?;
    let name = payload.name.filter(|name| !name.is_empty());
    let user = payload.user.filter(|user| !user.is_empty());

    match (name, payload.dashboard) {
        (Some(name), Some(dashboard)) => Ok(PublishRequest {
            name,
            dashboard,
            user,
            studio_secret: payload.studio_secret,
        }),
        (name, dashboard) => {
            let mut fields = Vec::new();
            if name.is_none() {
                fields.push("name");
            }
            if dashboard.is_none() {
                fields.push("dashboard");
            }

            Err(AppError::MissingField { route, fields })
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const ROUTE: &str = "/add_dashboard";

    fn json_headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_content_type() {
        assert!(is_json_content_type(&json_headers("application/json")));
        assert!(is_json_content_type(&json_headers("application/json; charset=utf-8")));
        assert!(!is_json_content_type(&json_headers("text/plain")));
        assert!(!is_json_content_type(&HeaderMap::new()));
    }

    #[test]
    fn test_rejects_non_json_before_parsing() {
        let result = get_publish_request(ROUTE, &json_headers("text/plain"), Bytes::from("not json"));
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn test_reports_every_missing_field() {
        let body = Bytes::from(r#"{"user": "alice"}"#);
        match get_publish_request(ROUTE, &json_headers("application/json"), body) {
            Err(AppError::MissingField { fields, .. }) => assert_eq!(fields, vec!["name", "dashboard"]),
            _ => panic!("expected MissingField"),
        }

        let body = Bytes::from(r#"{"name": "c", "dashboard": null}"#);
        match get_publish_request(ROUTE, &json_headers("application/json"), body) {
            Err(AppError::MissingField { fields, .. }) => assert_eq!(fields, vec!["dashboard"]),
            _ => panic!("expected MissingField"),
        }
    }

    #[test]
    fn test_empty_strings_count_as_absent() {
        let body = Bytes::from(r#"{"name": "", "dashboard": {}}"#);
        match get_publish_request(ROUTE, &json_headers("application/json"), body) {
            Err(AppError::MissingField { fields, .. }) => assert_eq!(fields, vec!["name"]),
            _ => panic!("expected MissingField"),
        }

        let body = Bytes::from(r#"{"user": "", "name": "c", "dashboard": {}}"#);
        let request = get_publish_request(ROUTE, &json_headers("application/json"), body).unwrap();
        assert_eq!(request.user, None);

        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(Some("alice")), Some("alice"));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_valid_request() {
        let body = Bytes::from(r#"{"name": "c", "dashboard": {"tables": []}, "studio_secret": "x"}"#);
        let request = get_publish_request(ROUTE, &json_headers("application/json"), body).unwrap();

        assert_eq!(request.name, "c");
        assert_eq!(request.dashboard, serde_json::json!({"tables": []}));
        assert_eq!(request.user, None);
        assert_eq!(request.studio_secret.as_deref(), Some("x"));
    }

    #[test]
    fn test_malformed_json() {
        let body = Bytes::from("{");
        assert!(matches!(
            get_publish_request(ROUTE, &json_headers("application/json"), body),
            Err(AppError::Json(_))
        ));
    }
}
