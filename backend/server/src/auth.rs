/// True only when a secret is configured and the candidate matches it exactly.
///
/// Plain string equality, so the comparison time depends on the input.
pub fn is_valid_secret(configured: Option<&str>, candidate: Option<&str>) -> bool {
    matches!((configured, candidate), (Some(configured), Some(candidate)) if configured == candidate)
}

#[cfg(test)]
mod tests {
    use super::is_valid_secret;

    #[test]
    fn test_matching_secret() {
        assert!(is_valid_secret(Some("s3cret"), Some("s3cret")));
    }

    #[test]
    fn test_mismatch() {
        assert!(!is_valid_secret(Some("s3cret"), Some("S3CRET")));
        assert!(!is_valid_secret(Some("s3cret"), Some("s3cret ")));
    }

    #[test]
    fn test_absent_sides() {
        assert!(!is_valid_secret(None, Some("s3cret")));
        assert!(!is_valid_secret(Some("s3cret"), None));
        assert!(!is_valid_secret(None, None));
    }
}
