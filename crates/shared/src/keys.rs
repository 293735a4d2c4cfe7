/// Prefix shared by every generated blob key.
pub const BLOB_KEY_PREFIX: &str = "image_";

/// Extension shared by every generated blob key.
pub const BLOB_KEY_SUFFIX: &str = ".jpg";

/// Format the blob key for a photo taken at `epoch_millis`.
pub fn blob_key(epoch_millis: i64) -> String {
    format!("{}{}{}", BLOB_KEY_PREFIX, epoch_millis, BLOB_KEY_SUFFIX)
}

/// Keys and namespaces end up in URL paths and table prefixes, so they
/// must be non-empty, reasonably short and free of separators.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= 256
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && segment != "."
        && segment != ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_key_format() {
        assert_eq!(blob_key(1_700_000_000_123), "image_1700000000123.jpg");
    }

    #[test]
    fn test_valid_segments() {
        assert!(is_valid_segment("Map_Location"));
        assert!(is_valid_segment("image_1700000000123.jpg"));
        assert!(!is_valid_segment(""));
        assert!(!is_valid_segment("a/b"));
        assert!(!is_valid_segment(".."));
        assert!(!is_valid_segment("has space"));
    }
}
