use serde::{Deserialize, Serialize};

/// Processing branch selected for an object
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// `image/*`
    Image,
    /// `text/*` and `application/json`
    Text,
    /// Anything else, including a missing content type
    Unsupported,
}

/// Map a MIME content type onto a processing branch
pub fn classify(content_type: Option<&str>) -> ProcessingMode {
    match content_type {
        Some(ct) if ct.starts_with("image/") => ProcessingMode::Image,
        Some(ct) if ct.starts_with("text/") || ct == "application/json" => ProcessingMode::Text,
        _ => ProcessingMode::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_images() {
        assert_eq!(classify(Some("image/png")), ProcessingMode::Image);
        assert_eq!(classify(Some("image/svg+xml")), ProcessingMode::Image);
        assert_eq!(classify(Some("image/")), ProcessingMode::Image);
    }

    #[test]
    fn test_classify_text() {
        assert_eq!(classify(Some("text/plain")), ProcessingMode::Text);
        assert_eq!(classify(Some("text/csv; charset=utf-8")), ProcessingMode::Text);
        assert_eq!(classify(Some("application/json")), ProcessingMode::Text);
    }

    #[test]
    fn test_classify_unsupported() {
        assert_eq!(classify(None), ProcessingMode::Unsupported);
        assert_eq!(classify(Some("")), ProcessingMode::Unsupported);
        assert_eq!(classify(Some("application/pdf")), ProcessingMode::Unsupported);
        // exact match only
        assert_eq!(
            classify(Some("application/json; charset=utf-8")),
            ProcessingMode::Unsupported
        );
        assert_eq!(classify(Some("IMAGE/PNG")), ProcessingMode::Unsupported);
    }
}
