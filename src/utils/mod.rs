//! Utility functions and helpers.

pub mod http;

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(
            normalize_whitespace("  開場 17:00\n\t開演  18:00 "),
            "開場 17:00 開演 18:00"
        );
        assert_eq!(normalize_whitespace(""), "");
    }
}
