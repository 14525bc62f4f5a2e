//! Raw response-header parsing
//!
//! Transports hand over header text as one raw block; the cache stores an
//! ordered name/value list so header-dependent logic downstream keeps
//! working against cached responses.

/// Parse raw header text into an ordered name/value list.
///
/// Lines are split on `\r\n` or `\n` with a trailing empty line dropped,
/// each line is split on its first colon, and the value is trimmed. Lines
/// without a colon are dropped.
pub fn parse_raw_headers(raw: &str) -> Vec<(String, String)> {
    raw.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.to_string(), value.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crlf_headers_preserves_order() {
        let raw = "Content-Type: application/dicom\r\nContent-Length: 1024\r\nETag: \"abc\"\r\n";
        let headers = parse_raw_headers(raw);
        assert_eq!(
            headers,
            vec![
                ("Content-Type".to_string(), "application/dicom".to_string()),
                ("Content-Length".to_string(), "1024".to_string()),
                ("ETag".to_string(), "\"abc\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_splits_on_first_colon_only() {
        let headers = parse_raw_headers("Date: Wed, 21 Oct 2015 07:28:00 GMT\r\n");
        assert_eq!(
            headers,
            vec![("Date".to_string(), "Wed, 21 Oct 2015 07:28:00 GMT".to_string())]
        );
    }

    #[test]
    fn test_parse_trims_values() {
        let headers = parse_raw_headers("Content-Type:   application/dicom  \n");
        assert_eq!(headers[0].1, "application/dicom");
    }

    #[test]
    fn test_parse_drops_lines_without_colon() {
        let headers = parse_raw_headers("Content-Type: a\r\nnot-a-header\r\n\r\n");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_raw_headers("").is_empty());
        assert!(parse_raw_headers("\r\n").is_empty());
    }

    #[test]
    fn test_parse_plain_newlines() {
        let headers = parse_raw_headers("A: 1\nB: 2\n");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[1], ("B".to_string(), "2".to_string()));
    }
}
