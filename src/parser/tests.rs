//! Tests for the request parser.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use serde::Deserialize;

    use crate::parser::{HttpRequest, Method, HttpVersion, Error, parse_request};

    #[test]
    fn test_parse_simple_get_request() {
        let request = b"GET /subject/42 HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.method, Method::GET);
        assert_eq!(result.path, "/subject/42");
        assert_eq!(result.query, None);
        assert_eq!(result.version, HttpVersion::Http11);
        assert_eq!(result.get_header("host").unwrap(), "example.com");
        assert!(result.body.is_empty());
    }

    #[test]
    fn test_query_string_is_split_from_path() {
        let request = b"GET /subject/list/all?page=2&flag HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.path, "/subject/list/all");
        assert_eq!(result.query.as_deref(), Some("page=2&flag"));
        assert_eq!(result.query_param("page"), Some("2"));
        assert_eq!(result.query_param("flag"), Some(""));
        assert_eq!(result.query_param("missing"), None);
    }

    #[test]
    fn test_query_params_are_decoded() {
        let request = b"GET /subject/hello%20world?q=a%20b&name=linear+algebra&sort=asc&sort=desc HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.path, "/subject/hello%20world");
        assert_eq!(result.query_param("q"), Some("a b"));
        assert_eq!(result.query_param("name"), Some("linear algebra"));
        assert_eq!(result.query_param("sort"), Some("desc"));
    }

    #[test]
    fn test_lowercase_method_is_accepted() {
        let request = b"delete /subject/1 HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.method, Method::DELETE);
    }

    #[test]
    fn test_missing_host_header() {
        let request = b"GET /index.html HTTP/1.1\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::MissingHeader(ref h)) if h == "Host"));
    }

    #[test]
    fn test_http10_without_host() {
        let request = b"GET /index.html HTTP/1.0\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.version, HttpVersion::Http10);
        assert!(result.headers.is_empty());
    }

    #[test]
    fn test_invalid_method() {
        let request = b"BREW /pot HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::InvalidMethod(ref m)) if m == "BREW"));
    }

    #[test]
    fn test_invalid_http_version() {
        let request = b"GET /index.html HTTP/9.9\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::InvalidVersion(ref v)) if v == "HTTP/9.9"));
    }

    #[test]
    fn test_absolute_target_is_rejected() {
        let request = b"GET http://example.com/ HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::InvalidTarget(_))));
    }

    #[test]
    fn test_invalid_header_format() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nNoColonHere\r\n\r\n";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::InvalidHeaderFormat(ref line)) if line == "NoColonHere"));
    }

    #[test]
    fn test_empty_request() {
        assert!(matches!(parse_request(b""), Err(Error::EmptyRequest)));
        assert!(matches!(parse_request(b"\r\n\r\n"), Err(Error::EmptyRequest)));
    }

    #[test]
    fn test_incomplete_request_line() {
        let result = parse_request(b"GET\r\n");
        assert!(matches!(result, Err(Error::MalformedRequestLine(_))));
    }

    #[test]
    fn test_invalid_utf8_in_head() {
        let request = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nX-Test: \xFF\xFF\r\n\r\n";
        assert!(matches!(parse_request(request), Err(Error::InvalidEncoding)));
    }

    #[test]
    fn test_body_bounded_by_content_length() {
        let request = b"PUT /subject/7 HTTP/1.1\r\nHost: example.com\r\nContent-Length: 5\r\n\r\nhello world";
        let result = parse_request(request).unwrap();
        assert_eq!(result.body, b"hello");
    }

    #[test]
    fn test_body_shorter_than_content_length() {
        let request = b"PUT /subject/7 HTTP/1.1\r\nHost: example.com\r\nContent-Length: 50\r\n\r\nshort";
        let result = parse_request(request);
        assert!(matches!(result, Err(Error::IncompleteBody { expected: 50, actual: 5 })));
    }

    #[test]
    fn test_invalid_content_length() {
        let request = b"POST /subject HTTP/1.1\r\nHost: example.com\r\nContent-Length: lots\r\n\r\n";
        assert!(matches!(parse_request(request), Err(Error::InvalidContentLength(_))));
    }

    #[test]
    fn test_duplicate_headers_keep_last_value() {
        let request = b"GET / HTTP/1.1\r\nHost: example.com\r\nX-Test: value1\r\nX-Test: value2\r\n\r\n";
        let result = parse_request(request).unwrap();
        assert_eq!(result.get_header("x-test").unwrap(), "value2");
    }

    #[test]
    fn test_method_and_version_display() {
        assert_eq!(Method::PATCH.to_string(), "PATCH");
        assert_eq!(Method::OPTIONS.as_str(), "OPTIONS");
        assert_eq!(HttpVersion::Http20.to_string(), "HTTP/2");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Subject {
        name: String,
    }

    #[test]
    fn test_json_body() {
        let request = b"POST /subject HTTP/1.1\r\nHost: example.com\r\nContent-Type: application/json\r\nContent-Length: 15\r\n\r\n{\"name\":\"math\"}";
        let result = parse_request(request).unwrap();
        let subject: Subject = result.json().unwrap();
        assert_eq!(subject, Subject { name: "math".to_string() });
    }

    #[test]
    fn test_json_requires_content_type() {
        let mut headers = HashMap::new();
        headers.insert("Host".to_string(), "example.com".to_string());
        let request = HttpRequest::with_body(Method::POST, "/subject", HttpVersion::Http11, headers, b"{}".to_vec());
        let result: Result<Subject, _> = request.json();
        assert!(matches!(result, Err(Error::MissingHeader(_))));
    }
}
