pub(super) fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

pub(super) fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn host_header_keeps_explicit_port() {
        let url = url::Url::parse("http://127.0.0.1:8080/api").unwrap();
        assert_eq!(host_header_value(&url).as_deref(), Some("127.0.0.1:8080"));

        let url = url::Url::parse("https://api.example.com/x").unwrap();
        assert_eq!(host_header_value(&url).as_deref(), Some("api.example.com"));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let headers = vec![("Content-Type".to_string(), "text/plain".to_string())];
        assert!(has_header(&headers, "content-type"));
        assert!(!has_header(&headers, "host"));
    }
}
