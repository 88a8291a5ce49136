use url::Url;

/// Canonicalizes a URL to `scheme://host` so equivalent links dedup together.
///
/// A leading `www.` is stripped and a bare host gets `https://` prepended.
/// Anything without a usable http(s) host yields `None`.
#[must_use]
pub fn normalize_link(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        // "example.com:8080/path" parses with the hostname as its scheme;
        // the dot distinguishes that from real non-web schemes like mailto.
        Ok(url) if url.cannot_be_a_base() && url.scheme().contains('.') => {
            Url::parse(&format!("https://{}", trimmed)).ok()?
        }
        Ok(_) => return None,
        // Bare hosts ("example.com", "example.com/cennik") are relative URLs.
        Err(_) => Url::parse(&format!("https://{}", trimmed)).ok()?,
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    if host.is_empty() {
        return None;
    }

    Some(format!("{}://{}", parsed.scheme(), host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_path_and_query() {
        assert_eq!(
            normalize_link("https://example.com/wp-content/uploads?x=1").as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn test_strips_www_prefix() {
        assert_eq!(
            normalize_link("https://www.example.com/about").as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn test_preserves_http_scheme() {
        assert_eq!(
            normalize_link("http://www.example.pl/kontakt").as_deref(),
            Some("http://example.pl")
        );
    }

    #[test]
    fn test_bare_host_gets_https() {
        assert_eq!(
            normalize_link("example.com").as_deref(),
            Some("https://example.com")
        );
        assert_eq!(
            normalize_link("example.com/cennik").as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(normalize_link(""), None);
        assert_eq!(normalize_link("   "), None);
        assert_eq!(normalize_link("mailto:kontakt@example.com"), None);
        assert_eq!(normalize_link("ftp://example.com/file"), None);
    }
}
