//! URL path extraction.

/// Extract the path component of a URL, dropping scheme, host, query, and
/// fragment. An empty or host-only URL yields `/`.
pub fn extract_url_path(url: &str) -> String {
    let stripped = url.split(['?', '#']).next().unwrap_or("");

    let path = if let Some(idx) = stripped.find("://") {
        let rest = &stripped[idx + 3..];
        match rest.find('/') {
            Some(slash) => &rest[slash..],
            None => "/",
        }
    } else if stripped.starts_with('/') {
        stripped
    } else {
        // Schemaless host[/path] form.
        match stripped.find('/') {
            Some(slash) => &stripped[slash..],
            None => "/",
        }
    };

    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
