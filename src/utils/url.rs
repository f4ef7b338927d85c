//! Endpoint URL joining.
//!
//! Deployments disagree on trailing and leading slashes (`/api/chat/` vs
//! `api/chat`), so every endpoint is built through [`construct_api_url`].

/// Strip trailing slashes from a base URL.
///
/// ```
/// use docent::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000///"), "http://localhost:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash between them.
///
/// Trailing slashes on the endpoint are kept; some backends route
/// `/api/chat/` and `/api/chat` differently.
///
/// ```
/// use docent::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/api/chat/"),
///     "http://localhost:8000/api/chat/"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim().trim_start_matches('/');
    if endpoint.is_empty() {
        return normalized_base;
    }
    format!("{normalized_base}/{endpoint}")
}

/// Whether `base_url` looks like an absolute http(s) URL.
pub fn is_http_url(base_url: &str) -> bool {
    let trimmed = base_url.trim();
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.trim_matches('/').is_empty())
}
