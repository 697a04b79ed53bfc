//! Endpoint URL joining for OpenAI-compatible servers.

/// Strip trailing slashes so endpoints can be appended without doubling them.
///
/// ```
/// use agora::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://127.0.0.1:8080/v1/"), "http://127.0.0.1:8080/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash between them.
///
/// ```
/// use agora::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://router.huggingface.co/v1/", "/chat/completions"),
///     "https://router.huggingface.co/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}
