//! HTTP client wrapper that turns [`HttpResource`] descriptions into requests.
//!
//! One client is built per downloader and shared by every fetch task so the
//! connection pool is reused across resources.

use std::panic::{AssertUnwindSafe, catch_unwind, set_hook, take_hook};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Proxy, Response};
use tracing::{debug, instrument, warn};

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use crate::model::HttpResource;
use crate::user_agent;

/// Shared HTTP client for resource fetches.
///
/// # Example
///
/// ```no_run
/// use mediafetch::download::HttpClient;
/// use mediafetch::model::HttpResource;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let resource = HttpResource::get("https://example.com/video.mp4".parse()?);
/// let response = client.send(&resource).await?;
/// println!("status: {}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with the default timeouts (30s connect, 5min read).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static configuration.
    /// This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a client with explicit timeout values in seconds.
    ///
    /// # Errors
    ///
    /// Returns the builder error when reqwest rejects the configuration.
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = build_client(connect_timeout_secs, read_timeout_secs)?;
        Ok(Self { client })
    }

    /// Returns the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Sends the request described by `resource`.
    ///
    /// Any status code is returned as a response; interpreting it is up to the
    /// caller.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidRequest`] if a header name or value is not valid HTTP
    /// - [`FetchError::Timeout`] / [`FetchError::Network`] if the request fails
    #[instrument(level = "debug", skip(self, resource), fields(method = %resource.method, url = %resource.url))]
    pub async fn send(&self, resource: &HttpResource) -> Result<Response, FetchError> {
        let url = resource.url.as_str();
        let headers = build_header_map(resource)?;

        let mut request = self
            .client
            .request(resource.method.into(), resource.url.clone())
            .headers(headers);
        if let Some(body) = &resource.body {
            request = request.body(body.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;
        debug!(status = response.status().as_u16(), "received response");
        Ok(response)
    }
}

fn build_header_map(resource: &HttpResource) -> Result<HeaderMap, FetchError> {
    let url = resource.url.as_str();
    let mut headers = HeaderMap::with_capacity(resource.headers.len());
    for (name, value) in &resource.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::invalid_request(url, format!("invalid header name '{name}'")))?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            FetchError::invalid_request(url, format!("invalid value for header '{name}'"))
        })?;
        headers.append(name, value);
    }
    Ok(headers)
}

// Loading system proxy settings can panic on some platforms (notably inside
// sandboxes on macOS). Retry once with proxies taken from the environment only.
fn build_client(connect_timeout_secs: u64, read_timeout_secs: u64) -> Result<Client, reqwest::Error> {
    match catch_unwind_silent(AssertUnwindSafe(|| {
        base_client_builder(connect_timeout_secs, read_timeout_secs).build()
    })) {
        Ok(result) => result,
        Err(_) => {
            warn!("HTTP client builder panicked while loading system proxy settings; retrying with env-proxy fallback");
            apply_env_proxy_fallback(
                base_client_builder(connect_timeout_secs, read_timeout_secs).no_proxy(),
            )
            .build()
        }
    }
}

static CLIENT_BUILD_PANIC_HOOK_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn catch_unwind_silent<F, T>(operation: F) -> Result<T, Box<dyn std::any::Any + Send + 'static>>
where
    F: FnOnce() -> T + std::panic::UnwindSafe,
{
    let _guard = CLIENT_BUILD_PANIC_HOOK_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let previous_hook = take_hook();
    set_hook(Box::new(|_| {}));
    let outcome = catch_unwind(operation);
    set_hook(previous_hook);
    outcome
}

fn base_client_builder(connect_timeout_secs: u64, read_timeout_secs: u64) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .user_agent(user_agent::default_user_agent())
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    let names: &[&str] = match scheme {
        "https" => &["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"],
        "http" => &["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"],
        _ => return None,
    };
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::HttpMethod;

    fn resource() -> HttpResource {
        HttpResource::get("https://example.com/a.bin".parse().unwrap())
    }

    #[test]
    fn test_build_header_map_copies_headers() {
        let resource = resource()
            .with_header("Range", "bytes=0-9")
            .with_header("X-Token", "abc");
        let headers = build_header_map(&resource).unwrap();
        assert_eq!(headers.get("range").unwrap(), "bytes=0-9");
        assert_eq!(headers.get("x-token").unwrap(), "abc");
    }

    #[test]
    fn test_build_header_map_keeps_repeated_names() {
        let mut resource = resource();
        resource.headers = vec![
            ("Accept".to_string(), "audio/mpeg".to_string()),
            ("accept".to_string(), "audio/ogg".to_string()),
        ];
        let headers = build_header_map(&resource).unwrap();
        let values: Vec<_> = headers.get_all("accept").iter().collect();
        assert_eq!(values, ["audio/mpeg", "audio/ogg"]);
    }

    #[test]
    fn test_build_header_map_rejects_invalid_name() {
        let resource = resource().with_header("bad header", "x");
        let err = build_header_map(&resource).unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest { .. }));
        assert!(err.to_string().contains("bad header"));
    }

    #[test]
    fn test_build_header_map_rejects_invalid_value() {
        let resource = resource().with_header("X-Bad", "line\nbreak");
        assert!(matches!(
            build_header_map(&resource),
            Err(FetchError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_send_rejects_invalid_header_before_connecting() {
        let client = HttpClient::new();
        let resource = resource().with_header("bad header", "x");
        let result = tokio_test::block_on(client.send(&resource));
        assert!(matches!(result, Err(FetchError::InvalidRequest { .. })));
    }

    #[test]
    fn test_with_timeouts_builds_client() {
        assert!(HttpClient::with_timeouts(5, 10).is_ok());
    }

    #[test]
    fn test_method_maps_to_reqwest() {
        let method: reqwest::Method = HttpMethod::Head.into();
        assert_eq!(method, reqwest::Method::HEAD);
    }
}
