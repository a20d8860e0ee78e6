//! Fetchable resource descriptions and their content-addressed fingerprints.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

use crate::hash::{HashType, hash_bytes};

/// HTTP methods a resource may be fetched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    #[default]
    Get,
    /// `HEAD`
    Head,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `OPTIONS`
    Options,
    /// `PATCH`
    Patch,
}

impl HttpMethod {
    /// Returns the canonical upper-case method token.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Head => Self::HEAD,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Delete => Self::DELETE,
            HttpMethod::Options => Self::OPTIONS,
            HttpMethod::Patch => Self::PATCH,
        }
    }
}

/// Describes a single HTTP request needed to recreate some content locally.
///
/// Resources are never mutated once built. Variants (e.g. with an added
/// `Range` header) are produced by copying through [`HttpResource::with_header`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HttpResource {
    /// Request method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: Url,
    /// Request headers in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<u8>>,
}

impl HttpResource {
    /// Creates a resource with no headers and no body.
    #[must_use]
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Shortcut for a plain `GET` resource.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Returns a copy with `name` set to `value`.
    ///
    /// An existing header with the same (case-insensitive) name keeps its
    /// position and has its value replaced; otherwise the header is appended.
    #[must_use]
    pub fn with_header(&self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        let mut next = self.clone();
        match next
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => next.headers.push((name, value)),
        }
        next
    }

    /// Returns a copy carrying the given request body.
    #[must_use]
    pub fn with_body(&self, body: impl Into<Vec<u8>>) -> Self {
        let mut next = self.clone();
        next.body = Some(body.into());
        next
    }

    /// Looks up a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Byte signature the fingerprint is computed over: `method|headers|url[|body]`.
    fn signature(&self) -> Vec<u8> {
        let rendered_headers = self
            .headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut signature =
            format!("{}|{{{rendered_headers}}}|{}", self.method, self.url).into_bytes();
        if let Some(body) = &self.body {
            signature.push(b'|');
            signature.extend_from_slice(body);
        }
        signature
    }

    /// Content-addressed identifier of this resource (lowercase hex SHA-256).
    ///
    /// Stable across runs for the same logical request, and safe to use as a
    /// filename component.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let fingerprint = hash_bytes(&self.signature(), HashType::Sha256);
        trace!(%fingerprint, url = %self.url, "computed resource fingerprint");
        fingerprint
    }
}

impl fmt::Display for HttpResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Discriminant of a [`Resource`], used for capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Plain HTTP(S) request.
    Http,
}

/// A fetchable resource of some kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Resource {
    /// An HTTP(S) request.
    Http(HttpResource),
}

impl Resource {
    /// Returns the resource kind tag.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Http(_) => ResourceKind::Http,
        }
    }

    /// Returns the HTTP description if this is an HTTP resource.
    #[must_use]
    pub fn as_http(&self) -> Option<&HttpResource> {
        match self {
            Self::Http(resource) => Some(resource),
        }
    }

    /// Content-addressed identifier of the resource.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        match self {
            Self::Http(resource) => resource.fingerprint(),
        }
    }
}

impl From<HttpResource> for Resource {
    fn from(resource: HttpResource) -> Self {
        Self::Http(resource)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(resource) => resource.fmt(f),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn resource(url: &str) -> HttpResource {
        HttpResource::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = resource("https://example.com/video.mp4").with_header("Accept", "*/*");
        let b = resource("https://example.com/video.mp4").with_header("Accept", "*/*");
        assert_eq!(a.fingerprint(), a.fingerprint());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_is_filesystem_safe_hex() {
        let fingerprint = resource("https://example.com/a b?c=d").fingerprint();
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_changes_with_each_field() {
        let base = resource("https://example.com/file.bin");
        let fingerprint = base.fingerprint();

        let other_url = resource("https://example.com/other.bin");
        assert_ne!(fingerprint, other_url.fingerprint());

        let other_method = HttpResource::new(HttpMethod::Post, base.url.clone());
        assert_ne!(fingerprint, other_method.fingerprint());

        let with_header = base.with_header("Range", "bytes=0-9");
        assert_ne!(fingerprint, with_header.fingerprint());

        let with_body = base.with_body(b"payload".to_vec());
        assert_ne!(fingerprint, with_body.fingerprint());
        assert_ne!(
            with_body.fingerprint(),
            base.with_body(b"other".to_vec()).fingerprint()
        );
    }

    #[test]
    fn test_fingerprint_is_header_order_sensitive() {
        let base = resource("https://example.com/file.bin");
        let ab = base.with_header("A", "1").with_header("B", "2");
        let ba = base.with_header("B", "2").with_header("A", "1");
        assert_ne!(ab.fingerprint(), ba.fingerprint());
    }

    #[test]
    fn test_with_header_overwrites_case_insensitively_in_place() {
        let base = resource("https://example.com/file.bin")
            .with_header("Accept", "*/*")
            .with_header("range", "bytes=0-9");
        let next = base.with_header("Range", "bytes=10-19");

        assert_eq!(next.headers.len(), 2);
        assert_eq!(next.headers[1], ("range".to_string(), "bytes=10-19".to_string()));
        assert_eq!(next.header("RANGE"), Some("bytes=10-19"));
        // the receiver is untouched
        assert_eq!(base.header("range"), Some("bytes=0-9"));
    }

    #[test]
    fn test_resource_kind_and_accessors() {
        let http = resource("https://example.com/file.bin");
        let wrapped = Resource::from(http.clone());
        assert_eq!(wrapped.kind(), ResourceKind::Http);
        assert_eq!(wrapped.as_http(), Some(&http));
        assert_eq!(wrapped.fingerprint(), http.fingerprint());
        assert_eq!(wrapped.to_string(), "GET https://example.com/file.bin");
    }

    #[test]
    fn test_resource_serde_is_tagged() {
        let wrapped = Resource::from(resource("https://example.com/file.bin"));
        let json = serde_json::to_value(&wrapped).unwrap();
        assert_eq!(json["kind"], "http");
        assert_eq!(json["method"], "GET");
        let back: Resource = serde_json::from_value(json).unwrap();
        assert_eq!(back, wrapped);
    }

    #[test]
    fn test_http_method_into_reqwest() {
        assert_eq!(reqwest::Method::from(HttpMethod::Patch), reqwest::Method::PATCH);
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
    }
}
