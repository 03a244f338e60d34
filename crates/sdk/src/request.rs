//! Outgoing request capability.
//!
//! The resolver does not care which RPC client builds the request. It needs to
//! read one header, splice a base URL in front of the request target, and hand
//! back the finished request. [`OutgoingRequest`] captures exactly that.
//!
//! Implementations are provided for [`RequestTemplate`], a minimal
//! client-agnostic request description, and for [`http::Request`].

use std::fmt;

use http::{Method, Uri, uri::PathAndQuery};

use crate::error::{Error, InvalidUrlSnafu, Result};

/// A request whose target can be rewritten by the resolver.
pub trait OutgoingRequest {
    /// The finished request type.
    type Output;

    /// Returns the first value of header `name`, or `None` if it is absent.
    fn header(&self, name: &str) -> Option<&str>;

    /// Inserts `base_url` (`scheme://host:port`) as the request address prefix.
    ///
    /// Method, path, headers and body are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the combined URL is malformed.
    fn insert_base_url(&mut self, base_url: &str) -> Result<()>;

    /// Finalizes the request.
    fn finish(self) -> Self::Output;
}

/// Client-agnostic description of an outgoing request.
///
/// The URL starts out relative (path and query) and becomes absolute once the
/// resolver inserts the base URL in front of it.
///
/// Header names match case-insensitively; a header may carry several values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    method: Method,
    url: String,
    headers: Vec<(String, Vec<String>)>,
    body: Option<Vec<u8>>,
}

impl RequestTemplate {
    /// Creates a template for `method` on `path` (path and optional query).
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, url: path.into(), headers: Vec::new(), body: None }
    }

    /// Appends a header value.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_header(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Appends a header value.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(existing, _)| existing.eq_ignore_ascii_case(&name)) {
            Some((_, values)) => values.push(value),
            None => self.headers.push((name, vec![value])),
        }
    }

    /// Returns every value of header `name`.
    #[must_use]
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or_default()
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the current URL (relative until a base URL is inserted).
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl OutgoingRequest for RequestTemplate {
    type Output = PreparedRequest;

    fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().map(String::as_str)
    }

    fn insert_base_url(&mut self, base_url: &str) -> Result<()> {
        if base_url.is_empty() || base_url.contains(char::is_whitespace) {
            return InvalidUrlSnafu {
                url: base_url,
                message: "base URL must be non-empty and contain no whitespace",
            }
            .fail();
        }
        self.url.insert_str(0, base_url);
        Ok(())
    }

    fn finish(self) -> PreparedRequest {
        PreparedRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// A finished request ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    /// Request method.
    pub method: Method,
    /// Absolute request URL.
    pub url: String,
    /// Headers in insertion order.
    pub headers: Vec<(String, Vec<String>)>,
    /// Request body.
    pub body: Option<Vec<u8>>,
}

impl fmt::Display for PreparedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

impl<B> OutgoingRequest for http::Request<B> {
    type Output = Self;

    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|value| value.to_str().ok())
    }

    fn insert_base_url(&mut self, base_url: &str) -> Result<()> {
        let invalid = |message: String| Error::InvalidUrl { url: base_url.to_owned(), message };

        let base: Uri = base_url.parse().map_err(|e: http::uri::InvalidUri| invalid(e.to_string()))?;
        let parts = base.into_parts();
        let (Some(scheme), Some(authority)) = (parts.scheme, parts.authority) else {
            return Err(invalid("base URL must include a scheme and host".to_owned()));
        };

        let path_and_query =
            self.uri().path_and_query().cloned().unwrap_or_else(|| PathAndQuery::from_static("/"));

        let uri = Uri::builder()
            .scheme(scheme)
            .authority(authority)
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| invalid(e.to_string()))?;

        *self.uri_mut() = uri;
        Ok(())
    }

    fn finish(self) -> Self {
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_template_header_first_value() {
        let template = RequestTemplate::new(Method::GET, "/items")
            .with_header("X-Env", "staging")
            .with_header("x-env", "prod");

        assert_eq!(template.header("X-ENV"), Some("staging"));
        assert_eq!(template.header_values("x-env"), ["staging", "prod"]);
    }

    #[test]
    fn test_template_missing_header() {
        let template = RequestTemplate::new(Method::GET, "/items");
        assert!(template.header("X-Env").is_none());
        assert!(template.header_values("X-Env").is_empty());
    }

    #[test]
    fn test_template_insert_base_url_preserves_everything_else() {
        let mut template = RequestTemplate::new(Method::POST, "/v1/items?limit=10")
            .with_header("Content-Type", "application/json")
            .with_body(b"{}".to_vec());

        template.insert_base_url("https://10.0.0.1:8443").expect("insert");
        let prepared = template.finish();

        assert_eq!(prepared.method, Method::POST);
        assert_eq!(prepared.url, "https://10.0.0.1:8443/v1/items?limit=10");
        assert_eq!(prepared.headers, vec![(
            "Content-Type".to_owned(),
            vec!["application/json".to_owned()]
        )]);
        assert_eq!(prepared.body.as_deref(), Some(b"{}".as_slice()));
        assert_eq!(prepared.to_string(), "POST https://10.0.0.1:8443/v1/items?limit=10");
    }

    #[test]
    fn test_template_rejects_blank_base_url() {
        let mut template = RequestTemplate::new(Method::GET, "/items");
        assert!(matches!(template.insert_base_url(""), Err(Error::InvalidUrl { .. })));
        assert!(matches!(template.insert_base_url("http://a b"), Err(Error::InvalidUrl { .. })));
        assert_eq!(template.url(), "/items");
    }

    #[test]
    fn test_http_request_header() {
        let request = http::Request::builder()
            .uri("/items")
            .header("x-env", "staging")
            .header("x-env", "prod")
            .body(())
            .unwrap();

        assert_eq!(request.header("X-Env"), Some("staging"));
        assert!(request.header("x-other").is_none());
        assert!(request.header("not a header name").is_none());
    }

    #[test]
    fn test_http_request_insert_base_url() {
        let mut request = http::Request::builder()
            .method(Method::PUT)
            .uri("/v1/items/7?force=true")
            .header("x-trace", "abc")
            .body("payload")
            .unwrap();

        request.insert_base_url("http://10.0.0.2:9090").expect("insert");
        let request = request.finish();

        assert_eq!(request.uri().to_string(), "http://10.0.0.2:9090/v1/items/7?force=true");
        assert_eq!(request.method(), &Method::PUT);
        assert_eq!(request.header("x-trace"), Some("abc"));
        assert_eq!(*request.body(), "payload");
    }

    #[test]
    fn test_http_request_replaces_existing_authority() {
        let mut request =
            http::Request::builder().uri("http://placeholder/items").body(()).unwrap();

        request.insert_base_url("https://real-host:443").expect("insert");

        assert_eq!(request.uri().scheme_str(), Some("https"));
        assert_eq!(request.uri().authority().map(|a| a.as_str()), Some("real-host:443"));
        assert_eq!(request.uri().path(), "/items");
    }

    #[test]
    fn test_http_request_rejects_relative_base() {
        let mut request = http::Request::builder().uri("/items").body(()).unwrap();
        let err = request.insert_base_url("/not-absolute").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }
}
