//! HTTP transport collaborator.
//!
//! The bridge only needs blocking GET/POST with pre-built parameter pairs;
//! everything else (TLS, timeouts, redirects) stays inside the transport
//! implementation. Failures propagate as [`Error::Transport`] with no retry.

use tracing::debug;

use crate::error::{Error, Result};
use crate::query::encode_query_string;

/// Environment variable consulted for an optional bearer token.
const TOKEN_ENV_VAR: &str = "RESTBRIDGE_API_TOKEN";

/// Raw response from the transport: the body plus the HTTP status.
#[derive(Debug, Clone)]
pub struct Response {
  url: String,
  status: u16,
  body: Vec<u8>,
}

impl Response {
  pub fn new(url: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
    Self {
      url: url.into(),
      status,
      body,
    }
  }

  pub fn status(&self) -> u16 {
    self.status
  }

  pub fn body(&self) -> &[u8] {
    &self.body
  }

  /// Parse the body as JSON, rejecting non-2xx statuses first.
  pub fn json(&self) -> Result<serde_json::Value> {
    if !(200..300).contains(&self.status) {
      return Err(Error::Transport {
        url: self.url.clone(),
        message: format!("unexpected status {}", self.status),
      });
    }
    serde_json::from_slice(&self.body).map_err(|e| Error::Parse {
      context: format!("response body from {}", self.url),
      message: e.to_string(),
    })
  }
}

/// Blocking HTTP client contract consumed by the bridge.
pub trait Transport: Send + Sync {
  fn get(&self, url: &str, query: &[(String, String)]) -> Result<Response>;
  fn post(&self, url: &str, form: &[(String, String)]) -> Result<Response>;
}

/// Append an encoded query string, respecting an existing `?` in the URL.
pub(crate) fn append_query(url: &str, query: &[(String, String)]) -> String {
  if query.is_empty() {
    return url.to_string();
  }
  let separator = if url.contains('?') { '&' } else { '?' };
  format!("{url}{separator}{}", encode_query_string(query))
}

/// Default transport built on reqwest's blocking client.
pub struct HttpTransport {
  client: reqwest::blocking::Client,
  bearer_token: Option<String>,
}

impl HttpTransport {
  pub fn new() -> Result<Self> {
    let client = reqwest::blocking::Client::builder()
      .build()
      .map_err(|e| Error::Transport {
        url: String::new(),
        message: format!("failed to build http client: {e}"),
      })?;

    Ok(Self {
      client,
      bearer_token: None,
    })
  }

  /// Build a transport, picking up a bearer token from `RESTBRIDGE_API_TOKEN`
  /// when the variable is set.
  pub fn from_env() -> Result<Self> {
    let transport = Self::new()?;
    match std::env::var(TOKEN_ENV_VAR) {
      Ok(token) => Ok(transport.with_bearer_token(token)),
      Err(_) => Ok(transport),
    }
  }

  pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
    self.bearer_token = Some(token.into());
    self
  }

  fn send(&self, request: reqwest::blocking::RequestBuilder, url: &str) -> Result<Response> {
    let request = match &self.bearer_token {
      Some(token) => request.bearer_auth(token),
      None => request,
    };

    let response = request.send().map_err(|e| Error::Transport {
      url: url.to_string(),
      message: e.to_string(),
    })?;

    let status = response.status().as_u16();
    let body = response
      .bytes()
      .map_err(|e| Error::Transport {
        url: url.to_string(),
        message: format!("failed to read body: {e}"),
      })?
      .to_vec();

    Ok(Response::new(url, status, body))
  }
}

impl Transport for HttpTransport {
  fn get(&self, url: &str, query: &[(String, String)]) -> Result<Response> {
    let target = append_query(url, query);
    debug!(url = %target, "GET");
    self.send(self.client.get(&target), &target)
  }

  fn post(&self, url: &str, form: &[(String, String)]) -> Result<Response> {
    debug!(url, "POST");
    self.send(self.client.post(url).form(&form.to_vec()), url)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn test_append_query_empty_leaves_url() {
    assert_eq!(append_query("https://api.test/a", &[]), "https://api.test/a");
  }

  #[test]
  fn test_append_query_uses_question_mark() {
    let url = append_query("https://api.test/a", &pairs(&[("x", "1")]));
    assert_eq!(url, "https://api.test/a?x=1");
  }

  #[test]
  fn test_append_query_respects_existing_query() {
    let url = append_query("https://api.test/a?x=1", &pairs(&[("y", "2")]));
    assert_eq!(url, "https://api.test/a?x=1&y=2");
  }

  #[test]
  fn test_json_rejects_error_status() {
    let response = Response::new("https://api.test/a", 500, b"{}".to_vec());
    assert!(matches!(response.json(), Err(Error::Transport { .. })));
  }

  #[test]
  fn test_json_rejects_malformed_body() {
    let response = Response::new("https://api.test/a", 200, b"not json".to_vec());
    assert!(matches!(response.json(), Err(Error::Parse { .. })));
  }
}
