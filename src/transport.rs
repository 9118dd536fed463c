use std::fmt::Write as _;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;

use crate::error::IntiError;

/// Value of the client-identifying header sent with every request.
pub const CLIENT_TAG: &str = concat!("inti/", env!("CARGO_PKG_VERSION"));

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Fully buffered response handed back to callers.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// HTTP client wrapper that tags every outgoing request.
///
/// Sets the client tag header and, when a token is supplied, the bearer
/// authorization header before delegating to the inner `reqwest::Client`.
/// At TRACE level the full request and response are dumped to the log.
#[derive(Clone)]
pub struct TaggedClient {
    client: reqwest::Client,
}

impl std::fmt::Debug for TaggedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedClient")
            .field("tag", &CLIENT_TAG)
            .finish_non_exhaustive()
    }
}

impl TaggedClient {
    pub fn new() -> Result<Self, IntiError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| IntiError::transport("Could not build HTTP client", e))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The undecorated client, used to build requests.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Decorate and send a request, returning status, headers and body as received.
    pub async fn execute(
        &self,
        mut request: reqwest::Request,
        bearer: Option<&str>,
    ) -> Result<RawResponse, reqwest::Error> {
        let headers = request.headers_mut();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_TAG));
        if let Some(token) = bearer {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => tracing::error!(error = %e, "access token is not a valid header value"),
            }
        }

        let tracing_enabled = tracing::enabled!(tracing::Level::TRACE);
        if tracing_enabled {
            tracing::trace!("{}", dump_request(&request));
        }

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                if tracing_enabled {
                    tracing::trace!(error = %e, "no http response to dump");
                }
                return Err(e);
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        let raw = RawResponse {
            status,
            headers,
            body,
        };

        if tracing_enabled {
            tracing::trace!("{}", dump_response(&raw));
        }

        Ok(raw)
    }
}

fn dump_request(request: &reqwest::Request) -> String {
    let mut out = format!("{} {} HTTP/1.1\r\n", request.method(), request.url());
    dump_headers(&mut out, request.headers());
    out.push_str("\r\n");
    match request.body().and_then(|b| b.as_bytes()) {
        Some(bytes) => out.push_str(&String::from_utf8_lossy(bytes)),
        None if request.body().is_some() => out.push_str("<streaming body>"),
        None => {}
    }
    out
}

fn dump_response(response: &RawResponse) -> String {
    let mut out = format!("HTTP/1.1 {}\r\n", response.status);
    dump_headers(&mut out, &response.headers);
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(&response.body));
    out
}

fn dump_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let value = if value.is_sensitive() {
            "<redacted>".to_string()
        } else {
            String::from_utf8_lossy(value.as_bytes()).into_owned()
        };
        let _ = write!(out, "{name}: {value}\r\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_tag_carries_crate_version() {
        assert!(CLIENT_TAG.starts_with("inti/"));
        assert!(CLIENT_TAG.len() > "inti/".len());
    }

    #[test]
    fn dump_request_includes_method_url_headers_and_body() {
        let client = reqwest::Client::new();
        let request = client
            .post("https://login.example.com/token")
            .header("x-test", "1")
            .body("grant_type=client_credentials")
            .build()
            .unwrap();
        let dumped = dump_request(&request);
        assert!(dumped.starts_with("POST https://login.example.com/token HTTP/1.1"));
        assert!(dumped.contains("x-test: 1"));
        assert!(dumped.ends_with("grant_type=client_credentials"));
    }

    #[test]
    fn dump_redacts_sensitive_headers() {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_static("Bearer secret");
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        let response = RawResponse {
            status: StatusCode::OK,
            headers,
            body: b"{}".to_vec(),
        };
        let dumped = dump_response(&response);
        assert!(dumped.starts_with("HTTP/1.1 200 OK"));
        assert!(dumped.contains("authorization: <redacted>"));
        assert!(!dumped.contains("secret"));
    }
}
