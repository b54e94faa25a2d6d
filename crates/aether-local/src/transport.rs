//! HTTP Transport (C1): execute a single HTTP request with timeouts,
//! redirects, and headers. The only component allowed to touch the network
//! directly — the robots registry and fetcher both call through here.

use aether_core::{Error, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: "Aether/1.0".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            max_redirects: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
}

impl Transport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// `Do(request) -> response | error`. Caller-visible error kinds never
    /// discard the underlying cause.
    pub async fn do_get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Option<Duration>,
        max_bytes: Option<u64>,
    ) -> Result<RawResponse> {
        let mut rb = self.client.get(url);
        if let Some(t) = timeout {
            rb = rb.timeout(t);
        }
        for (k, v) in headers {
            if let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                reqwest::header::HeaderValue::from_str(v),
            ) {
                rb = rb.header(name, value);
            }
        }

        let resp = rb.send().await.map_err(classify_reqwest_error)?;
        let final_url = resp.url().to_string();
        let status = resp.status().as_u16();
        let mut resp_headers = Vec::new();
        for (k, v) in resp.headers().iter() {
            if let Ok(s) = v.to_str() {
                resp_headers.push((k.as_str().to_string(), s.to_string()));
            }
        }

        let cap = max_bytes.unwrap_or(u64::MAX) as usize;
        let mut body = Vec::new();
        use futures_util::StreamExt;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(classify_reqwest_error)?;
            if body.len().saturating_add(chunk.len()) > cap {
                let can_take = cap.saturating_sub(body.len());
                body.extend_from_slice(&chunk[..can_take]);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(RawResponse {
            url: final_url,
            status,
            headers: resp_headers,
            body,
        })
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else if e.is_connect() {
        Error::ConnectionRefused(e.to_string())
    } else if e.is_redirect() {
        Error::TooManyRedirects(10)
    } else {
        Error::Transport(e.to_string())
    }
}
