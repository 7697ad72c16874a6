//! Small GET-only HTTP client used for caption, watch-page and Data API requests.
//!
//! - Per-request options: `Auth`, query params, timeout, retry budget, absolute URLs
//! - Signed caption URLs and API keys are redacted in every log line
//! - 429/5xx and transport failures are retried with exponential backoff,
//!   honouring `Retry-After`; callers that run their own fallback pass `retries: Some(0)`
//! - Optional raw request/response logging via `FACTLENS_HTTP_RAW=1` (target `http.raw`)
//!
//! ```no_run
//! # async fn demo() -> Result<(), factlens_http::HttpError> {
//! let client = factlens_http::HttpClient::new("https://www.googleapis.com/youtube/v3/")?;
//! let got: serde_json::Value = client
//!     .get_json("videos", factlens_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```

use bytes::Bytes;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;

const RAW_ENV: &str = "FACTLENS_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;
const MIN_429_DELAY: Duration = Duration::from_millis(1100);

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for server-side failures, `None` for transport/build errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use factlens_http::Auth;
/// use std::borrow::Cow;
///
/// let auth = Auth::Query { name: "key", value: Cow::Borrowed("secret") };
/// match auth {
///     Auth::Query { name, .. } => assert_eq!(name, "key"),
///     Auth::None => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// API key passed as a query param (Google APIs: `key=...`).
    Query { name: &'a str, value: Cow<'a, str> },
    None,
}

/// Per-request tuning knobs.
///
/// ```
/// use factlens_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(8)),
///     retries: Some(0),
///     auth: Some(Auth::Query {
///         name: "key",
///         value: Cow::Borrowed("demo"),
///     }),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 8);
/// assert!(!opts.allow_absolute);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    /// Appended to whatever query the URL already carries.
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

type QueryPairs<'a> = Vec<(&'a str, Cow<'a, str>)>;

/// Why a single send did not produce a body.
enum SendFailure {
    /// Transport error, 429 or 5xx.
    Transient {
        error: HttpError,
        retry_after: Option<Duration>,
    },
    Fatal(HttpError),
}

impl SendFailure {
    fn transport(err: &reqwest::Error, timeout: Duration) -> Self {
        let error = if err.is_timeout() {
            HttpError::Timeout(timeout)
        } else {
            HttpError::Network(err.to_string())
        };
        SendFailure::Transient {
            error,
            retry_after: None,
        }
    }
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use factlens_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://www.youtube.com/")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("factlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// ```no_run
    /// use factlens_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("https://api.example.com")?.with_retries(0);
    /// assert_eq!(client.max_retries, 0);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let (req_id, bytes) = self.get(path, opts).await?;
        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            let snippet = snip_body(&bytes);
            tracing::warn!(
                req_id=%req_id,
                serde_line=e.line(),
                serde_col=e.column(),
                serde_err=%e,
                body_snippet=%snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), snippet)
        })
    }

    /// Raw response body. Non-success statuses are returned as [`HttpError::Api`].
    pub async fn get_bytes(&self, path: &str, opts: RequestOpts<'_>) -> Result<Bytes, HttpError> {
        let (_, bytes) = self.get(path, opts).await?;
        Ok(bytes)
    }

    /// Response body as (lossy) UTF-8 text.
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<String, HttpError> {
        let bytes = self.get_bytes(path, opts).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn resolve_url(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    /// Retry loop around [`Self::send_once`]. Returns the request id with the body.
    async fn get(&self, path: &str, opts: RequestOpts<'_>) -> Result<(String, Bytes), HttpError> {
        let url = self.resolve_url(path, opts.allow_absolute)?;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let auth_kind = if matches!(opts.auth, Some(Auth::Query { .. })) {
            "query"
        } else {
            "none"
        };
        let query = fold_auth(opts.query, opts.auth)?;

        let (host_path, url_query) = redact_query(&url);
        let extra_query = redact_pairs(&query);

        let mut attempt = 0usize;
        loop {
            let req_id = format!("r{}", uuid::Uuid::new_v4().simple());
            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                host_path=%host_path,
                url_query=?url_query,
                query=?extra_query,
                timeout_ms=timeout.as_millis() as u64,
                auth_kind,
                "http.request.start"
            );
            if raw_enabled() {
                let curl = make_curl(&url, &extra_query);
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            match self.send_once(&req_id, &url, &query, timeout).await {
                Ok(bytes) => return Ok((req_id, bytes)),
                Err(SendFailure::Transient { error, retry_after }) if attempt < max_retries => {
                    attempt += 1;
                    let delay = match retry_after {
                        Some(d) => d,
                        None if error.status() == Some(StatusCode::TOO_MANY_REQUESTS) => {
                            backoff(attempt).max(MIN_429_DELAY)
                        }
                        None => backoff(attempt),
                    };
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        max_retries,
                        backoff_ms=delay.as_millis() as u64,
                        error=%error,
                        "http.retrying"
                    );
                    sleep(delay).await;
                }
                Err(SendFailure::Transient { error, .. }) | Err(SendFailure::Fatal(error)) => {
                    tracing::debug!(
                        req_id=%req_id,
                        attempt=attempt + 1,
                        host_path=%host_path,
                        error=%error,
                        "http.error"
                    );
                    return Err(error);
                }
            }
        }
    }

    async fn send_once(
        &self,
        req_id: &str,
        url: &Url,
        query: &[(&str, Cow<'_, str>)],
        timeout: Duration,
    ) -> Result<Bytes, SendFailure> {
        let pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_ref())).collect();
        let started = Instant::now();

        let resp = self
            .inner
            .get(url.clone())
            .query(&pairs)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| SendFailure::transport(&e, timeout))?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| SendFailure::transport(&e, timeout))?;

        let upstream_id = headers
            .get("x-request-id")
            .or_else(|| headers.get("x-goog-request-id"))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=started.elapsed().as_millis() as u64,
            body_len=content_len(&headers, body.len()),
            x_request_id=%upstream_id,
            content_type=?headers.get(reqwest::header::CONTENT_TYPE),
            "http.response"
        );
        if raw_enabled() {
            let cut = body.len().min(RAW_MAX_BODY);
            tracing::info!(
                target: "http.raw",
                %req_id,
                %status,
                body=%String::from_utf8_lossy(&body[..cut]),
                truncated=body.len() > RAW_MAX_BODY
            );
        }

        if status.is_success() {
            return Ok(body);
        }
        let error = HttpError::Api {
            status,
            message: extract_error_message(&body),
            request_id: upstream_id.to_string(),
        };
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(SendFailure::Transient {
                error,
                retry_after: retry_after(&headers),
            })
        } else {
            Err(SendFailure::Fatal(error))
        }
    }
}

/// Merge query auth into the extra query list once, so retries reuse it.
fn fold_auth<'a>(
    query: Option<QueryPairs<'a>>,
    auth: Option<Auth<'a>>,
) -> Result<QueryPairs<'a>, HttpError> {
    let mut query = query.unwrap_or_default();
    if let Some(Auth::Query { name, value }) = auth {
        query.push((name, Cow::Owned(sanitize_api_key(&value)?)));
    }
    Ok(query)
}

fn backoff(attempt: usize) -> Duration {
    Duration::from_millis(200u64.saturating_mul(1 << (attempt - 1).min(16)))
}

fn retry_after(h: &HeaderMap) -> Option<Duration> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}

/// Google envelope first (`{"error":{"message":..}}`), then flat `message`/`detail`/`error`.
fn extract_error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct GoogleEnvelope {
        error: GoogleDetail,
    }
    #[derive(Deserialize)]
    struct GoogleDetail {
        message: String,
    }
    #[derive(Deserialize)]
    struct Flat {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<GoogleEnvelope>(body) {
        return env.error.message;
    }
    if let Ok(flat) = serde_json::from_slice::<Flat>(body) {
        if let Some(m) = [flat.message, flat.detail, flat.error]
            .into_iter()
            .find(|m| !m.is_empty())
        {
            return m;
        }
    }
    snip_body(body)
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).into_owned();
    if snip.len() > SNIPPET_MAX {
        let mut cut = SNIPPET_MAX;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if s.is_empty() {
        return Err(HttpError::Build("API key is empty".into()));
    }
    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build("API key contains control characters".into()));
    }
    Ok(s)
}

/// Query names whose values must never reach a log line.
fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "token"
            | "secret"
            | "client_secret"
            | "signature"
            | "sig"
            | "lsig"
            | "expire"
            | "sparams"
    )
}

fn redact_value(name: &str, value: &str) -> String {
    if is_secret_param(name) {
        "<redacted>".to_string()
    } else {
        value.to_string()
    }
}

fn redact_pairs(query: &[(&str, Cow<'_, str>)]) -> Vec<(String, String)> {
    query
        .iter()
        .map(|(k, v)| ((*k).to_string(), redact_value(k, v)))
        .collect()
}

/// "host + path" and the URL's own query list with secrets redacted.
fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let value = redact_value(&k, &v);
            (k.into_owned(), value)
        })
        .collect();
    (host_path, redacted)
}

/// Best-effort curl line for reproducing a request, secrets already redacted.
fn make_curl(url: &Url, extra_query: &[(String, String)]) -> String {
    let (host_path, mut query) = redact_query(url);
    query.extend(extra_query.iter().cloned());
    let mut rendered = format!("{}://{host_path}", url.scheme());
    if !query.is_empty() {
        let qs = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        rendered.push('?');
        rendered.push_str(&qs);
    }
    format!("curl '{}'", rendered.replace('\'', r"'\''"))
}

fn content_len(headers: &HeaderMap, body_len: usize) -> usize {
    headers
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(body_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_caption_params_are_redacted() {
        let url = Url::parse(
            "https://www.youtube.com/api/timedtext?v=abc&signature=DEADBEEF&key=yt8&lang=en",
        )
        .unwrap();
        let (host_path, q) = redact_query(&url);
        assert_eq!(host_path, "www.youtube.com/api/timedtext");
        assert!(q.contains(&("v".to_string(), "abc".to_string())));
        assert!(q.contains(&("signature".to_string(), "<redacted>".to_string())));
        assert!(q.contains(&("key".to_string(), "<redacted>".to_string())));
        assert!(q.contains(&("lang".to_string(), "en".to_string())));
    }

    #[test]
    fn curl_never_contains_secrets() {
        let url = Url::parse("https://example.com/x?sig=SECRET&lang=en").unwrap();
        let extra = redact_pairs(&[("key", Cow::Borrowed("AIzaSECRET"))]);
        let curl = make_curl(&url, &extra);
        assert!(!curl.contains("SECRET"));
        assert!(curl.contains("key=<redacted>"));
        assert!(curl.contains("lang=en"));
    }

    #[test]
    fn query_auth_is_sanitized_and_appended() {
        let q = fold_auth(
            Some(vec![("part", Cow::Borrowed("snippet"))]),
            Some(Auth::Query {
                name: "key",
                value: Cow::Borrowed(" 'abc' "),
            }),
        )
        .unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q[1].0, "key");
        assert_eq!(q[1].1, "abc");
        assert!(fold_auth(None, None).unwrap().is_empty());
    }

    #[test]
    fn google_error_envelope_is_preferred() {
        let body = br#"{"error":{"code":403,"message":"API key not valid"}}"#;
        assert_eq!(extract_error_message(body), "API key not valid");
        assert_eq!(extract_error_message(br#"{"detail":"nope"}"#), "nope");
        assert_eq!(extract_error_message(b"plain"), "plain");
    }

    #[test]
    fn api_keys_are_sanitized() {
        assert_eq!(sanitize_api_key(" \"abc 123\" ").unwrap(), "abc123");
        assert!(sanitize_api_key("   ").is_err());
        assert!(sanitize_api_key("ключ").is_err());
    }

    #[test]
    fn retry_after_reads_seconds() {
        let mut h = HeaderMap::new();
        assert_eq!(retry_after(&h), None);
        h.insert(RETRY_AFTER, "3".parse().unwrap());
        assert_eq!(retry_after(&h), Some(Duration::from_secs(3)));
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn snip_respects_char_boundaries() {
        let snip = snip_body("é".repeat(400).as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_MAX + 3);
    }
}
