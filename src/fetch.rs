/// Fetch collaborators: full-snapshot reads and byte-range requests against
/// the monitored resource.
use std::time::Duration;

/// Errors produced while fetching the monitored resource.
#[derive(Debug)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    Client { source: reqwest::Error },
    /// Connection, TLS, timeout or protocol failure.
    Transport { url: String, source: reqwest::Error },
    /// The server answered with a non-success status.
    Status { url: String, status: u16 },
    /// The response body could not be read or decoded.
    Body { url: String, source: reqwest::Error },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Client { source } => write!(f, "failed to build HTTP client: {source}"),
            FetchError::Transport { url, source } => write!(f, "request to {url} failed: {source}"),
            FetchError::Status { url, status } => write!(f, "{url} returned HTTP {status}"),
            FetchError::Body { url, source } => {
                write!(f, "failed to read response body from {url}: {source}")
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Client { source } => Some(source),
            FetchError::Transport { source, .. } => Some(source),
            FetchError::Status { .. } => None,
            FetchError::Body { source, .. } => Some(source),
        }
    }
}

impl FetchError {
    /// Message for logs: the short message, or the message followed by the
    /// whole source chain when `verbose`.
    pub fn describe(&self, verbose: bool) -> String {
        let mut out = self.to_string();
        if verbose {
            let mut cause = std::error::Error::source(self);
            while let Some(err) = cause {
                out.push_str("\n  caused by: ");
                out.push_str(&err.to_string());
                cause = std::error::Error::source(err);
            }
        }
        out
    }
}

/// Reads the full current content of a resource as ordered lines.
pub trait Fetch {
    async fn fetch(&self) -> Result<Vec<String>, FetchError>;
}

/// Status and headers of a byte-range request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

/// Issues a byte-range request against a resource.
pub trait RangeFetch {
    /// Request bytes `first..=last`.
    async fn fetch_range(&self, first: u64, last: u64) -> Result<RangeResponse, FetchError>;
}

/// Fetches a resource over HTTP(S).
pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpFetcher {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| FetchError::Client { source: e })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport(&self, source: reqwest::Error) -> FetchError {
        FetchError::Transport {
            url: self.url.clone(),
            source,
        }
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self) -> Result<Vec<String>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            url: self.url.clone(),
            source: e,
        })?;
        let lines = split_lines(&body);
        tracing::debug!(url = %self.url, bytes = body.len(), lines = lines.len(), "fetched snapshot");
        Ok(lines)
    }
}

impl RangeFetch for HttpFetcher {
    async fn fetch_range(&self, first: u64, last: u64) -> Result<RangeResponse, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::RANGE, format!("bytes={first}-{last}"))
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = value.to_str().unwrap_or("<non-ascii>");
                (name.to_string(), value.to_string())
            })
            .collect();

        Ok(RangeResponse {
            status: response.status().as_u16(),
            headers,
        })
    }
}

/// Split a body into lines on `\n` or `\r\n`. A trailing terminator does not
/// produce an extra empty line.
fn split_lines(body: &str) -> Vec<String> {
    body.lines().map(str::to_owned).collect()
}

#[cfg(test)]
pub mod testing {
    /// Serve `app` on an ephemeral local port and return its base URL.
    pub async fn spawn_server(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// A URL on a local port nothing listens on.
    pub async fn dead_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/log")
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{dead_url, spawn_server};
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    fn fetcher(url: &str) -> HttpFetcher {
        HttpFetcher::new(url, Duration::from_secs(5), true).unwrap()
    }

    #[test]
    fn test_split_lines_handles_crlf_and_trailing_newline() {
        assert_eq!(split_lines("a\r\nb\nc\n"), vec!["a", "b", "c"]);
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_describe_short_and_verbose() {
        let err = FetchError::Status {
            url: "http://host/log".to_string(),
            status: 503,
        };
        assert_eq!(err.describe(false), "http://host/log returned HTTP 503");
        // No source chain to append
        assert_eq!(err.describe(true), err.describe(false));
    }

    #[tokio::test]
    async fn test_fetch_returns_lines() {
        let app = Router::new().route("/log", get(|| async { "first\r\nsecond\nthird" }));
        let base = spawn_server(app).await;

        let lines = fetcher(&format!("{base}/log")).fetch().await.unwrap();
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_error() {
        let app = Router::new().route("/log", get(|| async { (StatusCode::NOT_FOUND, "gone") }));
        let base = spawn_server(app).await;

        let err = fetcher(&format!("{base}/log")).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport_error() {
        let url = dead_url().await;
        let err = fetcher(&url).fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
        assert!(err.describe(false).contains(&url));
        assert!(err.describe(true).len() >= err.describe(false).len());
    }

    #[tokio::test]
    async fn test_fetch_range_sends_range_header() {
        let app = Router::new().route(
            "/log",
            get(|headers: axum::http::HeaderMap| async move {
                let range = headers
                    .get("range")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                (StatusCode::PARTIAL_CONTENT, [("x-seen-range", range)], "ab")
            }),
        );
        let base = spawn_server(app).await;

        let response = fetcher(&format!("{base}/log")).fetch_range(0, 1).await.unwrap();
        assert_eq!(response.status, 206);
        assert!(response
            .headers
            .iter()
            .any(|(k, v)| k == "x-seen-range" && v == "bytes=0-1"));
    }
}
