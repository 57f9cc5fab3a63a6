use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, EXPIRES, PRAGMA};
use serde_json::Value;
use thiserror::Error;

use super::record::VersionRecord;

pub const DEFAULT_VERSION_ENDPOINT: &str = "/app-version.json";
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Why a single manifest fetch produced no record. The caller treats every
/// variant the same way.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("version request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("version endpoint returned HTTP {0}")]
    Status(u16),
    #[error("failed to read version body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("malformed version manifest: {0}")]
    Parse(String),
}

#[async_trait]
pub trait VersionFetcher: Send + Sync {
    /// Performs exactly one read of the manifest. No retries.
    async fn fetch_latest(&self) -> Result<VersionRecord, FetchError>;
}

pub struct HttpVersionFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpVersionFetcher {
    /// `origin` is the deployed site (e.g. `https://app.example.com`), `endpoint`
    /// the manifest path relative to it.
    pub fn new(origin: &str, endpoint: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .default_headers(no_cache_headers())
            .build()?;

        Ok(Self {
            client,
            url: join_url(origin, endpoint),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl VersionFetcher for HttpVersionFetcher {
    async fn fetch_latest(&self) -> Result<VersionRecord, FetchError> {
        let ts = Utc::now().timestamp_millis().to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[("ts", ts.as_str())])
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(FetchError::Body)?;
        parse_manifest(&body)
    }
}

pub fn parse_manifest(body: &[u8]) -> Result<VersionRecord, FetchError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|err| FetchError::Parse(err.to_string()))?;
    VersionRecord::from_manifest(&value)
        .ok_or_else(|| FetchError::Parse("manifest is not a JSON object".into()))
}

fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
    headers
}

fn join_url(origin: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, headers, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    async fn fetcher_for(server: &MockServer) -> HttpVersionFetcher {
        HttpVersionFetcher::new(&server.uri(), DEFAULT_VERSION_ENDPOINT).unwrap()
    }

    #[tokio::test]
    async fn fetches_and_normalizes_manifest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app-version.json"))
            .and(headers(
                "cache-control",
                vec!["no-cache", "no-store", "must-revalidate"],
            ))
            .and(header("pragma", "no-cache"))
            .and(header("expires", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"version":"1.1.0","buildId":"xyz789","buildTime":"t2","commitAuthor":"Ana"}"#,
            ))
            .mount(&server)
            .await;

        let record = fetcher_for(&server).await.fetch_latest().await.unwrap();
        assert_eq!(record.build_id, "xyz789");
        assert_eq!(record.version, "1.1.0");
        assert_eq!(record.build_time, "t2");
        assert_eq!(record.commit_author.as_deref(), Some("Ana"));
        assert_eq!(record.commit, None);
    }

    #[tokio::test]
    async fn sends_cache_busting_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app-version.json"))
            .respond_with(|req: &Request| {
                let has_ts = req
                    .url
                    .query_pairs()
                    .any(|(k, v)| k == "ts" && v.parse::<i64>().is_ok());
                if has_ts {
                    ResponseTemplate::new(200).set_body_string(r#"{"buildId":"a"}"#)
                } else {
                    ResponseTemplate::new(400)
                }
            })
            .mount(&server)
            .await;

        assert!(fetcher_for(&server).await.fetch_latest().await.is_ok());
    }

    #[tokio::test]
    async fn non_success_status_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).await.fetch_latest().await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_body_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = fetcher_for(&server).await.fetch_latest().await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_origin_is_a_failure() {
        let fetcher = HttpVersionFetcher::new("http://127.0.0.1:9", "/app-version.json").unwrap();
        let err = fetcher.fetch_latest().await.unwrap_err();
        assert!(matches!(err, FetchError::Request(_)), "got {err:?}");
    }

    #[test]
    fn joins_origin_and_endpoint() {
        assert_eq!(
            join_url("https://app.example.com/", "/app-version.json"),
            "https://app.example.com/app-version.json"
        );
        assert_eq!(
            join_url("https://app.example.com", "meta/app-version.json"),
            "https://app.example.com/meta/app-version.json"
        );
        assert_eq!(
            join_url("https://a.example.com", "https://cdn.example.com/v.json"),
            "https://cdn.example.com/v.json"
        );
    }
}
