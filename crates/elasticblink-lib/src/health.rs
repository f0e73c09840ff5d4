//! Cluster health from the Elasticsearch `_cat/health` API.
//!
//! [`connect`] turns the configuration into an [`ElasticClient`] (or `None`
//! when no credentials are configured). The client answers two questions:
//! is the endpoint alive ([`HealthClient::ping`]), and what is the health of
//! every cluster it knows about ([`HealthClient::fetch_cluster_health`]).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Config;

// ── Error type ──

/// Health endpoint errors. String payloads follow "context: details".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthError {
    /// The configured protocol/host/port do not form a valid URL.
    InvalidEndpoint(String),
    /// The HTTP client could not be built.
    Client(String),
    /// Connection refused, DNS failure, timeout.
    Unreachable(String),
    /// Non-success HTTP status.
    Status(u16),
    /// The body was not a `_cat/health` JSON array.
    Malformed(String),
}

impl fmt::Display for HealthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthError::InvalidEndpoint(e) => write!(f, "Invalid Elasticsearch endpoint: {e}"),
            HealthError::Client(e) => write!(f, "HTTP client error: {e}"),
            HealthError::Unreachable(e) => write!(f, "Elasticsearch unreachable: {e}"),
            HealthError::Status(code) => write!(f, "Elasticsearch returned HTTP {code}"),
            HealthError::Malformed(e) => write!(f, "Malformed health response: {e}"),
        }
    }
}

impl std::error::Error for HealthError {}

pub type Result<T> = std::result::Result<T, HealthError>;

// ── Records ──

/// One row of `_cat/health?format=json`. `_cat` reports every column as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub cluster: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(
        default,
        rename = "node.total",
        skip_serializing_if = "Option::is_none"
    )]
    pub node_total: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_shards_percent: Option<String>,
}

impl HealthRecord {
    pub fn new(cluster: impl Into<String>, status: impl Into<String>) -> Self {
        HealthRecord {
            cluster: cluster.into(),
            status: status.into(),
            epoch: None,
            timestamp: None,
            node_total: None,
            active_shards_percent: None,
        }
    }
}

/// Parse a `_cat/health?format=json` response body.
pub fn parse_cat_health(body: &str) -> Result<Vec<HealthRecord>> {
    serde_json::from_str(body).map_err(|e| HealthError::Malformed(e.to_string()))
}

/// The record for `cluster_name`. If several rows carry the name, the last one wins.
pub fn find_cluster<'a>(records: &'a [HealthRecord], cluster_name: &str) -> Option<&'a HealthRecord> {
    records.iter().rev().find(|r| r.cluster == cluster_name)
}

// ── Traits ──

/// A live connection to the monitored service.
pub trait HealthClient {
    /// Liveness check.
    fn ping(&self) -> bool;

    /// Health of every cluster the service reports.
    fn fetch_cluster_health(&self) -> Result<Vec<HealthRecord>>;
}

/// Builds a [`HealthClient`] from a freshly loaded configuration.
pub trait Connector {
    type Client: HealthClient;

    /// `Ok(None)` means no connection parameters are configured.
    fn connect(&self, config: &Config) -> Result<Option<Self::Client>>;
}

// ── Elasticsearch client ──

/// Blocking Elasticsearch client with HTTP basic auth.
#[derive(Clone)]
pub struct ElasticClient {
    http: reqwest::blocking::Client,
    base_url: reqwest::Url,
    user: String,
    pass: String,
}

impl ElasticClient {
    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }
}

/// Build a client from `elastic_credentials`; `Ok(None)` if they are absent.
pub fn connect(config: &Config) -> Result<Option<ElasticClient>> {
    let Some(creds) = &config.elastic_credentials else {
        return Ok(None);
    };

    let url = creds.base_url();
    let base_url =
        reqwest::Url::parse(&url).map_err(|e| HealthError::InvalidEndpoint(format!("{url}: {e}")))?;

    let mut builder = reqwest::blocking::Client::builder();
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    let http = builder
        .build()
        .map_err(|e| HealthError::Client(e.to_string()))?;

    Ok(Some(ElasticClient {
        http,
        base_url,
        user: creds.user.clone(),
        pass: creds.pass.clone(),
    }))
}

impl HealthClient for ElasticClient {
    fn ping(&self) -> bool {
        match self
            .http
            .head(self.base_url.clone())
            .basic_auth(&self.user, Some(&self.pass))
            .send()
        {
            Ok(resp) => {
                log::debug!("ping {} -> {}", self.base_url, resp.status());
                resp.status().is_success()
            }
            Err(e) => {
                log::debug!("ping {} failed: {e}", self.base_url);
                false
            }
        }
    }

    fn fetch_cluster_health(&self) -> Result<Vec<HealthRecord>> {
        let url = self
            .base_url
            .join("_cat/health?format=json")
            .map_err(|e| HealthError::InvalidEndpoint(format!("_cat/health: {e}")))?;

        let resp = self
            .http
            .get(url)
            .basic_auth(&self.user, Some(&self.pass))
            .send()
            .map_err(|e| HealthError::Unreachable(format!("{}: {e}", self.base_url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HealthError::Status(status.as_u16()));
        }

        let body = resp
            .text()
            .map_err(|e| HealthError::Unreachable(format!("reading body: {e}")))?;
        parse_cat_health(&body)
    }
}

/// [`Connector`] for real Elasticsearch endpoints.
#[derive(Debug, Default, Clone, Copy)]
pub struct ElasticConnector;

impl Connector for ElasticConnector {
    type Client = ElasticClient;

    fn connect(&self, config: &Config) -> Result<Option<ElasticClient>> {
        connect(config)
    }
}

// ── Mock service for testing ──

/// In-memory health service for unit and integration tests.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared state of the simulated service.
    #[derive(Debug)]
    pub struct MockService {
        /// What `fetch_cluster_health` returns.
        pub records: Result<Vec<HealthRecord>>,
        /// What `ping` returns.
        pub ping_ok: bool,
        /// If set, `connect` fails with this error.
        pub connect_error: Option<HealthError>,
        pub pings: usize,
        pub fetches: usize,
    }

    /// Connector over a [`MockService`]. Clones share the same service.
    ///
    /// Like the real connector, returns no client when the configuration has
    /// no `elastic_credentials`.
    #[derive(Debug, Clone)]
    pub struct MockConnector {
        pub service: Rc<RefCell<MockService>>,
    }

    impl MockConnector {
        pub fn new(records: Vec<HealthRecord>) -> Self {
            MockConnector {
                service: Rc::new(RefCell::new(MockService {
                    records: Ok(records),
                    ping_ok: true,
                    connect_error: None,
                    pings: 0,
                    fetches: 0,
                })),
            }
        }

        pub fn set_records(&self, records: Vec<HealthRecord>) {
            self.service.borrow_mut().records = Ok(records);
        }

        pub fn set_error(&self, error: HealthError) {
            self.service.borrow_mut().records = Err(error);
        }

        /// Make every following `connect` fail, e.g. with an invalid endpoint.
        pub fn set_connect_error(&self, error: Option<HealthError>) {
            self.service.borrow_mut().connect_error = error;
        }

        pub fn set_ping(&self, ok: bool) {
            self.service.borrow_mut().ping_ok = ok;
        }

        pub fn fetches(&self) -> usize {
            self.service.borrow().fetches
        }

        pub fn pings(&self) -> usize {
            self.service.borrow().pings
        }
    }

    pub struct MockClient {
        service: Rc<RefCell<MockService>>,
    }

    impl HealthClient for MockClient {
        fn ping(&self) -> bool {
            let mut service = self.service.borrow_mut();
            service.pings += 1;
            service.ping_ok
        }

        fn fetch_cluster_health(&self) -> Result<Vec<HealthRecord>> {
            let mut service = self.service.borrow_mut();
            service.fetches += 1;
            service.records.clone()
        }
    }

    impl Connector for MockConnector {
        type Client = MockClient;

        fn connect(&self, config: &Config) -> Result<Option<MockClient>> {
            let service = self.service.borrow();
            if let Some(e) = &service.connect_error {
                return Err(e.clone());
            }
            if config.elastic_credentials.is_none() {
                return Ok(None);
            }
            Ok(Some(MockClient {
                service: Rc::clone(&self.service),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElasticCredentials;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::time::Duration;

    const CAT_HEALTH: &str = r#"[
        {"epoch":"1700000000","timestamp":"12:00:00","cluster":"prod","status":"green",
         "node.total":"3","node.data":"3","shards":"10","pri":"5","relo":"0","init":"0",
         "unassign":"0","pending_tasks":"0","max_task_wait_time":"-","active_shards_percent":"100.0%"}
    ]"#;

    fn config_for(port: u16) -> Config {
        Config {
            cluster_name: Some("prod".into()),
            elastic_credentials: Some(ElasticCredentials {
                protocol: "http".into(),
                host: "127.0.0.1".into(),
                port: port.to_string(),
                user: "elastic".into(),
                pass: "secret".into(),
            }),
            request_timeout_seconds: Some(5),
            ..Config::default()
        }
    }

    /// Serve a single canned HTTP response on localhost. The raw request is
    /// sent back through the returned channel.
    fn serve_once(status: &str, body: &str) -> (u16, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream.write_all(response.as_bytes());
                let _ = tx.send(String::from_utf8_lossy(&request).to_string());
            }
        });
        (port, rx)
    }

    fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    // ── parsing ──

    #[test]
    fn parse_cat_health_rows() {
        let records = parse_cat_health(CAT_HEALTH).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cluster, "prod");
        assert_eq!(records[0].status, "green");
        assert_eq!(records[0].node_total.as_deref(), Some("3"));
        assert_eq!(records[0].active_shards_percent.as_deref(), Some("100.0%"));
    }

    #[test]
    fn parse_empty_array() {
        assert!(parse_cat_health("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_malformed_body() {
        assert!(matches!(
            parse_cat_health("<html>oops</html>"),
            Err(HealthError::Malformed(_))
        ));
        assert!(matches!(
            parse_cat_health(r#"{"error": "x"}"#),
            Err(HealthError::Malformed(_))
        ));
    }

    #[test]
    fn find_cluster_last_match_wins() {
        let records = vec![
            HealthRecord::new("prod", "green"),
            HealthRecord::new("dev", "red"),
            HealthRecord::new("prod", "yellow"),
        ];
        assert_eq!(find_cluster(&records, "prod").unwrap().status, "yellow");
        assert_eq!(find_cluster(&records, "dev").unwrap().status, "red");
        assert!(find_cluster(&records, "qa").is_none());
    }

    // ── connect ──

    #[test]
    fn connect_without_credentials_is_none() {
        let config = Config {
            cluster_name: Some("prod".into()),
            ..Config::default()
        };
        assert!(connect(&config).unwrap().is_none());
    }

    #[test]
    fn connect_builds_base_url() {
        let client = connect(&config_for(9200)).unwrap().unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9200/");
    }

    #[test]
    fn connect_rejects_invalid_url() {
        let mut config = config_for(9200);
        if let Some(creds) = config.elastic_credentials.as_mut() {
            creds.port = "not-a-port".into();
        }
        assert!(matches!(
            connect(&config),
            Err(HealthError::InvalidEndpoint(_))
        ));
    }

    // ── HTTP ──

    #[test]
    fn fetch_sends_authenticated_cat_request() {
        let (port, requests) = serve_once("200 OK", CAT_HEALTH);
        let client = connect(&config_for(port)).unwrap().unwrap();

        let records = client.fetch_cluster_health().unwrap();
        assert_eq!(records, parse_cat_health(CAT_HEALTH).unwrap());

        let request = requests.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(
            request.starts_with("GET /_cat/health?format=json "),
            "got: {request}"
        );
        assert!(
            request.to_lowercase().contains("authorization: basic"),
            "got: {request}"
        );
    }

    #[test]
    fn fetch_non_success_status() {
        let (port, _requests) = serve_once("401 Unauthorized", "{}");
        let client = connect(&config_for(port)).unwrap().unwrap();
        assert_eq!(client.fetch_cluster_health(), Err(HealthError::Status(401)));
    }

    #[test]
    fn fetch_malformed_body() {
        let (port, _requests) = serve_once("200 OK", "not json");
        let client = connect(&config_for(port)).unwrap().unwrap();
        assert!(matches!(
            client.fetch_cluster_health(),
            Err(HealthError::Malformed(_))
        ));
    }

    #[test]
    fn fetch_unreachable() {
        let client = connect(&config_for(closed_port())).unwrap().unwrap();
        assert!(matches!(
            client.fetch_cluster_health(),
            Err(HealthError::Unreachable(_))
        ));
    }

    #[test]
    fn ping_success_and_failure() {
        let (port, requests) = serve_once("200 OK", "");
        let client = connect(&config_for(port)).unwrap().unwrap();
        assert!(client.ping());
        let request = requests.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(request.starts_with("HEAD / "), "got: {request}");

        let client = connect(&config_for(closed_port())).unwrap().unwrap();
        assert!(!client.ping());
    }

    #[test]
    fn ping_non_success_status_is_false() {
        let (port, _requests) = serve_once("503 Service Unavailable", "");
        let client = connect(&config_for(port)).unwrap().unwrap();
        assert!(!client.ping());
    }

    // ── mock ──

    #[test]
    fn mock_connector_mirrors_disabled_monitoring() {
        let connector = mock::MockConnector::new(vec![HealthRecord::new("prod", "green")]);
        let disabled = Config {
            cluster_name: Some("prod".into()),
            ..Config::default()
        };
        assert!(connector.connect(&disabled).unwrap().is_none());
        let client = connector.connect(&config_for(1)).unwrap().unwrap();
        assert_eq!(client.fetch_cluster_health().unwrap().len(), 1);
        assert_eq!(connector.fetches(), 1);
    }

    #[test]
    fn mock_connector_connect_error() {
        let connector = mock::MockConnector::new(vec![]);
        connector.set_connect_error(Some(HealthError::InvalidEndpoint("bad".into())));
        assert!(matches!(
            connector.connect(&config_for(1)),
            Err(HealthError::InvalidEndpoint(_))
        ));
        connector.set_connect_error(None);
        assert!(connector.connect(&config_for(1)).unwrap().is_some());
    }
}
