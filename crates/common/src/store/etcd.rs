//! etcd v2 keys API client
//!
//! Every read is `GET {endpoint}/v2/keys{key}?recursive=true`, with
//! `quorum=true` added for strong consistency. Endpoints are tried in order
//! and the next one is only asked when the previous could not be reached.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{is_key_not_found, ChildKey, Consistency, KeyStore, Lookup, StoreError};

/// Endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:2379";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct EtcdConfig {
    pub endpoints: Vec<Url>,
    pub consistency: Consistency,
    pub request_timeout: Duration,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")],
            consistency: Consistency::Weak,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EtcdClient {
    endpoints: Vec<Url>,
    consistency: Consistency,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    node: Option<RawNode>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    // The root node carries no key
    #[serde(default)]
    key: String,
    #[serde(default)]
    dir: bool,
    value: Option<String>,
    #[serde(default)]
    nodes: Option<Vec<RawNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error_code: u64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    cause: String,
}

impl RawNode {
    fn into_lookup(self) -> Lookup {
        if self.dir {
            let children = self
                .nodes
                .unwrap_or_default()
                .into_iter()
                .map(|child| ChildKey {
                    key: child.key,
                    is_dir: child.dir,
                })
                .collect();
            Lookup::Directory { children }
        } else {
            Lookup::Leaf {
                value: self.value.unwrap_or_default().into_bytes(),
            }
        }
    }
}

impl EtcdClient {
    pub fn new(config: EtcdConfig) -> Result<Self, StoreError> {
        if config.endpoints.is_empty() {
            return Err(StoreError::NoEndpoints);
        }
        for endpoint in &config.endpoints {
            if endpoint.cannot_be_a_base() || !matches!(endpoint.scheme(), "http" | "https") {
                return Err(StoreError::InvalidEndpoint(endpoint.to_string()));
            }
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(StoreError::Client)?;

        Ok(Self {
            endpoints: config.endpoints,
            consistency: config.consistency,
            client,
        })
    }

    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    /// Build the keys API URL for `key` on `endpoint`
    pub fn key_url(&self, endpoint: &Url, key: &str) -> Result<Url, StoreError> {
        let mut url = endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::InvalidEndpoint(endpoint.to_string()))?;
            segments.pop_if_empty().push("v2").push("keys");
            let mut pushed = false;
            for segment in key.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
                pushed = true;
            }
            if !pushed {
                segments.push("");
            }
        }

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("recursive", "true");
            // Children come back in key order, so listings are stable across reads
            query.append_pair("sorted", "true");
            if self.consistency == Consistency::Strong {
                query.append_pair("quorum", "true");
            }
        }

        Ok(url)
    }

    async fn get_from(&self, endpoint: &Url, key: &str) -> Result<Lookup, StoreError> {
        let url = self.key_url(endpoint, key)?;
        let transport = |source| StoreError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;

        if status.is_success() {
            let parsed: GetResponse =
                serde_json::from_slice(&body).map_err(|e| StoreError::Malformed {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;
            let node = parsed.node.ok_or_else(|| StoreError::Malformed {
                key: key.to_string(),
                reason: "response carried no node".to_string(),
            })?;
            return Ok(node.into_lookup());
        }

        match serde_json::from_slice::<ErrorBody>(&body) {
            Ok(body) => {
                let err = StoreError::Etcd {
                    code: body.error_code,
                    message: body.message,
                    key: if body.cause.is_empty() {
                        key.to_string()
                    } else {
                        body.cause
                    },
                };
                if is_key_not_found(&err) {
                    Ok(Lookup::NotFound)
                } else {
                    Err(err)
                }
            }
            Err(_) => Err(StoreError::Status {
                status,
                endpoint: endpoint.to_string(),
            }),
        }
    }
}

#[async_trait]
impl KeyStore for EtcdClient {
    async fn get(&self, key: &str) -> Result<Lookup, StoreError> {
        let mut last_err = StoreError::NoEndpoints;

        for endpoint in &self.endpoints {
            match self.get_from(endpoint, key).await {
                Err(err @ StoreError::Transport { .. }) => {
                    tracing::warn!(%endpoint, key, "etcd endpoint unreachable: {}", err);
                    last_err = err;
                }
                result => return result,
            }
        }

        Err(last_err)
    }
}
