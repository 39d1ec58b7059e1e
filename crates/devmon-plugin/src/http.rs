//! HTTP plugin client
//!
//! Speaks a JSON rendering of the plugin API over HTTP:
//!
//! | call          | request                                   |
//! |---------------|-------------------------------------------|
//! | metadata      | `GET  /v1/metadata`                       |
//! | version       | `GET  /v1/version`                        |
//! | health        | `GET  /v1/health`                         |
//! | devices       | `GET  /v1/devices`                        |
//! | read          | `POST /v1/read` `{tags}` or `{device}`    |
//! | read_cache    | `GET  /v1/readcache?start=&end=`          |
//! | write_async   | `POST /v1/write/async` `{device, data}`   |
//! | write_sync    | `POST /v1/write/sync` `{device, data}`    |
//! | transaction   | `GET  /v1/transaction/{id}`               |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devmon_core::{
    Device, PluginClient, PluginConnector, PluginError, PluginHealth, PluginMetadata,
    PluginResult, PluginVersion, Protocol, ReadFilter, Reading, ReadingStream, TransactionStatus,
    WritePayload, WriteTransaction,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum ReadRequest<'a> {
    Tags(&'a [String]),
    Device(&'a str),
}

#[derive(Serialize)]
struct WriteRequest<'a> {
    device: &'a str,
    data: &'a [WritePayload],
}

#[derive(Deserialize)]
struct PluginErrorResp {
    #[serde(default)]
    message: String,
}

fn map_reqwest(err: reqwest::Error) -> PluginError {
    if err.is_timeout() {
        PluginError::Timeout(err.to_string())
    } else if err.is_decode() {
        PluginError::Decode(err.to_string())
    } else {
        PluginError::Transport(err.to_string())
    }
}

/// Plugin client over HTTP/JSON
#[derive(Debug, Clone)]
pub struct HttpPluginClient {
    client: Client,
    base_url: Url,
}

impl HttpPluginClient {
    /// Create a client for the plugin at `address` ("host:port").
    ///
    /// `timeout` bounds every call made through this client.
    pub fn new(address: &str, timeout: Duration) -> PluginResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(map_reqwest)?;

        let base = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };
        let base_url = Url::parse(&base)
            .map_err(|e| PluginError::Transport(format!("invalid address '{}': {}", address, e)))?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> PluginResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PluginError::Transport(format!("invalid path '{}': {}", path, e)))
    }

    /// URL of a transaction, with the ID escaped as a single path segment
    fn transaction_url(&self, id: &str) -> PluginResult<Url> {
        let mut url = self.url("/v1/transaction")?;
        url.path_segments_mut()
            .map_err(|_| {
                PluginError::Transport(format!("cannot append path to '{}'", self.base_url))
            })?
            .push(id);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> PluginResult<T> {
        self.get_url(self.url(path)?).await
    }

    async fn get_url<T: DeserializeOwned>(&self, url: Url) -> PluginResult<T> {
        let response = self.client.get(url).send().await.map_err(map_reqwest)?;
        self.handle_response(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> PluginResult<T> {
        let url = self.url(path)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest)?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> PluginResult<T> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| {
                PluginError::Decode(format!("{}: {}", std::any::type_name::<T>(), e))
            });
        }

        let message = match response.json::<PluginErrorResp>().await {
            Ok(body) if !body.message.is_empty() => body.message,
            _ => status.canonical_reason().unwrap_or("unknown").to_string(),
        };
        debug!(status = status.as_u16(), %message, "Plugin returned error");

        if status.is_server_error() {
            Err(PluginError::Unavailable(format!(
                "{} ({})",
                message,
                status.as_u16()
            )))
        } else {
            Err(PluginError::Rejected {
                code: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl PluginClient for HttpPluginClient {
    #[instrument(skip(self))]
    async fn metadata(&self) -> PluginResult<PluginMetadata> {
        self.get("/v1/metadata").await
    }

    #[instrument(skip(self))]
    async fn version(&self) -> PluginResult<PluginVersion> {
        self.get("/v1/version").await
    }

    #[instrument(skip(self))]
    async fn health(&self) -> PluginResult<PluginHealth> {
        self.get("/v1/health").await
    }

    #[instrument(skip(self))]
    async fn devices(&self) -> PluginResult<Vec<Device>> {
        self.get("/v1/devices").await
    }

    #[instrument(skip(self))]
    async fn read(&self, filter: &ReadFilter) -> PluginResult<Vec<Reading>> {
        let body = match filter {
            ReadFilter::Tags(tags) => ReadRequest::Tags(tags),
            ReadFilter::Device(id) => ReadRequest::Device(id),
        };
        self.post("/v1/read", &body).await
    }

    #[instrument(skip(self))]
    async fn read_cache(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> PluginResult<ReadingStream> {
        let mut url = self.url("/v1/readcache")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(start) = start {
                query.append_pair("start", start);
            }
            if let Some(end) = end {
                query.append_pair("end", end);
            }
        }
        let response = self.client.get(url).send().await.map_err(map_reqwest)?;
        let readings: Vec<Reading> = self.handle_response(response).await?;
        Ok(Box::pin(futures::stream::iter(
            readings.into_iter().map(Ok),
        )))
    }

    #[instrument(skip(self, payloads))]
    async fn write_async(
        &self,
        device_id: &str,
        payloads: &[WritePayload],
    ) -> PluginResult<Vec<WriteTransaction>> {
        let body = WriteRequest {
            device: device_id,
            data: payloads,
        };
        self.post("/v1/write/async", &body).await
    }

    #[instrument(skip(self, payloads))]
    async fn write_sync(
        &self,
        device_id: &str,
        payloads: &[WritePayload],
    ) -> PluginResult<Vec<TransactionStatus>> {
        let body = WriteRequest {
            device: device_id,
            data: payloads,
        };
        self.post("/v1/write/sync", &body).await
    }

    #[instrument(skip(self))]
    async fn transaction(&self, id: &str) -> PluginResult<TransactionStatus> {
        self.get_url(self.transaction_url(id)?).await
    }
}

/// Connector producing `HttpPluginClient`s with a fixed per-call timeout
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PluginConnector for HttpConnector {
    async fn connect(
        &self,
        address: &str,
        protocol: Protocol,
    ) -> PluginResult<Arc<dyn PluginClient>> {
        match protocol {
            Protocol::Tcp => {
                let client: Arc<dyn PluginClient> =
                    Arc::new(HttpPluginClient::new(address, self.timeout)?);
                Ok(client)
            }
            Protocol::Unix => Err(PluginError::Unsupported(format!(
                "unix socket plugins are not supported by the HTTP connector: {}",
                address
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_from_host_port() {
        let client = HttpPluginClient::new("10.0.0.5:5001", Duration::from_secs(3)).unwrap();
        assert_eq!(
            client.url("/v1/devices").unwrap().as_str(),
            "http://10.0.0.5:5001/v1/devices"
        );
    }

    #[test]
    fn base_url_keeps_scheme() {
        let client =
            HttpPluginClient::new("https://plugin.local:5001", Duration::from_secs(3)).unwrap();
        assert_eq!(
            client.url("/v1/health").unwrap().as_str(),
            "https://plugin.local:5001/v1/health"
        );
    }

    #[test]
    fn transaction_id_is_one_escaped_segment() {
        let client = HttpPluginClient::new("10.0.0.5:5001", Duration::from_secs(3)).unwrap();
        assert_eq!(
            client.transaction_url("t-1").unwrap().as_str(),
            "http://10.0.0.5:5001/v1/transaction/t-1"
        );
        assert_eq!(
            client.transaction_url("a/b?c#d").unwrap().as_str(),
            "http://10.0.0.5:5001/v1/transaction/a%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn read_request_shape() {
        let tags = vec!["default/led".to_string()];
        assert_eq!(
            serde_json::to_value(ReadRequest::Tags(&tags)).unwrap(),
            serde_json::json!({"tags": ["default/led"]})
        );
        assert_eq!(
            serde_json::to_value(ReadRequest::Device("abc")).unwrap(),
            serde_json::json!({"device": "abc"})
        );
    }

    #[tokio::test]
    async fn unix_sockets_are_unsupported() {
        let connector = HttpConnector::new(Duration::from_secs(1));
        let err = connector
            .connect("/tmp/plugin.sock", Protocol::Unix)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::Unsupported(_)));
    }
}
