use anyhow::{Context, Result};
use futures_util::TryStreamExt;
use phylosync_core::{
    ConfigResponse, NodeId, NodesResponse, SearchItem, SearchResponse, ViewportBounds, XType,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

use crate::net::sse::SseCodec;
use crate::util::config::ClientConfig;

pub type EventStream = FramedRead<Pin<Box<dyn AsyncRead + Send>>, SseCodec>;

/// Typed access to the tree backend for one session id.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: Url,
    sid: String,
    zero_bound_is_absent: bool,
}

impl BackendClient {
    pub fn new(cfg: &ClientConfig, sid: impl Into<String>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = cfg.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("build http client")?;
        let mut base = Url::parse(&cfg.backend_url)
            .with_context(|| format!("invalid backend url {}", cfg.backend_url))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http,
            base,
            sid: sid.into(),
            zero_bound_is_absent: cfg.zero_bound_is_absent,
        })
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    fn endpoint(&self, path: &str) -> Url {
        // base always ends in '/', and every path here is relative
        self.base.join(path).unwrap_or_else(|_| self.base.clone())
    }

    fn push_bounds(&self, url: &mut Url, bounds: &ViewportBounds) {
        if let Some([min_x, max_x, min_y, max_y]) = bounds.quad(self.zero_bound_is_absent) {
            url.query_pairs_mut()
                .append_pair("min_x", &min_x.to_string())
                .append_pair("max_x", &max_x.to_string())
                .append_pair("min_y", &min_y.to_string())
                .append_pair("max_y", &max_y.to_string());
        }
    }

    pub fn nodes_url(&self, bounds: &ViewportBounds) -> Url {
        let mut url = self.endpoint("nodes/");
        url.query_pairs_mut()
            .append_pair("type", "leaves")
            .append_pair("sid", &self.sid);
        self.push_bounds(&mut url, bounds);
        if let Some(x_type) = bounds.x_type {
            url.query_pairs_mut().append_pair("xType", x_type.as_str());
        }
        url
    }

    pub fn search_url(&self, item: &SearchItem, bounds: &ViewportBounds) -> Result<Url> {
        let json = serde_json::to_string(item).context("serialize search query")?;
        let mut url = self.endpoint("search/");
        url.query_pairs_mut()
            .append_pair("json", &json)
            .append_pair("sid", &self.sid);
        self.push_bounds(&mut url, bounds);
        let x_type = bounds.x_type.unwrap_or(XType::XDist);
        url.query_pairs_mut().append_pair("xType", x_type.as_str());
        Ok(url)
    }

    pub fn details_url(&self, node_id: NodeId) -> Url {
        let mut url = self.endpoint("node_details/");
        url.query_pairs_mut()
            .append_pair("id", &node_id.to_string())
            .append_pair("sid", &self.sid);
        url
    }

    pub fn config_url(&self) -> Url {
        let mut url = self.endpoint("config/");
        url.query_pairs_mut().append_pair("sid", &self.sid);
        url
    }

    pub fn mutations_url(&self) -> Url {
        let mut url = self.endpoint("mutations/");
        url.query_pairs_mut().append_pair("sid", &self.sid);
        url
    }

    pub fn tip_atts_url(&self, node_id: NodeId, key: &str) -> Url {
        let mut url = self.endpoint("tip_atts");
        url.query_pairs_mut()
            .append_pair("id", &node_id.to_string())
            .append_pair("att", key)
            .append_pair("sid", &self.sid);
        url
    }

    /// Navigation target only; never fetched here.
    pub fn nextstrain_json_url(&self, node_id: NodeId) -> Url {
        self.endpoint(&format!("nextstrain_json/{node_id}"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        tracing::debug!(%url, "GET {what}");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("{what} request failed"))?
            .error_for_status()
            .with_context(|| format!("{what} returned an error status"))?;
        resp.json::<T>()
            .await
            .with_context(|| format!("{what} response was not valid JSON"))
    }

    pub async fn query_nodes(&self, bounds: &ViewportBounds) -> Result<NodesResponse> {
        self.get_json(self.nodes_url(bounds), "node query").await
    }

    pub async fn single_search(&self, item: &SearchItem, bounds: &ViewportBounds) -> Result<SearchResponse> {
        let url = self.search_url(item, bounds)?;
        self.get_json(url, "search").await
    }

    pub async fn fetch_config(&self) -> Result<ConfigResponse> {
        let value: Value = self.get_json(self.config_url(), "config").await?;
        ConfigResponse::from_value(value).context("config payload has unexpected shape")
    }

    pub async fn fetch_node_details(&self, node_id: NodeId) -> Result<Value> {
        self.get_json(self.details_url(node_id), "node details").await
    }

    pub async fn fetch_tip_attribute(&self, node_id: NodeId, key: &str) -> Result<Value> {
        self.get_json(self.tip_atts_url(node_id, key), "tip attribute").await
    }

    pub async fn open_mutation_stream(&self) -> Result<EventStream> {
        let url = self.mutations_url();
        tracing::debug!(%url, "opening mutation stream");
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .context("mutation stream request failed")?
            .error_for_status()
            .context("mutation stream returned an error status")?;
        let body = resp.bytes_stream().map_err(std::io::Error::other);
        let reader: Pin<Box<dyn AsyncRead + Send>> = Box::pin(StreamReader::new(body));
        Ok(FramedRead::new(reader, SseCodec::default()))
    }
}
