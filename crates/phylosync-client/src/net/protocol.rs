use phylosync_core::{
    ConfigResponse, NodeId, NodesResponse, SearchItem, SearchItemId, SearchResponse, StreamPayload,
    ViewportBounds, XType,
};
use serde_json::Value;

use crate::graph::details::{DetailSlot, TipKey};
use crate::graph::slot::RequestHandle;

/// Completed network work, delivered to the session loop.
///
/// Errors are already rendered to strings; cancelled requests never produce one.
#[derive(Debug, Clone)]
pub enum Incoming {
    Config(Result<ConfigResponse, String>),
    StreamOpened,
    Stream(StreamPayload),
    StreamFailed(String),
    Nodes {
        generation: u64,
        x_type: XType,
        result: Result<NodesResponse, String>,
    },
    Search {
        id: SearchItemId,
        generation: u64,
        x_type: XType,
        result: Result<SearchResponse, String>,
    },
    Details {
        which: DetailSlot,
        generation: u64,
        node_id: NodeId,
        result: Result<Value, String>,
    },
    TipAttribute {
        key: TipKey,
        generation: u64,
        result: Result<Value, String>,
    },
}

impl Incoming {
    pub fn nodes(generation: u64, x_type: XType, result: anyhow::Result<NodesResponse>) -> Self {
        Self::Nodes {
            generation,
            x_type,
            result: result.map_err(render),
        }
    }

    pub fn search(
        id: SearchItemId,
        generation: u64,
        x_type: XType,
        result: anyhow::Result<SearchResponse>,
    ) -> Self {
        Self::Search {
            id,
            generation,
            x_type,
            result: result.map_err(render),
        }
    }

    pub fn details(which: DetailSlot, generation: u64, node_id: NodeId, result: anyhow::Result<Value>) -> Self {
        Self::Details {
            which,
            generation,
            node_id,
            result: result.map_err(render),
        }
    }

    pub fn tip_attribute(key: TipKey, generation: u64, result: anyhow::Result<Value>) -> Self {
        Self::TipAttribute {
            key,
            generation,
            result: result.map_err(render),
        }
    }

    pub fn config(result: anyhow::Result<ConfigResponse>) -> Self {
        Self::Config(result.map_err(render))
    }

    pub fn stream_failed(err: anyhow::Error) -> Self {
        Self::StreamFailed(render(err))
    }
}

fn render(err: anyhow::Error) -> String {
    format!("{err:#}")
}

/// Work the state wants started; the session turns each into a spawned task.
#[derive(Debug)]
pub enum Request {
    Nodes {
        handle: RequestHandle,
        bounds: ViewportBounds,
        x_type: XType,
    },
    Search {
        handle: RequestHandle,
        item: SearchItem,
        bounds: ViewportBounds,
        x_type: XType,
    },
    Details {
        which: DetailSlot,
        handle: RequestHandle,
        node_id: NodeId,
    },
    TipAttribute {
        key: TipKey,
        handle: RequestHandle,
    },
}
