use anyhow::anyhow;
use crossbeam_channel::Sender;
use futures_util::StreamExt;
use phylosync_core::{ConfigResponse, StreamPayload};
use std::future::Future;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::net::{BackendClient, Incoming, Request};

/// Runs `fut` unless `token` fires first; a cancelled task sends nothing.
fn spawn_guarded<F>(rt: &Handle, token: CancellationToken, tx: Sender<Incoming>, fut: F)
where
    F: Future<Output = Incoming> + Send + 'static,
{
    rt.spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            inc = fut => {
                if !token.is_cancelled() {
                    let _ = tx.send(inc);
                }
            }
        }
    });
}

/// Starts the network work behind one [`Request`].
pub fn spawn_request(rt: &Handle, client: &BackendClient, tx: &Sender<Incoming>, req: Request) {
    let client = client.clone();
    let tx = tx.clone();
    match req {
        Request::Nodes {
            handle,
            bounds,
            x_type,
        } => {
            let generation = handle.generation();
            spawn_guarded(rt, handle.token().clone(), tx, async move {
                Incoming::nodes(generation, x_type, client.query_nodes(&bounds).await)
            });
        }
        Request::Search {
            handle,
            item,
            bounds,
            x_type,
        } => {
            let generation = handle.generation();
            spawn_guarded(rt, handle.token().clone(), tx, async move {
                let result = client.single_search(&item, &bounds).await;
                Incoming::search(item.id, generation, x_type, result)
            });
        }
        Request::Details {
            which,
            handle,
            node_id,
        } => {
            let generation = handle.generation();
            spawn_guarded(rt, handle.token().clone(), tx, async move {
                Incoming::details(which, generation, node_id, client.fetch_node_details(node_id).await)
            });
        }
        Request::TipAttribute { key, handle } => {
            let generation = handle.generation();
            spawn_guarded(rt, handle.token().clone(), tx, async move {
                let result = client.fetch_tip_attribute(key.node_id, &key.key).await;
                Incoming::tip_attribute(key, generation, result)
            });
        }
    }
}

/// Fetches the base config, then follows the mutation stream until `END` or failure.
pub fn spawn_config_stream(rt: &Handle, client: BackendClient, tx: Sender<Incoming>, shutdown: CancellationToken) {
    rt.spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("config stream cancelled");
            }
            _ = run_config_stream(client, tx) => {}
        }
    });
}

async fn run_config_stream(client: BackendClient, tx: Sender<Incoming>) {
    let config = client.fetch_config().await;
    let proceed = matches!(config, Ok(ConfigResponse::Ready(_)));
    let _ = tx.send(Incoming::config(config));
    if !proceed {
        return;
    }

    let mut events = match client.open_mutation_stream().await {
        Ok(events) => events,
        Err(err) => {
            let _ = tx.send(Incoming::stream_failed(err));
            return;
        }
    };
    let _ = tx.send(Incoming::StreamOpened);

    while let Some(frame) = events.next().await {
        let event = match frame {
            Ok(event) => event,
            Err(err) => {
                let err = anyhow::Error::new(err).context("mutation stream read failed");
                let _ = tx.send(Incoming::stream_failed(err));
                return;
            }
        };
        let payload = StreamPayload::parse(&event.data);
        let done = payload == StreamPayload::End;
        if tx.send(Incoming::Stream(payload)).is_err() {
            return;
        }
        if done {
            return;
        }
    }
    let _ = tx.send(Incoming::stream_failed(anyhow!(
        "mutation stream closed before END"
    )));
}
