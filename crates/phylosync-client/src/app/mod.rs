use crossbeam_channel::{Receiver, Sender};
use phylosync_core::NodeId;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::graph::SyncState;
use crate::net::{self, BackendClient, Incoming, Request};

pub mod args;
pub mod events;

use events::SessionEvent;

/// One tree session: the network side, the state it feeds, and the loop between them.
pub struct Session {
    rt: Handle,
    client: BackendClient,
    tx: Sender<Incoming>,
    rx: Receiver<Incoming>,
    shutdown: CancellationToken,
    drain_limit: usize,
    pub state: SyncState,
}

impl Session {
    pub fn new(rt: Handle, client: BackendClient, state: SyncState, drain_limit: usize) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            rt,
            client,
            tx,
            rx,
            shutdown: CancellationToken::new(),
            drain_limit: drain_limit.max(1),
            state,
        }
    }

    /// Kicks off the config fetch and mutation stream.
    pub fn start(&self) {
        tracing::info!(sid = self.client.sid(), "starting session");
        net::spawn_config_stream(&self.rt, self.client.clone(), self.tx.clone(), self.shutdown.clone());
    }

    /// One tick: apply what arrived, then start whatever the state now wants.
    pub fn pump(&mut self, now: Instant) -> Vec<SessionEvent> {
        let batch: Vec<Incoming> = self.rx.try_iter().take(self.drain_limit).collect();
        for msg in batch {
            self.state.apply(msg, now);
        }
        for req in self.state.poll_requests(now) {
            self.dispatch(req);
        }
        self.state.tick_metrics(now);
        self.state.drain_events()
    }

    fn dispatch(&self, req: Request) {
        net::spawn_request(&self.rt, &self.client, &self.tx, req);
    }

    /// Navigation is left to the shell; the URL comes back as an event.
    pub fn open_nextstrain_json(&self, node_id: NodeId) -> SessionEvent {
        SessionEvent::Navigate(self.client.nextstrain_json_url(node_id).to_string())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
