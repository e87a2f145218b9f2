use phylosync_core::{ColorBy, ConfigPayload, ConfigResponse, StreamPayload, ViewportBounds, XType};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app::events::SessionEvent;
use crate::graph::color::{ColorEngine, Rgb};
use crate::graph::details::{DetailsIssue, DetailsResolver};
use crate::graph::dictionary::MutationDictionary;
use crate::graph::model::{resolve_batch, LabelDictionaries, NodeSet, SessionConfig};
use crate::graph::search::{SearchManager, SearchResult};
use crate::graph::viewport::{ViewState, ViewportCoordinator};
use crate::net::{Incoming, Request};
use crate::util::config::ClientConfig;

pub struct CfgState {
    pub debounce: Duration,
    pub default_x_type: XType,
    pub url_on_fail: Option<String>,
}

impl Default for CfgState {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            default_x_type: XType::XDist,
            url_on_fail: None,
        }
    }
}

#[derive(Default)]
pub struct PerfState {
    pub messages_total: u64,
    pub message_rate: f32,
    pub msg_window: VecDeque<Instant>,
}

#[derive(Debug, Default)]
enum ConfigPhase {
    #[default]
    Loading,
    /// Base config received, waiting for the dictionary to finish.
    Streaming(Box<ConfigPayload>),
    Ready(Arc<SessionConfig>),
    Unavailable,
}

/// All client-side derived state. Mutated only from the session loop.
pub struct SyncState {
    pub cfg: CfgState,
    pub perf: PerfState,
    config: ConfigPhase,
    pub dictionary: MutationDictionary,
    pub nodes: NodeSet,
    pub viewport: ViewportCoordinator,
    pub search: SearchManager,
    pub details: DetailsResolver,
    color_by: ColorBy,
    colors: ColorEngine,
    status: Option<String>,
    outbox: Vec<SessionEvent>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(CfgState::default(), SearchManager::default())
    }
}

impl SyncState {
    pub fn new(cfg: CfgState, search: SearchManager) -> Self {
        Self {
            viewport: ViewportCoordinator::new(cfg.debounce),
            cfg,
            perf: PerfState::default(),
            config: ConfigPhase::Loading,
            dictionary: MutationDictionary::default(),
            nodes: NodeSet::default(),
            search,
            details: DetailsResolver::default(),
            color_by: ColorBy::default(),
            colors: ColorEngine::default(),
            status: None,
            outbox: Vec::new(),
        }
    }

    pub fn from_client_config(cfg: &ClientConfig) -> Self {
        Self::new(
            CfgState {
                debounce: Duration::from_millis(cfg.debounce_ms),
                default_x_type: cfg.default_x_type,
                url_on_fail: cfg.url_on_fail.clone(),
            },
            SearchManager::new(cfg.palette.clone()),
        )
    }

    /// Present once the dictionary is final; node and search queries wait for it.
    pub fn session_config(&self) -> Option<&Arc<SessionConfig>> {
        match &self.config {
            ConfigPhase::Ready(cfg) => Some(cfg),
            _ => None,
        }
    }

    pub fn config_unavailable(&self) -> bool {
        matches!(self.config, ConfigPhase::Unavailable)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn alert(&mut self, msg: impl Into<String>) {
        self.outbox.push(SessionEvent::Alert(msg.into()));
    }

    fn set_status(&mut self, status: Option<String>) {
        if self.status != status {
            self.status = status.clone();
            self.outbox.push(SessionEvent::Status(status));
        }
    }

    // ----- Inputs from the shell -----

    /// A view without its own axis kind uses the configured default.
    pub fn report_view_state(&mut self, view: &ViewState, now: Instant) {
        let mut bounds = view.bounds();
        bounds.x_type = Some(self.axis(&bounds));
        self.viewport.report(bounds, now);
    }

    fn axis(&self, bounds: &ViewportBounds) -> XType {
        bounds.x_type.unwrap_or(self.cfg.default_x_type)
    }

    pub fn set_color_by(&mut self, color_by: ColorBy) {
        self.color_by = color_by;
    }

    pub fn color_by(&self) -> &ColorBy {
        &self.color_by
    }

    /// Re-issues the node query for the current bounds once the debounce period has passed.
    pub fn refresh_nodes(&mut self, now: Instant) {
        self.viewport.request_refresh(now);
    }

    // ----- Apply incoming network data -----

    pub fn apply(&mut self, inc: Incoming, now: Instant) {
        self.on_message(now);
        match inc {
            Incoming::Config(result) => self.apply_config(result),
            Incoming::StreamOpened => self.dictionary.open(),
            Incoming::Stream(StreamPayload::Chunk(records)) => {
                let n = records.len();
                if self.dictionary.append(records) {
                    tracing::debug!(records = n, total = self.dictionary.len(), "received mutation chunk");
                    self.set_status(Some(format!(
                        "Loading mutations: {} received",
                        self.dictionary.len()
                    )));
                }
            }
            Incoming::Stream(StreamPayload::Malformed(reason)) => {
                self.dictionary.reject_chunk(&reason);
            }
            Incoming::Stream(StreamPayload::End) => {
                tracing::info!(records = self.dictionary.len(), "finished receiving mutations");
                self.dictionary.complete();
                self.finalize_config();
            }
            Incoming::StreamFailed(err) => {
                tracing::error!(error = %err, records = self.dictionary.len(), "mutation stream failed");
                self.dictionary.fail();
                self.finalize_config();
            }
            Incoming::Nodes {
                generation,
                x_type,
                result,
            } => {
                if !self.viewport.accept(generation) {
                    tracing::debug!(generation, "discarding superseded node batch");
                    return;
                }
                match result {
                    Ok(resp) => {
                        let Some(cfg) = self.session_config().cloned() else {
                            tracing::warn!("node batch arrived before config; dropping");
                            return;
                        };
                        tracing::debug!(nodes = resp.nodes.len(), "node batch applied");
                        self.nodes.replace(resolve_batch(resp.nodes, x_type, &cfg));
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "node query failed");
                        self.alert(err);
                        self.nodes.clear();
                        self.viewport.request_refresh(now);
                        self.outbox.push(SessionEvent::RefreshRequested);
                    }
                }
            }
            Incoming::Search {
                id,
                generation,
                x_type,
                result,
            } => {
                let (result, err) = match result {
                    Ok(resp) => (SearchResult::from_response(resp, x_type), None),
                    Err(err) => (SearchResult::default(), Some(err)),
                };
                if self.search.apply(&id, generation, result) {
                    if let Some(err) = err {
                        tracing::error!(id = %id.0, error = %err, "search failed");
                        self.alert(err);
                    }
                }
            }
            Incoming::Details {
                which,
                generation,
                node_id,
                result,
            } => {
                let (data, err) = split(result);
                if self.details.apply(which, generation, node_id, data) {
                    if let Some(err) = err {
                        tracing::error!(slot = which.as_str(), node = %node_id, error = %err, "detail fetch failed");
                        self.alert(err);
                    }
                }
            }
            Incoming::TipAttribute {
                key,
                generation,
                result,
            } => {
                let (value, err) = split(result);
                if self.details.apply_tip(&key, generation, value) {
                    if let Some(err) = err {
                        tracing::error!(node = %key.node_id, key = %key.key, error = %err, "tip attribute fetch failed");
                        self.alert(err);
                    }
                }
            }
        }
    }

    fn apply_config(&mut self, result: Result<ConfigResponse, String>) {
        if !matches!(self.config, ConfigPhase::Loading) {
            tracing::warn!("ignoring repeated config delivery");
            return;
        }
        match result {
            Ok(ConfigResponse::Ready(mut payload)) => {
                tracing::info!(root = %payload.root_id, inline_mutations = payload.mutations.len(), "got config");
                self.dictionary.seed(std::mem::take(&mut payload.mutations));
                self.config = ConfigPhase::Streaming(Box::new(payload));
                self.set_status(Some("Loading mutations".to_string()));
            }
            Ok(ConfigResponse::Error(msg)) => {
                tracing::error!(error = %msg, "backend reported config error");
                match self.cfg.url_on_fail.clone() {
                    Some(url) => {
                        self.alert(format!("{msg}\nRedirecting you."));
                        self.outbox.push(SessionEvent::Navigate(url));
                    }
                    None => self.alert(msg),
                }
                self.mark_unavailable();
            }
            Err(err) => {
                tracing::error!(error = %err, "error fetching config");
                if let Some(url) = self.cfg.url_on_fail.clone() {
                    self.alert("Failed to fetch config. Redirecting you.");
                    self.outbox.push(SessionEvent::Navigate(url));
                }
                self.mark_unavailable();
            }
        }
    }

    fn mark_unavailable(&mut self) {
        self.config = ConfigPhase::Unavailable;
        self.set_status(None);
        self.outbox.push(SessionEvent::ConfigUnavailable);
    }

    fn finalize_config(&mut self) {
        let phase = self.dictionary.phase();
        match std::mem::take(&mut self.config) {
            ConfigPhase::Streaming(payload) => {
                let cfg = SessionConfig::from_payload(*payload, self.dictionary.snapshot());
                tracing::info!(
                    mutations = cfg.dictionary.len(),
                    genes = cfg.all_genes.len(),
                    ?phase,
                    "config ready"
                );
                self.config = ConfigPhase::Ready(Arc::new(cfg));
                self.outbox.push(SessionEvent::DictionaryFinal(phase));
                self.outbox.push(SessionEvent::ConfigReady);
                self.set_status(None);
            }
            other => {
                tracing::warn!(?phase, "mutation stream finished without a pending config");
                self.config = other;
            }
        }
    }

    // ----- Outgoing requests -----

    /// Requests to start now. Node and search queries wait for the session config.
    pub fn poll_requests(&mut self, now: Instant) -> Vec<Request> {
        let ready = self.session_config().is_some();
        let x_type = self.cfg.default_x_type;
        let mut out = Vec::new();

        let before = self.viewport.current_bounds(x_type);
        if let Some((handle, bounds)) = self.viewport.poll(now, ready, x_type) {
            out.push(Request::Nodes {
                handle,
                x_type: self.axis(&bounds),
                bounds,
            });
        }
        let bounds = self.viewport.current_bounds(x_type);
        let search_x_type = self.axis(&bounds);
        if bounds != before {
            self.search.invalidate_all();
        }

        for issue in self.search.poll(ready) {
            out.push(Request::Search {
                handle: issue.handle,
                item: issue.item,
                bounds,
                x_type: search_x_type,
            });
        }

        for issue in self.details.poll() {
            out.push(match issue {
                DetailsIssue::Node {
                    which,
                    handle,
                    node_id,
                } => Request::Details {
                    which,
                    handle,
                    node_id,
                },
                DetailsIssue::TipAttribute { key, handle } => Request::TipAttribute { key, handle },
            });
        }
        out
    }

    // ----- Derived data -----

    pub fn node_colors(&mut self) -> Arc<HashMap<phylosync_core::NodeId, Rgb>> {
        let empty = LabelDictionaries::default();
        let labels = match &self.config {
            ConfigPhase::Ready(cfg) => &cfg.labels,
            _ => &empty,
        };
        self.colors.colors(&self.nodes, &self.color_by, labels)
    }

    /// Nothing in flight and nothing waiting to be issued.
    pub fn is_idle(&self) -> bool {
        if self.config_unavailable() {
            return true;
        }
        matches!(self.config, ConfigPhase::Ready(_))
            && !self.viewport.in_flight()
            && !self.viewport.has_pending_change()
            && !self.search.any_in_flight()
            && !self.details.any_in_flight()
    }
}

fn split<T>(result: Result<T, String>) -> (Option<T>, Option<String>) {
    match result {
        Ok(v) => (Some(v), None),
        Err(e) => (None, Some(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::details::DetailSlot;
    use crate::graph::dictionary::DictionaryPhase;
    use crate::graph::model::tests::{raw, rec};
    use phylosync_core::{ColorBy, NodeId, NodesResponse, SearchCategory, SearchItem, SearchItemId, SearchResponse};
    use serde_json::json;

    fn payload(root_mutations: Vec<usize>) -> ConfigPayload {
        ConfigPayload {
            root_id: NodeId(0),
            root_mutations,
            lineages: vec!["B.1.1.7".to_string()],
            ..ConfigPayload::default()
        }
    }

    fn ready_state(records: Vec<phylosync_core::MutationRecord>, root_mutations: Vec<usize>) -> SyncState {
        let mut st = SyncState::default();
        let now = Instant::now();
        st.apply(Incoming::Config(Ok(ConfigResponse::Ready(payload(root_mutations)))), now);
        st.apply(Incoming::StreamOpened, now);
        st.apply(Incoming::Stream(StreamPayload::Chunk(records)), now);
        st.apply(Incoming::Stream(StreamPayload::End), now);
        st
    }

    fn node_request(reqs: Vec<Request>) -> (u64, phylosync_core::ViewportBounds) {
        reqs.into_iter()
            .find_map(|r| match r {
                Request::Nodes { handle, bounds, .. } => Some((handle.generation(), bounds)),
                _ => None,
            })
            .expect("node request")
    }

    #[test]
    fn single_chunk_stream_delivers_complete_config() {
        let mut st = ready_state(vec![rec("S", 501, "Y")], vec![]);
        let events = st.drain_events();

        assert_eq!(st.dictionary.phase(), DictionaryPhase::Complete);
        let cfg = st.session_config().expect("config");
        assert_eq!(cfg.dictionary.len(), 1);
        assert!(cfg.all_genes.contains("S"));
        assert!(events.contains(&SessionEvent::ConfigReady));
        assert!(events.contains(&SessionEvent::DictionaryFinal(DictionaryPhase::Complete)));
    }

    #[test]
    fn queries_wait_for_dictionary_then_start_unfiltered() {
        let mut st = SyncState::default();
        let now = Instant::now();
        st.search.add(SearchItem {
            id: SearchItemId("s".to_string()),
            category: SearchCategory::Name,
            value: "alpha".to_string(),
            enabled: true,
        });
        st.apply(Incoming::Config(Ok(ConfigResponse::Ready(payload(vec![])))), now);
        st.apply(Incoming::Stream(StreamPayload::Chunk(vec![rec("S", 1, "A")])), now);
        assert!(st.poll_requests(now).is_empty());

        st.apply(Incoming::Stream(StreamPayload::End), now);
        let reqs = st.poll_requests(now);
        assert_eq!(reqs.len(), 2);
        let (_, bounds) = node_request(reqs);
        assert_eq!(bounds.quad(true), None);
    }

    #[test]
    fn stream_error_accepts_partial_dictionary() {
        let mut st = SyncState::default();
        let now = Instant::now();
        st.apply(Incoming::Config(Ok(ConfigResponse::Ready(payload(vec![0])))), now);
        st.apply(Incoming::Stream(StreamPayload::Chunk(vec![rec("S", 1, "A")])), now);
        st.apply(Incoming::Stream(StreamPayload::Malformed("non-array chunk".to_string())), now);
        st.apply(Incoming::StreamFailed("connection reset".to_string()), now);

        assert_eq!(st.dictionary.phase(), DictionaryPhase::ErrorComplete);
        let cfg = st.session_config().expect("config");
        assert_eq!(cfg.root_mutations.len(), 1);
        assert!(!st.drain_events().iter().any(|e| matches!(e, SessionEvent::Alert(_))));
    }

    #[test]
    fn root_node_mutations_come_from_config() {
        let mut st = ready_state(vec![rec("S", 1, "A"), rec("S", 2, "B")], vec![1]);
        let now = Instant::now();
        let (generation, _) = node_request(st.poll_requests(now));
        st.apply(
            Incoming::Nodes {
                generation,
                x_type: XType::XDist,
                result: Ok(NodesResponse {
                    nodes: vec![raw(0, 0.0, 0.0, vec![0]), raw(1, 1.0, 1.0, vec![0])],
                }),
            },
            now,
        );
        let root = st.nodes.get(&NodeId(0)).expect("root");
        assert_eq!(root.mutations.len(), 1);
        assert_eq!(root.mutations[0].residue_pos, 2);
        let leaf = st.nodes.get(&NodeId(1)).expect("leaf");
        assert_eq!(leaf.mutations[0].residue_pos, 1);
    }

    #[test]
    fn odd_record_mid_stream_keeps_later_indices_aligned() {
        let mut st = SyncState::default();
        let now = Instant::now();
        st.apply(Incoming::Config(Ok(ConfigResponse::Ready(payload(vec![])))), now);
        st.apply(Incoming::StreamOpened, now);
        for data in [
            r#"[{"gene":"S","previous_residue":"D","residue_pos":614,"new_residue":"G"}]"#,
            r#"[{"gene":"S","previous_residue":"E","residue_pos":484,"new_residue":"K"},
                {"gene":"nt","previous_residue":null,"residue_pos":"28881","new_residue":"A"},
                "junk"]"#,
            r#"[{"gene":"N","previous_residue":"R","residue_pos":203,"new_residue":"K"}]"#,
            "END",
        ] {
            st.apply(Incoming::Stream(StreamPayload::parse(data)), now);
        }
        assert_eq!(st.dictionary.phase(), DictionaryPhase::Complete);

        let (generation, _) = node_request(st.poll_requests(now));
        st.apply(
            Incoming::Nodes {
                generation,
                x_type: XType::XDist,
                result: Ok(NodesResponse {
                    nodes: vec![raw(7, 0.0, 0.0, vec![1, 4])],
                }),
            },
            now,
        );
        let node = st.nodes.get(&NodeId(7)).expect("node");
        let labels: Vec<String> = node.mutations.iter().map(|m| m.label()).collect();
        assert_eq!(labels, vec!["S:E484K", "N:R203K"]);
    }

    #[test]
    fn node_failure_alerts_clears_and_requests_refresh() {
        let mut st = ready_state(vec![], vec![]);
        let now = Instant::now();
        let (g1, _) = node_request(st.poll_requests(now));
        st.apply(
            Incoming::Nodes {
                generation: g1,
                x_type: XType::XDist,
                result: Ok(NodesResponse {
                    nodes: vec![raw(1, 0.0, 0.0, vec![])],
                }),
            },
            now,
        );
        assert_eq!(st.nodes.len(), 1);
        st.drain_events();

        st.refresh_nodes(now);
        let (g2, _) = node_request(st.poll_requests(now + st.cfg.debounce));
        st.apply(
            Incoming::Nodes {
                generation: g2,
                x_type: XType::XDist,
                result: Err("connection refused".to_string()),
            },
            now,
        );
        assert!(st.nodes.is_empty());
        let events = st.drain_events();
        assert!(events.contains(&SessionEvent::Alert("connection refused".to_string())));
        assert!(events.contains(&SessionEvent::RefreshRequested));
        assert!(!st.is_idle());

        // re-armed: the same bounds go out again after one debounce period
        assert!(st.poll_requests(now).is_empty());
        let later = now + 2 * st.cfg.debounce;
        let (g3, bounds) = node_request(st.poll_requests(later));
        assert!(g3 > g2);
        assert_eq!(bounds.quad(true), None);
        assert!(st.poll_requests(later).is_empty());
    }

    #[test]
    fn configured_axis_survives_reported_views() {
        let mut st = SyncState::new(
            CfgState {
                debounce: Duration::ZERO,
                default_x_type: XType::XTime,
                url_on_fail: None,
            },
            SearchManager::default(),
        );
        let now = Instant::now();
        st.apply(Incoming::Config(Ok(ConfigResponse::Ready(payload(vec![])))), now);
        st.apply(Incoming::Stream(StreamPayload::End), now);
        st.search.add(SearchItem {
            id: SearchItemId("s".to_string()),
            category: SearchCategory::Lineage,
            value: "BA.2".to_string(),
            enabled: true,
        });

        let (_, initial) = node_request(st.poll_requests(now));
        assert_eq!(initial.x_type, Some(XType::XTime));

        st.report_view_state(
            &ViewState {
                target: Some([1.0, 1.0]),
                zoom: 0.0,
                width: 2.0,
                height: 2.0,
                x_type: None,
            },
            now,
        );
        let reqs = st.poll_requests(now);
        let mut seen = 0;
        for req in reqs {
            match req {
                Request::Nodes { bounds, x_type, .. } => {
                    assert_eq!(bounds.x_type, Some(XType::XTime));
                    assert_eq!(x_type, XType::XTime);
                    seen += 1;
                }
                Request::Search { bounds, x_type, .. } => {
                    assert_eq!(bounds.x_type, Some(XType::XTime));
                    assert_eq!(x_type, XType::XTime);
                    seen += 1;
                }
                _ => {}
            }
        }
        assert_eq!(seen, 2);
    }

    #[test]
    fn superseded_node_batch_is_discarded_whole() {
        let mut st = ready_state(vec![], vec![]);
        st.cfg.debounce = Duration::ZERO;
        st.viewport = ViewportCoordinator::new(Duration::ZERO);
        let now = Instant::now();
        let (old, _) = node_request(st.poll_requests(now));
        st.report_view_state(
            &ViewState {
                target: Some([5.0, 5.0]),
                zoom: 0.0,
                width: 4.0,
                height: 4.0,
                x_type: None,
            },
            now,
        );
        let (new, bounds) = node_request(st.poll_requests(now));
        assert_eq!(bounds.quad(true), Some([3.0, 7.0, 3.0, 7.0]));

        st.apply(
            Incoming::Nodes {
                generation: new,
                x_type: XType::XDist,
                result: Ok(NodesResponse {
                    nodes: vec![raw(2, 5.0, 5.0, vec![])],
                }),
            },
            now,
        );
        st.apply(
            Incoming::Nodes {
                generation: old,
                x_type: XType::XDist,
                result: Ok(NodesResponse {
                    nodes: vec![raw(1, 0.0, 0.0, vec![]), raw(2, 9.0, 9.0, vec![])],
                }),
            },
            now,
        );
        assert_eq!(st.nodes.len(), 1);
        assert_eq!(st.nodes.get(&NodeId(2)).map(|n| n.x), Some(5.0));
    }

    #[test]
    fn search_failure_resolves_empty_and_alerts_once() {
        let mut st = ready_state(vec![], vec![]);
        let now = Instant::now();
        let id = SearchItemId("s".to_string());
        st.search.add(SearchItem {
            id: id.clone(),
            category: SearchCategory::Lineage,
            value: "BA.2".to_string(),
            enabled: true,
        });
        let generation = st
            .poll_requests(now)
            .into_iter()
            .find_map(|r| match r {
                Request::Search { handle, .. } => Some(handle.generation()),
                _ => None,
            })
            .expect("search request");
        st.drain_events();
        st.apply(
            Incoming::Search {
                id: id.clone(),
                generation,
                x_type: XType::XDist,
                result: Err("timeout".to_string()),
            },
            now,
        );
        assert_eq!(st.search.result(&id).map(|r| r.count), Some(0));
        assert_eq!(st.drain_events(), vec![SessionEvent::Alert("timeout".to_string())]);

        // a stale duplicate is silent
        st.apply(
            Incoming::Search {
                id,
                generation,
                x_type: XType::XDist,
                result: Ok(SearchResponse::default()),
            },
            now,
        );
        assert!(st.drain_events().is_empty());
    }

    #[test]
    fn config_error_navigates_only_with_fallback() {
        let mut st = SyncState::default();
        st.apply(Incoming::Config(Ok(ConfigResponse::Error("bad sid".to_string()))), Instant::now());
        let events = st.drain_events();
        assert!(events.contains(&SessionEvent::Alert("bad sid".to_string())));
        assert!(events.contains(&SessionEvent::ConfigUnavailable));
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::Navigate(_))));
        assert!(st.is_idle());

        let mut st = SyncState::default();
        st.cfg.url_on_fail = Some("https://example.org/".to_string());
        st.apply(Incoming::Config(Err("connection refused".to_string())), Instant::now());
        let events = st.drain_events();
        assert!(events.contains(&SessionEvent::Navigate("https://example.org/".to_string())));
        assert!(st.config_unavailable());
    }

    #[test]
    fn colors_and_details_flow_through_state() {
        let mut st = ready_state(vec![rec("S", 501, "Y")], vec![]);
        let now = Instant::now();
        let (generation, _) = node_request(st.poll_requests(now));
        st.apply(
            Incoming::Nodes {
                generation,
                x_type: XType::XDist,
                result: Ok(NodesResponse {
                    nodes: vec![raw(3, 0.0, 0.0, vec![0])],
                }),
            },
            now,
        );
        st.set_color_by(ColorBy::amino_acid("S", 501));
        let colors = st.node_colors();
        assert_ne!(colors.get(&NodeId(3)), Some(&crate::graph::color::BACKGROUND_COLOR));

        st.details.set_target(DetailSlot::Selected, Some(NodeId(3)));
        let generation = st
            .poll_requests(now)
            .into_iter()
            .find_map(|r| match r {
                Request::Details { handle, .. } => Some(handle.generation()),
                _ => None,
            })
            .expect("details request");
        st.apply(
            Incoming::Details {
                which: DetailSlot::Selected,
                generation,
                node_id: NodeId(3),
                result: Ok(json!({"name": "tip"})),
            },
            now,
        );
        assert_eq!(
            st.details.value(DetailSlot::Selected).map(|d| d.data.clone()),
            Some(json!({"name": "tip"}))
        );
        assert!(st.is_idle());
    }
}
