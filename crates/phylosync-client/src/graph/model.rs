use phylosync_core::{ConfigPayload, NodeId, RawNode, XType};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::graph::dictionary::{DictionarySnapshot, ResolvedMutations};

/// Session config after the mutation stream finished; shared read-only.
#[derive(Debug)]
pub struct SessionConfig {
    pub root_id: NodeId,
    /// Resolved once, reused for every batch containing the root.
    pub root_mutations: ResolvedMutations,
    pub labels: LabelDictionaries,
    pub date_mapping: Vec<String>,
    pub all_genes: BTreeSet<String>,
    pub num_tips: Option<u64>,
    pub title: Option<String>,
    pub extra: Map<String, Value>,
    pub dictionary: DictionarySnapshot,
}

impl SessionConfig {
    pub fn from_payload(payload: ConfigPayload, dictionary: DictionarySnapshot) -> Self {
        let (root_mutations, missing) = dictionary.resolve(&payload.root_mutations);
        if missing > 0 {
            tracing::warn!(missing, root = %payload.root_id, "root mutations outside dictionary");
        }
        Self {
            root_id: payload.root_id,
            root_mutations,
            labels: LabelDictionaries {
                lineages: payload.lineages,
                countries: payload.countries,
                genes: payload.genes,
            },
            date_mapping: payload.date_mapping,
            all_genes: dictionary.genes(),
            num_tips: payload.num_tips,
            title: payload.title,
            extra: payload.extra,
            dictionary,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelDictionaries {
    pub lineages: Vec<String>,
    pub countries: Vec<String>,
    pub genes: Vec<String>,
}

impl LabelDictionaries {
    pub fn lineage(&self, idx: Option<u32>) -> Option<&str> {
        idx.and_then(|i| self.lineages.get(i as usize)).map(String::as_str)
    }

    pub fn country(&self, idx: Option<u32>) -> Option<&str> {
        idx.and_then(|i| self.countries.get(i as usize)).map(String::as_str)
    }
}

/// A node ready for consumers: coordinates picked for the layout, mutations resolved.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub mutations: ResolvedMutations,
    pub date: Option<u32>,
    pub lineage: Option<u32>,
    pub country: Option<u32>,
    pub genbank: Option<String>,
    pub num_tips: Option<u64>,
}

impl Node {
    /// The root's own index list is ignored in favour of the config's.
    pub fn resolve(raw: RawNode, x_type: XType, config: &SessionConfig) -> (Self, usize) {
        let x = raw.x(x_type);
        let (mutations, missing) = if raw.node_id == config.root_id {
            (config.root_mutations.clone(), 0)
        } else {
            config.dictionary.resolve(&raw.mutations)
        };
        let node = Self {
            id: raw.node_id,
            x,
            y: raw.y,
            mutations,
            date: raw.date,
            lineage: raw.lineage,
            country: raw.country,
            genbank: raw.genbank,
            num_tips: raw.num_tips,
        };
        (node, missing)
    }
}

/// The working node set. Only the viewport coordinator writes to it.
#[derive(Debug, Default)]
pub struct NodeSet {
    nodes: HashMap<NodeId, Node>,
    revision: u64,
}

impl NodeSet {
    /// Replaces the set with a newer batch; a duplicate id inside the batch keeps the later entry.
    pub fn replace(&mut self, batch: Vec<Node>) {
        self.nodes = batch.into_iter().map(|n| (n.id, n)).collect();
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.revision += 1;
    }

    /// Identity used for memoising derived data.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}

pub fn resolve_batch(raw: Vec<RawNode>, x_type: XType, config: &Arc<SessionConfig>) -> Vec<Node> {
    let mut missing_total = 0;
    let nodes = raw
        .into_iter()
        .map(|r| {
            let (node, missing) = Node::resolve(r, x_type, config);
            missing_total += missing;
            node
        })
        .collect();
    if missing_total > 0 {
        tracing::warn!(
            missing = missing_total,
            dictionary = config.dictionary.len(),
            "mutation indices outside dictionary were dropped"
        );
    }
    nodes
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::graph::dictionary::MutationDictionary;
    use phylosync_core::MutationRecord;

    pub(crate) fn rec(gene: &str, pos: u32, to: &str) -> MutationRecord {
        MutationRecord {
            gene: gene.to_string(),
            previous_residue: "X".to_string(),
            residue_pos: pos,
            new_residue: to.to_string(),
        }
    }

    pub(crate) fn raw(id: u64, x: f64, y: f64, mutations: Vec<usize>) -> RawNode {
        RawNode {
            node_id: NodeId(id),
            x_dist: Some(x),
            x_time: None,
            y,
            mutations,
            date: None,
            lineage: None,
            country: None,
            genbank: None,
            num_tips: None,
            extra: Map::new(),
        }
    }

    pub(crate) fn session_config(records: Vec<MutationRecord>, root_mutations: Vec<usize>) -> SessionConfig {
        let mut dict = MutationDictionary::default();
        dict.append(records);
        dict.complete();
        let payload = ConfigPayload {
            root_id: NodeId(0),
            root_mutations,
            lineages: vec!["B.1.1.7".to_string(), "BA.2".to_string()],
            countries: vec!["UK".to_string(), "USA".to_string()],
            ..ConfigPayload::default()
        };
        SessionConfig::from_payload(payload, dict.snapshot())
    }

    #[test]
    fn root_uses_config_mutations_regardless_of_payload() {
        let cfg = session_config(vec![rec("S", 1, "A"), rec("S", 2, "B"), rec("N", 3, "C")], vec![2]);
        let (root, _) = Node::resolve(raw(0, 0.0, 0.0, vec![0, 1]), XType::XDist, &cfg);
        let labels: Vec<String> = root.mutations.iter().map(|m| m.label()).collect();
        assert_eq!(labels, vec!["N:X3C".to_string()]);

        let (leaf, _) = Node::resolve(raw(5, 1.0, 2.0, vec![0, 1]), XType::XDist, &cfg);
        assert_eq!(leaf.mutations.len(), 2);
        assert_eq!(leaf.mutations[1].residue_pos, 2);
    }

    #[test]
    fn replace_bumps_revision_and_drops_old_nodes() {
        let cfg = Arc::new(session_config(vec![rec("S", 1, "A")], vec![]));
        let mut set = NodeSet::default();
        set.replace(resolve_batch(vec![raw(1, 0.0, 0.0, vec![0])], XType::XDist, &cfg));
        let r1 = set.revision();
        set.replace(resolve_batch(vec![raw(2, 0.0, 0.0, vec![])], XType::XDist, &cfg));

        assert!(set.revision() > r1);
        assert!(set.get(&NodeId(1)).is_none());
        assert!(set.get(&NodeId(2)).is_some());
    }
}
