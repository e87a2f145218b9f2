use phylosync_core::NodeId;
use serde_json::Value;
use std::collections::HashMap;

use crate::graph::slot::{RequestHandle, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailSlot {
    Hover,
    Selected,
}

impl DetailSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hover => "hover",
            Self::Selected => "selected",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDetails {
    pub node_id: NodeId,
    pub data: Value,
}

#[derive(Debug, Default)]
struct DetailEntry {
    slot: Slot,
    target: Option<NodeId>,
    pending: bool,
    value: Option<NodeDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TipKey {
    pub node_id: NodeId,
    pub key: String,
}

#[derive(Debug, Default)]
struct TipEntry {
    slot: Slot,
    pending: bool,
    value: Option<Value>,
}

#[derive(Debug)]
pub enum DetailsIssue {
    Node {
        which: DetailSlot,
        handle: RequestHandle,
        node_id: NodeId,
    },
    TipAttribute {
        key: TipKey,
        handle: RequestHandle,
    },
}

/// Hover and selection each hold one value; the latest target wins.
#[derive(Debug, Default)]
pub struct DetailsResolver {
    hover: DetailEntry,
    selected: DetailEntry,
    tips: HashMap<TipKey, TipEntry>,
}

impl DetailsResolver {
    fn entry(&mut self, which: DetailSlot) -> &mut DetailEntry {
        match which {
            DetailSlot::Hover => &mut self.hover,
            DetailSlot::Selected => &mut self.selected,
        }
    }

    pub fn set_target(&mut self, which: DetailSlot, target: Option<NodeId>) {
        let e = self.entry(which);
        if e.target == target {
            return;
        }
        e.target = target;
        e.value = None;
        if target.is_some() {
            e.pending = true;
        } else {
            e.pending = false;
            e.slot.cancel();
        }
    }

    pub fn target(&self, which: DetailSlot) -> Option<NodeId> {
        match which {
            DetailSlot::Hover => self.hover.target,
            DetailSlot::Selected => self.selected.target,
        }
    }

    pub fn value(&self, which: DetailSlot) -> Option<&NodeDetails> {
        match which {
            DetailSlot::Hover => self.hover.value.as_ref(),
            DetailSlot::Selected => self.selected.value.as_ref(),
        }
    }

    /// Cached per `(node, key)`; asking again for a cached value does nothing.
    pub fn request_tip_attribute(&mut self, node_id: NodeId, key: impl Into<String>) {
        let key = TipKey {
            node_id,
            key: key.into(),
        };
        let entry = self.tips.entry(key).or_default();
        if entry.value.is_none() && !entry.slot.in_flight() {
            entry.pending = true;
        }
    }

    pub fn tip_attribute(&self, node_id: NodeId, key: &str) -> Option<&Value> {
        self.tips
            .get(&TipKey {
                node_id,
                key: key.to_string(),
            })
            .and_then(|e| e.value.as_ref())
    }

    pub fn poll(&mut self) -> Vec<DetailsIssue> {
        let mut out = Vec::new();
        for which in [DetailSlot::Hover, DetailSlot::Selected] {
            let e = self.entry(which);
            if !e.pending {
                continue;
            }
            e.pending = false;
            if let Some(node_id) = e.target {
                out.push(DetailsIssue::Node {
                    which,
                    handle: e.slot.issue(),
                    node_id,
                });
            }
        }
        for (key, e) in self.tips.iter_mut() {
            if e.pending {
                e.pending = false;
                out.push(DetailsIssue::TipAttribute {
                    key: key.clone(),
                    handle: e.slot.issue(),
                });
            }
        }
        out
    }

    /// `None` result means the fetch failed; the slot stays empty.
    pub fn apply(&mut self, which: DetailSlot, generation: u64, node_id: NodeId, data: Option<Value>) -> bool {
        let e = self.entry(which);
        if !e.slot.accept(generation) || e.target != Some(node_id) {
            return false;
        }
        e.value = data.map(|data| NodeDetails { node_id, data });
        true
    }

    pub fn apply_tip(&mut self, key: &TipKey, generation: u64, value: Option<Value>) -> bool {
        let Some(e) = self.tips.get_mut(key) else {
            return false;
        };
        if !e.slot.accept(generation) {
            return false;
        }
        e.value = value;
        true
    }

    pub fn any_in_flight(&self) -> bool {
        self.hover.slot.in_flight()
            || self.selected.slot.in_flight()
            || self.hover.pending
            || self.selected.pending
            || self.tips.values().any(|e| e.pending || e.slot.in_flight())
    }
}
