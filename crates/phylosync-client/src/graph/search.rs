use phylosync_core::{NodeId, SearchCategory, SearchItem, SearchItemId, SearchResponse, XType};
use std::collections::{HashMap, HashSet};

use crate::graph::color::Rgb;
use crate::graph::slot::{RequestHandle, Slot};
use crate::util::ids::random_search_id;

pub const DEFAULT_SEARCH_PALETTE: [Rgb; 6] = [
    [255, 0, 0],
    [0, 0, 255],
    [0, 255, 0],
    [255, 0, 255],
    [0, 255, 255],
    [255, 255, 0],
];

/// Axis-aligned box around a set of points, used for "zoom to results".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Extent {
    fn around(x: f64, y: f64) -> Self {
        Self {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    fn include(&mut self, other: &Extent) {
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
    }

    fn merge(acc: Option<Extent>, next: &Extent) -> Option<Extent> {
        let mut acc = acc.unwrap_or(*next);
        acc.include(next);
        Some(acc)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub count: usize,
    pub matched: HashSet<NodeId>,
    pub extent: Option<Extent>,
}

impl SearchResult {
    pub fn from_response(resp: SearchResponse, x_type: XType) -> Self {
        let mut matched = HashSet::with_capacity(resp.data.len());
        let mut extent: Option<Extent> = None;
        for node in &resp.data {
            matched.insert(node.node_id);
            extent = Extent::merge(extent, &Extent::around(node.x(x_type), node.y));
        }
        Self {
            count: resp.total_count.unwrap_or(resp.data.len()),
            matched,
            extent,
        }
    }
}

/// Read-only row handed to the panel and the visualization.
#[derive(Debug, Clone)]
pub struct SearchItemView<'a> {
    pub item: &'a SearchItem,
    pub color: Rgb,
    pub result: Option<&'a SearchResult>,
    pub loading: bool,
}

#[derive(Debug, Default)]
struct SearchSlot {
    slot: Slot,
    result: Option<SearchResult>,
    dirty: bool,
}

#[derive(Debug, Clone)]
pub struct SearchIssue {
    pub id: SearchItemId,
    pub handle: RequestHandle,
    pub item: SearchItem,
}

/// Ordered search list, one independent slot per item.
#[derive(Debug)]
pub struct SearchManager {
    items: Vec<SearchItem>,
    slots: HashMap<SearchItemId, SearchSlot>,
    palette: Vec<Rgb>,
}

impl Default for SearchManager {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_PALETTE.to_vec())
    }
}

impl SearchManager {
    pub fn new(palette: Vec<Rgb>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_SEARCH_PALETTE.to_vec()
        } else {
            palette
        };
        Self {
            items: Vec::new(),
            slots: HashMap::new(),
            palette,
        }
    }

    pub fn items(&self) -> &[SearchItem] {
        &self.items
    }

    /// Appends a fresh enabled item with an empty value and returns its id.
    pub fn add_new(&mut self, category: SearchCategory) -> SearchItemId {
        let id = random_search_id();
        self.add(SearchItem {
            id: id.clone(),
            category,
            value: String::new(),
            enabled: true,
        });
        id
    }

    pub fn add(&mut self, item: SearchItem) {
        if self.slots.contains_key(&item.id) {
            tracing::warn!(id = %item.id.0, "search item id already present");
            return;
        }
        self.slots.insert(
            item.id.clone(),
            SearchSlot {
                dirty: true,
                ..SearchSlot::default()
            },
        );
        self.items.push(item);
    }

    /// Applies `edit` to the item; any real change invalidates its query.
    pub fn update(&mut self, id: &SearchItemId, edit: impl FnOnce(&mut SearchItem)) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| &i.id == id) else {
            return false;
        };
        let before = item.clone();
        edit(item);
        item.id = before.id.clone();
        if *item == before {
            return false;
        }
        if let Some(slot) = self.slots.get_mut(id) {
            slot.dirty = true;
        }
        true
    }

    pub fn set_value(&mut self, id: &SearchItemId, value: impl Into<String>) -> bool {
        let value = value.into();
        self.update(id, |i| i.value = value)
    }

    pub fn set_category(&mut self, id: &SearchItemId, category: SearchCategory) -> bool {
        self.update(id, |i| i.category = category)
    }

    pub fn set_enabled(&mut self, id: &SearchItemId, enabled: bool) -> bool {
        self.update(id, |i| i.enabled = enabled)
    }

    pub fn remove(&mut self, id: &SearchItemId) -> bool {
        let Some(pos) = self.items.iter().position(|i| &i.id == id) else {
            return false;
        };
        self.items.remove(pos);
        if let Some(mut slot) = self.slots.remove(id) {
            slot.slot.cancel();
        }
        true
    }

    /// Reordering changes colors; it does not touch queries.
    pub fn move_item(&mut self, from: usize, to: usize) {
        if from >= self.items.len() || to >= self.items.len() {
            return;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
    }

    /// Marks every item for re-query, e.g. after the viewport settled elsewhere.
    pub fn invalidate_all(&mut self) {
        for slot in self.slots.values_mut() {
            slot.dirty = true;
        }
    }

    pub fn color_for_index(&self, index: usize) -> Rgb {
        self.palette[index % self.palette.len()]
    }

    /// Queries to start now. Inactive items are cancelled and cleared instead.
    pub fn poll(&mut self, ready: bool) -> Vec<SearchIssue> {
        if !ready {
            return Vec::new();
        }
        let mut out = Vec::new();
        for item in &self.items {
            let Some(slot) = self.slots.get_mut(&item.id) else {
                continue;
            };
            if !slot.dirty {
                continue;
            }
            slot.dirty = false;
            if !item.is_active() {
                slot.slot.cancel();
                slot.result = None;
                continue;
            }
            let handle = slot.slot.issue();
            tracing::debug!(id = %item.id.0, generation = handle.generation(), "search issued");
            out.push(SearchIssue {
                id: item.id.clone(),
                handle,
                item: item.clone(),
            });
        }
        out
    }

    /// Stores a completed result if it is still the slot's latest request.
    pub fn apply(&mut self, id: &SearchItemId, generation: u64, result: SearchResult) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        if !slot.slot.accept(generation) {
            tracing::debug!(id = %id.0, generation, "discarding superseded search result");
            return false;
        }
        slot.result = Some(result);
        true
    }

    pub fn views(&self) -> Vec<SearchItemView<'_>> {
        self.items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let slot = self.slots.get(&item.id);
                SearchItemView {
                    item,
                    color: self.color_for_index(idx),
                    result: slot
                        .filter(|_| item.is_active())
                        .and_then(|s| s.result.as_ref()),
                    loading: slot.map(|s| s.slot.in_flight()).unwrap_or(false),
                }
            })
            .collect()
    }

    pub fn result(&self, id: &SearchItemId) -> Option<&SearchResult> {
        self.slots.get(id).and_then(|s| s.result.as_ref())
    }

    pub fn any_in_flight(&self) -> bool {
        self.slots.values().any(|s| s.slot.in_flight() || s.dirty)
    }

    fn active_results(&self) -> impl Iterator<Item = &SearchResult> {
        self.items
            .iter()
            .filter(|i| i.is_active())
            .filter_map(|i| self.slots.get(&i.id).and_then(|s| s.result.as_ref()))
    }

    pub fn union(&self) -> HashSet<NodeId> {
        let mut all = HashSet::new();
        for r in self.active_results() {
            all.extend(r.matched.iter().copied());
        }
        all
    }

    /// Color of the first active item (in list order) that matched `id`.
    pub fn highlight(&self, id: &NodeId) -> Option<Rgb> {
        self.items.iter().enumerate().find_map(|(idx, item)| {
            if !item.is_active() {
                return None;
            }
            let hit = self
                .slots
                .get(&item.id)
                .and_then(|s| s.result.as_ref())
                .is_some_and(|r| r.matched.contains(id));
            hit.then(|| self.color_for_index(idx))
        })
    }

    pub fn zoom_extent(&self, index: usize) -> Option<Extent> {
        let item = self.items.get(index)?;
        if !item.is_active() {
            return None;
        }
        self.slots.get(&item.id)?.result.as_ref()?.extent
    }

    pub fn zoom_extent_all(&self) -> Option<Extent> {
        self.active_results()
            .filter_map(|r| r.extent.as_ref())
            .fold(None, Extent::merge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::tests::raw;

    fn item(id: &str, value: &str) -> SearchItem {
        SearchItem {
            id: SearchItemId(id.to_string()),
            category: SearchCategory::Name,
            value: value.to_string(),
            enabled: true,
        }
    }

    fn result_with(ids: &[u64]) -> SearchResult {
        let resp = SearchResponse {
            kind: None,
            data: ids.iter().map(|&i| raw(i, i as f64, i as f64 * 2.0, vec![])).collect(),
            total_count: None,
        };
        SearchResult::from_response(resp, XType::XDist)
    }

    fn reissue(mgr: &mut SearchManager, id: &SearchItemId, value: &str) -> SearchIssue {
        mgr.set_value(id, value);
        mgr.poll(true).into_iter().find(|i| &i.id == id).expect("issue")
    }

    #[test]
    fn only_last_issued_result_is_observed_in_either_completion_order() {
        for slow_first in [true, false] {
            let mut mgr = SearchManager::default();
            let id = SearchItemId("a".to_string());
            mgr.add(item("a", "alpha"));
            let first = mgr.poll(true).remove(0);
            let second = reissue(&mut mgr, &id, "beta");
            assert!(first.handle.is_cancelled());

            let (early, late) = if slow_first {
                ((&second, &[2u64][..]), (&first, &[1u64][..]))
            } else {
                ((&first, &[1u64][..]), (&second, &[2u64][..]))
            };
            mgr.apply(&id, early.0.handle.generation(), result_with(early.1));
            mgr.apply(&id, late.0.handle.generation(), result_with(late.1));

            let r = mgr.result(&id).expect("result");
            assert!(r.matched.contains(&NodeId(2)));
            assert!(!r.matched.contains(&NodeId(1)));
        }
    }

    #[test]
    fn disabled_and_empty_items_do_not_query() {
        let mut mgr = SearchManager::default();
        mgr.add(item("a", ""));
        mgr.add(SearchItem {
            enabled: false,
            ..item("b", "x")
        });
        assert!(mgr.poll(true).is_empty());
        assert!(mgr.union().is_empty());
    }

    #[test]
    fn disabling_cancels_and_clears() {
        let mut mgr = SearchManager::default();
        let id = SearchItemId("a".to_string());
        mgr.add(item("a", "x"));
        let issue = mgr.poll(true).remove(0);
        assert!(mgr.apply(&id, issue.handle.generation(), result_with(&[1])));

        let second = reissue(&mut mgr, &id, "y");
        mgr.set_enabled(&id, false);
        assert!(mgr.poll(true).is_empty());
        assert!(second.handle.is_cancelled());
        assert!(mgr.result(&id).is_none());
    }

    #[test]
    fn palette_cycles_by_position() {
        let palette = vec![[1, 1, 1], [2, 2, 2], [3, 3, 3]];
        let mut mgr = SearchManager::new(palette.clone());
        for i in 0..4 {
            mgr.add(item(&format!("i{i}"), "v"));
        }
        let views = mgr.views();
        assert_eq!(views[3].color, views[0].color);
        assert_eq!(views[1].color, palette[1]);

        mgr.add(item("tail", "v"));
        assert_eq!(mgr.views()[1].color, palette[1]);

        mgr.move_item(0, 1);
        assert_eq!(mgr.views()[0].item.id.0, "i1");
        assert_eq!(mgr.views()[0].color, palette[0]);
    }

    #[test]
    fn union_and_zoom_extent_cover_all_active_items() {
        let mut mgr = SearchManager::default();
        mgr.add(item("a", "x"));
        mgr.add(item("b", "y"));
        let issues = mgr.poll(true);
        mgr.apply(&issues[0].id, issues[0].handle.generation(), result_with(&[1, 3]));
        mgr.apply(&issues[1].id, issues[1].handle.generation(), result_with(&[5]));

        assert_eq!(mgr.union().len(), 3);
        assert_eq!(mgr.highlight(&NodeId(5)), Some(mgr.color_for_index(1)));
        let ext = mgr.zoom_extent_all().expect("extent");
        assert_eq!((ext.min_x, ext.max_x), (1.0, 5.0));
        assert_eq!((ext.min_y, ext.max_y), (2.0, 10.0));
        let first = mgr.zoom_extent(0).expect("extent");
        assert_eq!(first.max_x, 3.0);
    }

    #[test]
    fn removing_item_cancels_in_flight_query() {
        let mut mgr = SearchManager::default();
        let id = SearchItemId("a".to_string());
        mgr.add(item("a", "x"));
        let issue = mgr.poll(true).remove(0);
        assert!(mgr.remove(&id));
        assert!(issue.handle.is_cancelled());
        assert!(!mgr.apply(&id, issue.handle.generation(), result_with(&[1])));
    }
}
