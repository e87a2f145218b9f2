use phylosync_core::{ColorBy, ColorVariable, NodeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::graph::model::{LabelDictionaries, Node, NodeSet};
use crate::util::ids::stable_u32;

pub type Rgb = [u8; 3];

pub const NONE_COLOR: Rgb = [180, 180, 180];
/// Ancestral / no data at the chosen site. Not used by any residue.
pub const BACKGROUND_COLOR: Rgb = [220, 220, 220];

fn residue_color(residue: &str) -> Rgb {
    match residue {
        "A" => [230, 25, 75],
        "R" => [60, 180, 75],
        "N" => [255, 225, 25],
        "D" => [0, 130, 200],
        "C" => [245, 130, 48],
        "Q" => [145, 30, 180],
        "E" => [70, 240, 240],
        "G" => [240, 50, 230],
        "H" => [210, 245, 60],
        "I" => [250, 190, 212],
        "L" => [0, 128, 128],
        "K" => [220, 190, 255],
        "M" => [170, 110, 40],
        "F" => [255, 250, 200],
        "P" => [128, 0, 0],
        "S" => [170, 255, 195],
        "T" => [128, 128, 0],
        "W" => [255, 215, 180],
        "Y" => [0, 0, 128],
        "V" => [128, 128, 128],
        "*" => [0, 0, 0],
        "-" => [90, 90, 90],
        other => label_color(other),
    }
}

/// Same label, same color, whatever index or page it came from.
pub fn label_color(label: &str) -> Rgb {
    let h = stable_u32(label);
    let hue = (h % 360) as f64;
    let sat = 0.55 + ((h >> 9) % 30) as f64 / 100.0;
    let light = 0.40 + ((h >> 17) % 20) as f64 / 100.0;
    let c = hsl_to_rgb(hue, sat, light);
    if c == BACKGROUND_COLOR {
        [c[0] - 1, c[1], c[2]]
    } else {
        c
    }
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_u8(r), to_u8(g), to_u8(b)]
}

pub fn node_color(node: &Node, color_by: &ColorBy, labels: &LabelDictionaries) -> Rgb {
    match color_by.variable {
        ColorVariable::None => NONE_COLOR,
        ColorVariable::Lineage => labels.lineage(node.lineage).map(label_color).unwrap_or(NONE_COLOR),
        ColorVariable::Country => labels.country(node.country).map(label_color).unwrap_or(NONE_COLOR),
        ColorVariable::AminoAcid => {
            let (Some(gene), Some(residue)) = (&color_by.gene, color_by.residue) else {
                return NONE_COLOR;
            };
            node.mutations
                .iter()
                .rev()
                .find(|m| &m.gene == gene && m.residue_pos == residue)
                .map(|m| residue_color(&m.new_residue))
                .unwrap_or(BACKGROUND_COLOR)
        }
    }
}

/// Memoised per-node colors, recomputed only when the node set or mode changes.
#[derive(Debug, Default)]
pub struct ColorEngine {
    memo: Option<(u64, ColorBy, Arc<HashMap<NodeId, Rgb>>)>,
    pub recomputes: u64,
}

impl ColorEngine {
    pub fn colors(
        &mut self,
        nodes: &NodeSet,
        color_by: &ColorBy,
        labels: &LabelDictionaries,
    ) -> Arc<HashMap<NodeId, Rgb>> {
        if let Some((rev, cb, map)) = &self.memo {
            if *rev == nodes.revision() && cb == color_by {
                return Arc::clone(map);
            }
        }
        let map: Arc<HashMap<NodeId, Rgb>> = Arc::new(
            nodes
                .iter()
                .map(|n| (n.id, node_color(n, color_by, labels)))
                .collect(),
        );
        self.recomputes += 1;
        self.memo = Some((nodes.revision(), color_by.clone(), Arc::clone(&map)));
        map
    }
}
