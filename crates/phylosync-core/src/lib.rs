use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SearchItemId(pub String);

/// Which x coordinate a layout uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum XType {
    #[default]
    XDist,
    XTime,
}

impl XType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::XDist => "x_dist",
            Self::XTime => "x_time",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "x_dist" => Some(Self::XDist),
            "x_time" => Some(Self::XTime),
            _ => None,
        }
    }
}

/// One dictionary entry. Fields are read leniently: a record that arrives
/// with nulls or odd types still takes its slot, since nodes refer to
/// records by position.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MutationRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub gene: String,
    #[serde(default, alias = "orig_res", deserialize_with = "lenient_string")]
    pub previous_residue: String,
    #[serde(default, alias = "position", deserialize_with = "lenient_pos")]
    pub residue_pos: u32,
    #[serde(default, alias = "final_res", deserialize_with = "lenient_string")]
    pub new_residue: String,
}

impl MutationRecord {
    pub fn label(&self) -> String {
        format!(
            "{}:{}{}{}",
            self.gene, self.previous_residue, self.residue_pos, self.new_residue
        )
    }

    /// Stand-in for an entry that was not an object at all.
    pub fn is_placeholder(&self) -> bool {
        *self == Self::default()
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_pos<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// A node as the backend sends it: mutations are still dictionary indices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawNode {
    pub node_id: NodeId,
    #[serde(default)]
    pub x_dist: Option<f64>,
    #[serde(default)]
    pub x_time: Option<f64>,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub mutations: Vec<usize>,
    #[serde(default)]
    pub date: Option<u32>,
    #[serde(default, alias = "meta_Lineage")]
    pub lineage: Option<u32>,
    #[serde(default, alias = "meta_Country")]
    pub country: Option<u32>,
    #[serde(default)]
    pub genbank: Option<String>,
    #[serde(default)]
    pub num_tips: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawNode {
    /// Falls back to the other axis when the requested one is missing.
    pub fn x(&self, x_type: XType) -> f64 {
        let (want, other) = match x_type {
            XType::XDist => (self.x_dist, self.x_time),
            XType::XTime => (self.x_time, self.x_dist),
        };
        want.or(other).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodesResponse {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Vec<RawNode>,
    #[serde(default)]
    pub total_count: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigPayload {
    #[serde(rename = "rootId")]
    pub root_id: NodeId,
    #[serde(rename = "rootMutations", default)]
    pub root_mutations: Vec<usize>,
    #[serde(default)]
    pub mutations: Vec<MutationRecord>,
    #[serde(default, alias = "lineage_mapping")]
    pub lineages: Vec<String>,
    #[serde(default, alias = "country_mapping")]
    pub countries: Vec<String>,
    #[serde(default)]
    pub genes: Vec<String>,
    #[serde(default)]
    pub date_mapping: Vec<String>,
    #[serde(default)]
    pub num_tips: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigResponse {
    Ready(ConfigPayload),
    Error(String),
}

impl ConfigResponse {
    /// A payload carrying an `error` key is a server-reported failure, whatever else it holds.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
            let msg = match err {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Ok(Self::Error(msg));
        }
        serde_json::from_value(value).map(Self::Ready)
    }
}

pub const STREAM_END: &str = "END";

/// One server-sent event from the mutation stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPayload {
    End,
    Chunk(Vec<MutationRecord>),
    Malformed(String),
}

impl StreamPayload {
    pub fn parse(data: &str) -> Self {
        if data.trim() == STREAM_END {
            return Self::End;
        }
        let value: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => return Self::Malformed(format!("unparsable chunk: {e}")),
        };
        let Value::Array(items) = value else {
            return Self::Malformed(format!("non-array chunk: {}", truncate(&value.to_string(), 80)));
        };
        // every element keeps its position, even one that is not a record
        let records = items
            .into_iter()
            .map(|item| serde_json::from_value::<MutationRecord>(item).unwrap_or_default())
            .collect();
        Self::Chunk(records)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    #[default]
    Name,
    Lineage,
    Country,
    Mutation,
    Genbank,
}

impl SearchCategory {
    pub fn parse(input: &str) -> Option<Self> {
        match input {
            "name" => Some(Self::Name),
            "lineage" => Some(Self::Lineage),
            "country" => Some(Self::Country),
            "mutation" => Some(Self::Mutation),
            "genbank" => Some(Self::Genbank),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchItem {
    pub id: SearchItemId,
    pub category: SearchCategory,
    pub value: String,
    pub enabled: bool,
}

impl SearchItem {
    /// Empty or disabled items never reach the backend.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.value.trim().is_empty()
    }
}

/// Axis-aligned query rectangle; any missing side means "no spatial filter".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ViewportBounds {
    pub min_x: Option<f64>,
    pub max_x: Option<f64>,
    pub min_y: Option<f64>,
    pub max_y: Option<f64>,
    #[serde(rename = "xType")]
    pub x_type: Option<XType>,
}

impl ViewportBounds {
    pub fn unfiltered(x_type: Option<XType>) -> Self {
        Self {
            x_type,
            ..Self::default()
        }
    }

    /// `[min_x, max_x, min_y, max_y]` when all four sides are usable.
    ///
    /// With `zero_is_absent` a side equal to zero counts as missing, which is
    /// what the backend contract has always assumed.
    pub fn quad(&self, zero_is_absent: bool) -> Option<[f64; 4]> {
        let usable = |v: Option<f64>| {
            v.filter(|v| v.is_finite() && !(zero_is_absent && *v == 0.0))
        };
        Some([
            usable(self.min_x)?,
            usable(self.max_x)?,
            usable(self.min_y)?,
            usable(self.max_y)?,
        ])
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum ColorVariable {
    #[default]
    Lineage,
    Country,
    #[serde(alias = "aa")]
    AminoAcid,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct ColorBy {
    pub variable: ColorVariable,
    #[serde(default)]
    pub gene: Option<String>,
    #[serde(default)]
    pub residue: Option<u32>,
}

impl ColorBy {
    pub fn none() -> Self {
        Self {
            variable: ColorVariable::None,
            gene: None,
            residue: None,
        }
    }

    pub fn amino_acid(gene: impl Into<String>, residue: u32) -> Self {
        Self {
            variable: ColorVariable::AminoAcid,
            gene: Some(gene.into()),
            residue: Some(residue),
        }
    }
}
