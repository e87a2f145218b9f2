use anyhow::{Context, Result};
use phylosync_core::{ColorBy, ColorVariable, NodeId, SearchCategory, XType};
use std::ffi::OsString;
use std::time::Duration;

use crate::graph::viewport::ViewState;
use crate::util::config::ClientConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub backend: Option<String>,
    pub sid: String,
    pub url_on_fail: Option<String>,
    pub searches: Vec<(SearchCategory, String)>,
    pub color_by: Option<ColorBy>,
    pub view: Option<ViewState>,
    pub x_type: Option<XType>,
    pub details: Option<NodeId>,
    pub hover: Option<NodeId>,
    pub tip_atts: Vec<(NodeId, String)>,
    pub nextstrain: Option<NodeId>,
    pub duration: Duration,
    pub save_config: bool,
}

impl CliArgs {
    /// Command-line values win over the config file.
    pub fn apply_to(&self, cfg: &mut ClientConfig) {
        if let Some(backend) = &self.backend {
            cfg.backend_url = backend.clone();
        }
        if let Some(url) = &self.url_on_fail {
            cfg.url_on_fail = Some(url.clone());
        }
        if let Some(x_type) = self.x_type {
            cfg.default_x_type = x_type;
        }
    }
}

pub fn parse_args() -> Result<CliArgs> {
    parse_args_from(std::env::args_os().skip(1))
}

fn next_str<I>(args: &mut I, flag: &str, what: &str) -> Result<String>
where
    I: Iterator<Item = OsString>,
{
    let Some(value) = args.next() else {
        anyhow::bail!("{flag} expects {what}");
    };
    Ok(value.to_string_lossy().into_owned())
}

fn parse_node(input: &str) -> Result<NodeId> {
    input
        .parse::<u64>()
        .map(NodeId)
        .with_context(|| format!("invalid node id: {input}"))
}

fn parse_search(input: &str) -> Result<(SearchCategory, String)> {
    let Some((cat, value)) = input.split_once(':') else {
        anyhow::bail!("invalid search: {input} (expected category:value)");
    };
    let Some(category) = SearchCategory::parse(cat) else {
        anyhow::bail!("unknown search category: {cat}");
    };
    Ok((category, value.to_string()))
}

/// `lineage`, `country`, `none`, or `aa:<gene>:<residue>`.
fn parse_color_by(input: &str) -> Result<ColorBy> {
    let variable = match input {
        "lineage" => ColorVariable::Lineage,
        "country" => ColorVariable::Country,
        "none" => return Ok(ColorBy::none()),
        _ => {
            let mut parts = input.splitn(3, ':');
            let (Some("aa"), Some(gene), Some(residue)) = (parts.next(), parts.next(), parts.next()) else {
                anyhow::bail!("invalid color mode: {input} (expected lineage|country|none|aa:GENE:POS)");
            };
            let residue = residue
                .parse::<u32>()
                .with_context(|| format!("invalid residue position: {residue}"))?;
            return Ok(ColorBy::amino_acid(gene, residue));
        }
    };
    Ok(ColorBy {
        variable,
        ..ColorBy::default()
    })
}

/// `x,y,zoom,width,height`.
fn parse_view(input: &str) -> Result<ViewState> {
    let parts = input
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid view: {input}"))?;
    let [x, y, zoom, width, height] = parts[..] else {
        anyhow::bail!("invalid view: {input} (expected x,y,zoom,width,height)");
    };
    Ok(ViewState {
        target: Some([x, y]),
        zoom,
        width,
        height,
        x_type: None,
    })
}

fn parse_args_from<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = OsString>,
{
    let mut backend = None;
    let mut sid = None;
    let mut url_on_fail = None;
    let mut searches = Vec::new();
    let mut color_by = None;
    let mut view = None;
    let mut x_type = None;
    let mut details = None;
    let mut hover = None;
    let mut tip_atts = Vec::new();
    let mut nextstrain = None;
    let mut duration = Duration::from_secs(30);
    let mut save_config = false;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--backend" {
            backend = Some(next_str(&mut args, "--backend", "a url")?);
        } else if arg == "--sid" {
            sid = Some(next_str(&mut args, "--sid", "a session id")?);
        } else if arg == "--url-on-fail" {
            url_on_fail = Some(next_str(&mut args, "--url-on-fail", "a url")?);
        } else if arg == "--search" {
            searches.push(parse_search(&next_str(&mut args, "--search", "category:value")?)?);
        } else if arg == "--color-by" {
            color_by = Some(parse_color_by(&next_str(&mut args, "--color-by", "a color mode")?)?);
        } else if arg == "--view" {
            view = Some(parse_view(&next_str(&mut args, "--view", "x,y,zoom,width,height")?)?);
        } else if arg == "--x-type" {
            let value = next_str(&mut args, "--x-type", "x_dist|x_time")?;
            let Some(parsed) = XType::parse(&value) else {
                anyhow::bail!("invalid x type: {value} (expected x_dist|x_time)");
            };
            x_type = Some(parsed);
        } else if arg == "--details" {
            details = Some(parse_node(&next_str(&mut args, "--details", "a node id")?)?);
        } else if arg == "--hover" {
            hover = Some(parse_node(&next_str(&mut args, "--hover", "a node id")?)?);
        } else if arg == "--tip-att" {
            let value = next_str(&mut args, "--tip-att", "node:key")?;
            let Some((node, key)) = value.split_once(':') else {
                anyhow::bail!("invalid tip attribute: {value} (expected node:key)");
            };
            tip_atts.push((parse_node(node)?, key.to_string()));
        } else if arg == "--nextstrain" {
            nextstrain = Some(parse_node(&next_str(&mut args, "--nextstrain", "a node id")?)?);
        } else if arg == "--duration-secs" {
            let value = next_str(&mut args, "--duration-secs", "seconds")?;
            let secs = value
                .parse::<u64>()
                .with_context(|| format!("invalid duration: {value}"))?;
            duration = Duration::from_secs(secs);
        } else if arg == "--save-config" {
            save_config = true;
        } else {
            anyhow::bail!("unknown argument: {:?}", arg);
        }
    }

    let Some(sid) = sid else {
        anyhow::bail!("--sid is required");
    };
    if let Some(v) = view.as_mut() {
        v.x_type = x_type;
    }

    Ok(CliArgs {
        backend,
        sid,
        url_on_fail,
        searches,
        color_by,
        view,
        x_type,
        details,
        hover,
        tip_atts,
        nextstrain,
        duration,
        save_config,
    })
}
