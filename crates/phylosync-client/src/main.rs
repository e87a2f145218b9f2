use anyhow::{Context, Result};
use phylosync_client::app::args::{parse_args, CliArgs};
use phylosync_client::app::events::SessionEvent;
use phylosync_client::app::Session;
use phylosync_client::graph::{DetailSlot, SyncState};
use phylosync_client::net::BackendClient;
use phylosync_client::util::config;
use phylosync_client::util::ids::random_search_id;
use phylosync_core::SearchItem;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const TICK: Duration = Duration::from_millis(16);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn seed_state(state: &mut SyncState, args: &CliArgs, now: Instant) {
    for (category, value) in &args.searches {
        state.search.add(SearchItem {
            id: random_search_id(),
            category: *category,
            value: value.clone(),
            enabled: true,
        });
    }
    if let Some(color_by) = &args.color_by {
        state.set_color_by(color_by.clone());
    }
    if let Some(view) = &args.view {
        state.report_view_state(view, now);
    }
    state.details.set_target(DetailSlot::Selected, args.details);
    state.details.set_target(DetailSlot::Hover, args.hover);
    for (node, key) in &args.tip_atts {
        state.details.request_tip_attribute(*node, key.clone());
    }
}

fn handle_event(ev: &SessionEvent) {
    match ev {
        SessionEvent::Alert(msg) => tracing::warn!(alert = %msg, "alert"),
        SessionEvent::Navigate(url) => tracing::info!(%url, "navigation requested"),
        SessionEvent::RefreshRequested => tracing::info!("node refresh requested"),
        SessionEvent::DictionaryFinal(phase) => tracing::info!(?phase, "mutation dictionary final"),
        SessionEvent::ConfigReady => tracing::info!("config ready"),
        SessionEvent::ConfigUnavailable => tracing::error!("config unavailable"),
        SessionEvent::Status(Some(status)) => tracing::debug!(%status, "status"),
        SessionEvent::Status(None) => {}
    }
}

fn print_summary(session: &mut Session) {
    let st = &mut session.state;
    println!("nodes: {}", st.nodes.len());
    if let Some(cfg) = st.session_config() {
        println!(
            "mutations: {} ({:?}), genes: {}",
            cfg.dictionary.len(),
            st.dictionary.phase(),
            cfg.all_genes.len()
        );
    }
    for view in st.search.views() {
        let count = view.result.map(|r| r.count).unwrap_or(0);
        println!(
            "search {:?} {:?} -> {} [{:02x}{:02x}{:02x}]{}",
            view.item.category,
            view.item.value,
            count,
            view.color[0],
            view.color[1],
            view.color[2],
            if view.loading { " (loading)" } else { "" }
        );
    }
    let highlighted = st.search.union().len();
    if highlighted > 0 {
        print!("highlighted: {highlighted}");
        if let Some(e) = st.search.zoom_extent_all() {
            print!(" within x {:.3}..{:.3}, y {:.3}..{:.3}", e.min_x, e.max_x, e.min_y, e.max_y);
        }
        println!();
    }
    let colors = st.node_colors();
    let mut histogram: BTreeMap<[u8; 3], usize> = BTreeMap::new();
    for rgb in colors.values() {
        *histogram.entry(*rgb).or_default() += 1;
    }
    for (rgb, n) in histogram {
        println!("color {:02x}{:02x}{:02x}: {n}", rgb[0], rgb[1], rgb[2]);
    }
    for which in [DetailSlot::Selected, DetailSlot::Hover] {
        if let Some(d) = st.details.value(which) {
            println!("{} {}: {}", which.as_str(), d.node_id, d.data);
        }
    }
    println!(
        "messages: {} ({:.1}/s)",
        st.perf.messages_total, st.perf.message_rate
    );
}

fn main() -> Result<()> {
    init_tracing();
    let args = parse_args()?;
    let mut cfg = config::load_or_default();
    args.apply_to(&mut cfg);
    if args.save_config {
        let path = config::save(&cfg)?;
        tracing::info!(path = %path.display(), "saved client config");
    }

    let rt = tokio::runtime::Runtime::new().context("tokio runtime")?;
    let client = BackendClient::new(&cfg, args.sid.clone())?;
    let state = SyncState::from_client_config(&cfg);
    let mut session = Session::new(rt.handle().clone(), client, state, cfg.channel_drain_limit);

    let started = Instant::now();
    seed_state(&mut session.state, &args, started);
    if let Some(node) = args.nextstrain {
        handle_event(&session.open_nextstrain_json(node));
    }
    session.start();

    loop {
        let now = Instant::now();
        for ev in session.pump(now) {
            handle_event(&ev);
        }
        if session.state.is_idle() {
            tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "session idle");
            break;
        }
        if now.duration_since(started) >= args.duration {
            tracing::warn!("giving up before the session settled");
            break;
        }
        std::thread::sleep(TICK);
    }

    print_summary(&mut session);
    drop(session);
    rt.shutdown_timeout(Duration::from_millis(200));
    Ok(())
}
