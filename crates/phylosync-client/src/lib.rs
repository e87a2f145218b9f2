//! Viewport-driven sync between a phylogeny backend and a tree view.

pub mod app;
pub mod graph;
pub mod net;
pub mod util;
