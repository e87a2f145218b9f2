use phylosync_core::{ViewportBounds, XType};
use std::time::{Duration, Instant};

use crate::graph::slot::{RequestHandle, Slot};

/// What the visualization reports about its camera.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewState {
    pub target: Option<[f64; 2]>,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
    pub x_type: Option<XType>,
}

impl ViewState {
    pub fn bounds(&self) -> ViewportBounds {
        let Some([tx, ty]) = self.target else {
            return ViewportBounds::unfiltered(self.x_type);
        };
        if !(self.width > 0.0 && self.height > 0.0) || !self.zoom.is_finite() {
            return ViewportBounds::unfiltered(self.x_type);
        }
        let scale = 2f64.powf(self.zoom);
        let half_w = self.width / 2.0 / scale;
        let half_h = self.height / 2.0 / scale;
        ViewportBounds {
            min_x: Some(tx - half_w),
            max_x: Some(tx + half_w),
            min_y: Some(ty - half_h),
            max_y: Some(ty + half_h),
            x_type: self.x_type,
        }
    }
}

/// Keeps the working node set in step with the view.
///
/// Reported bounds only turn into a query after they have been stable for
/// `debounce`. Issuing goes through a [`Slot`], so a newer query cancels an
/// older one still in flight.
#[derive(Debug)]
pub struct ViewportCoordinator {
    slot: Slot,
    debounce: Duration,
    reported: Option<(ViewportBounds, Instant)>,
    settled: Option<ViewportBounds>,
    issued: Option<ViewportBounds>,
    /// Re-issue the settled bounds once `debounce` has passed since this instant.
    refresh: Option<Instant>,
}

impl ViewportCoordinator {
    pub fn new(debounce: Duration) -> Self {
        Self {
            slot: Slot::default(),
            debounce,
            reported: None,
            settled: None,
            issued: None,
            refresh: None,
        }
    }

    pub fn report(&mut self, bounds: ViewportBounds, now: Instant) {
        match &self.reported {
            Some((prev, _)) if *prev == bounds => {}
            _ => self.reported = Some((bounds, now)),
        }
    }

    /// Bounds the rest of the session should query with: last settled, or none before the first view.
    pub fn current_bounds(&self, default_x_type: XType) -> ViewportBounds {
        self.settled
            .unwrap_or_else(|| ViewportBounds::unfiltered(Some(default_x_type)))
    }

    /// Returns true when the reported bounds settled into something new during this tick.
    pub fn settle(&mut self, now: Instant) -> bool {
        let Some((bounds, since)) = self.reported else {
            return false;
        };
        if now.duration_since(since) < self.debounce {
            return false;
        }
        if self.settled == Some(bounds) {
            return false;
        }
        self.settled = Some(bounds);
        true
    }

    /// Next node query to run, if any. `ready` is false until mutation indices can be resolved.
    pub fn poll(
        &mut self,
        now: Instant,
        ready: bool,
        default_x_type: XType,
    ) -> Option<(RequestHandle, ViewportBounds)> {
        self.settle(now);
        if !ready {
            return None;
        }
        let bounds = self.current_bounds(default_x_type);
        let refresh_due = self
            .refresh
            .is_some_and(|since| now.duration_since(since) >= self.debounce);
        if self.issued == Some(bounds) && !refresh_due {
            return None;
        }
        self.refresh = None;
        self.issued = Some(bounds);
        let handle = self.slot.issue();
        tracing::debug!(generation = handle.generation(), ?bounds, "node query issued");
        Some((handle, bounds))
    }

    pub fn accept(&mut self, generation: u64) -> bool {
        self.slot.accept(generation)
    }

    /// Re-arms the coordinator; the current bounds are re-issued one debounce period after `now`.
    pub fn request_refresh(&mut self, now: Instant) {
        self.refresh = Some(now);
    }

    pub fn in_flight(&self) -> bool {
        self.slot.in_flight()
    }

    pub fn has_pending_change(&self) -> bool {
        if self.refresh.is_some() {
            return true;
        }
        match self.reported {
            Some((bounds, _)) => self.settled != Some(bounds),
            None => false,
        }
    }
}
