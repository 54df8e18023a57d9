//! Viewport visibility and proximity tracking.
//!
//! The host owns layout; it reports element and viewport rectangles and gets
//! back a [`VisibilityState`]. Each [`Observation`] keeps two independent
//! thresholds at once:
//!
//! - **tight**: at least `threshold` of the element's area is inside the
//!   viewport (plus an optional root margin)
//! - **loose**: the element overlaps the viewport grown by twice the preload
//!   distance, which scales with the current network tier
//!
//! Dropping an [`Observation`] stops both.

use crate::network::NetworkMonitor;
use crate::types::Priority;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width; negative values are treated as zero.
    pub width: f64,
    /// Height; negative values are treated as zero.
    pub height: f64,
}

impl Rect {
    /// Rectangle from origin and size.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn right(&self) -> f64 {
        self.x + self.width.max(0.0)
    }

    fn bottom(&self) -> f64 {
        self.y + self.height.max(0.0)
    }

    /// Grow by `margin` on every side.
    #[must_use]
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width.max(0.0) + margin * 2.0,
            height: self.height.max(0.0) + margin * 2.0,
        }
    }

    /// Whether the rectangles overlap or touch.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// Fraction of this rectangle's area that lies inside `other`.
    ///
    /// A zero-area rectangle counts as fully inside when it touches `other`.
    #[must_use]
    pub fn visible_fraction(&self, other: &Self) -> f64 {
        if !self.intersects(other) {
            return 0.0;
        }
        let area = self.width.max(0.0) * self.height.max(0.0);
        if area == 0.0 {
            return 1.0;
        }
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        (w.max(0.0) * h.max(0.0)) / area
    }
}

/// What the host needs to know about one observed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VisibilityState {
    /// The tight threshold is currently met.
    pub is_intersecting: bool,
    /// The tight threshold has been met at least once.
    pub has_triggered_once: bool,
    /// The element is within the proximity margin.
    pub is_near_viewport: bool,
}

/// Per-element observation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserveOptions {
    /// Fraction of the element that must be inside the viewport.
    pub threshold: f64,
    /// Extra margin around the viewport for the tight threshold, in pixels.
    pub root_margin_px: u32,
    /// Overrides the network-derived preload distance.
    pub preload_distance_px: Option<u32>,
    /// Keep `should_load` true after the first time the element was visible.
    pub trigger_once: bool,
    /// Base load priority before visibility boosts.
    pub priority: Priority,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            root_margin_px: 0,
            preload_distance_px: None,
            trigger_once: true,
            priority: crate::types::DEFAULT_PRIORITY,
        }
    }
}

type Registry = Arc<Mutex<HashMap<u64, VisibilityState>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<u64, VisibilityState>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Hands out [`Observation`]s and tracks how many are live.
#[derive(Debug, Clone)]
pub struct ViewportObserver {
    network: NetworkMonitor,
    registry: Registry,
    next_id: Arc<AtomicU64>,
}

impl ViewportObserver {
    /// Observer whose proximity margin follows `network`.
    #[must_use]
    pub fn new(network: NetworkMonitor) -> Self {
        Self {
            network,
            registry: Arc::default(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start observing one element.
    #[must_use]
    pub fn observe(&self, options: ObserveOptions) -> Observation {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.registry).insert(id, VisibilityState::default());
        Observation {
            id,
            options,
            network: self.network.clone(),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Number of live tight plus loose observations (two per element).
    #[must_use]
    pub fn active_observations(&self) -> usize {
        lock(&self.registry).len() * 2
    }
}

/// Both observations of one element. Dropping it stops them.
#[derive(Debug)]
pub struct Observation {
    id: u64,
    options: ObserveOptions,
    network: NetworkMonitor,
    registry: Registry,
}

impl Observation {
    /// Proximity margin in pixels for the current network profile.
    #[must_use]
    pub fn proximity_margin_px(&self) -> u32 {
        let distance = self
            .options
            .preload_distance_px
            .unwrap_or_else(|| self.network.current_profile().preload_distance_px);
        distance.saturating_mul(2)
    }

    /// Feed new geometry and get the updated state.
    pub fn report(&self, element: Rect, viewport: Rect) -> VisibilityState {
        let tight_root = viewport.expand(f64::from(self.options.root_margin_px));
        let loose_root = viewport.expand(f64::from(self.proximity_margin_px()));

        let visible = element.intersects(&tight_root)
            && element.visible_fraction(&tight_root) >= self.options.threshold;
        let near = element.intersects(&loose_root);

        let mut registry = lock(&self.registry);
        let Some(state) = registry.get_mut(&self.id) else {
            return VisibilityState::default();
        };
        *state = VisibilityState {
            is_intersecting: visible,
            has_triggered_once: state.has_triggered_once || (visible && self.options.trigger_once),
            is_near_viewport: near,
        };
        trace!(id = self.id, state = ?*state, "Visibility updated");
        *state
    }

    /// Last reported state.
    #[must_use]
    pub fn state(&self) -> VisibilityState {
        lock(&self.registry)
            .get(&self.id)
            .copied()
            .unwrap_or_default()
    }

    /// Whether the element's media should be requested now.
    #[must_use]
    pub fn should_load(&self) -> bool {
        let state = self.state();
        if self.options.trigger_once {
            state.has_triggered_once || state.is_intersecting
        } else {
            state.is_intersecting
        }
    }

    /// Whether the element is close enough, and the network good enough, to prefetch.
    #[must_use]
    pub fn should_preload(&self) -> bool {
        self.state().is_near_viewport && self.network.should_preload()
    }

    /// Base priority boosted by 3 when visible or by 1 when near.
    #[must_use]
    pub fn effective_priority(&self) -> Priority {
        let state = self.state();
        let base = self.options.priority;
        if state.is_intersecting {
            base.saturating_add(3)
        } else if state.is_near_viewport {
            base.saturating_add(1)
        } else {
            base
        }
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        if lock(&self.registry).remove(&self.id).is_some() {
            trace!(id = self.id, "Observation stopped");
        }
    }
}
