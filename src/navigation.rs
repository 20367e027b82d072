//! Route candidates and the live turn-by-turn session.
//!
//! Everything here is pure bookkeeping over position fixes. The shell
//! owns the actual GPS watch; fixes arrive as events tagged with a
//! watch generation so fixes from a cancelled watch can be discarded.

use serde::{Deserialize, Serialize};

use crate::capabilities::geolocation::PositionFix;
use crate::event::Coordinate;
use crate::routing::Route;
use crate::{
    haversine_distance, initial_bearing, normalize_bearing, ANNOUNCE_RADIUS_M,
    BEARING_MIN_DISPLACEMENT_M, FAST_FOLLOW_PITCH, FAST_FOLLOW_ZOOM, FAST_SPEED_CUTOFF_MPS,
    MEDIUM_FOLLOW_PITCH, MEDIUM_FOLLOW_ZOOM, MEDIUM_SPEED_CUTOFF_MPS, SLOW_FOLLOW_PITCH,
    SLOW_FOLLOW_ZOOM, STATIONARY_SPEED_MPS,
};

/// Camera framing derived from ground speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowCamera {
    pub zoom: f64,
    pub pitch: f64,
}

/// The maneuver the traveller is closest to, by anchor distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpcomingStep {
    pub index: usize,
    pub distance_m: f64,
}

/// Everything the app needs to react to one position fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub position: Coordinate,
    pub speed_mps: f64,
    pub bearing: Option<f64>,
    pub camera: FollowCamera,
    pub announce: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationSession {
    pub start: Option<Coordinate>,
    pub dest: Option<Coordinate>,
    pub routes: Vec<Route>,
    pub active: Option<usize>,
    pub route_pending: bool,
    pub is_navigating: bool,
    pub watch_generation: u64,
    pub last_announced_step: Option<usize>,
    pub upcoming_step: Option<UpcomingStep>,
    pub last_fix: Option<PositionFix>,
    pub last_bearing: Option<f64>,
    pub compass_heading: Option<f64>,
    pub live_speed_mps: f64,
}

impl NavigationSession {
    #[must_use]
    pub fn active_route(&self) -> Option<&Route> {
        self.routes.get(self.active?)
    }

    pub fn install_routes(&mut self, routes: Vec<Route>) {
        self.active = if routes.is_empty() { None } else { Some(0) };
        self.routes = routes;
        self.last_announced_step = None;
        self.upcoming_step = None;
    }

    /// Switches to another already-fetched candidate. Announcement
    /// progress belongs to the old route, so it resets.
    pub fn select_route(&mut self, index: usize) -> bool {
        if index >= self.routes.len() {
            return false;
        }
        self.active = Some(index);
        self.last_announced_step = None;
        self.upcoming_step = None;
        true
    }

    pub fn clear_routes(&mut self) {
        self.routes.clear();
        self.active = None;
        self.last_announced_step = None;
        self.upcoming_step = None;
    }

    /// Marks the session live and returns the new watch generation.
    /// Fixes carrying an older generation must be ignored.
    pub fn begin_navigation(&mut self) -> u64 {
        self.is_navigating = true;
        self.watch_generation += 1;
        self.last_announced_step = None;
        self.upcoming_step = None;
        self.last_fix = None;
        self.last_bearing = None;
        self.live_speed_mps = 0.0;
        self.watch_generation
    }

    /// Ends the live session. The generation bump invalidates any fix
    /// still in flight from the watch being torn down. The compass
    /// heading survives; the device is still pointing somewhere.
    pub fn end_navigation(&mut self) {
        self.is_navigating = false;
        self.watch_generation += 1;
        self.last_announced_step = None;
        self.upcoming_step = None;
        self.last_fix = None;
        self.last_bearing = None;
        self.live_speed_mps = 0.0;
    }

    /// Ground speed in m/s. Prefers the device-reported speed, falls
    /// back to displacement over elapsed time, and reports 0 when
    /// neither is usable.
    #[must_use]
    pub fn speed_for(&self, fix: &PositionFix) -> f64 {
        if let Some(speed) = fix.speed_mps {
            if speed.is_finite() && speed >= 0.0 {
                return speed;
            }
        }

        let Some(prev) = &self.last_fix else {
            return 0.0;
        };
        let elapsed_ms = fix.timestamp_ms.saturating_sub(prev.timestamp_ms);
        if elapsed_ms == 0 {
            return 0.0;
        }

        let (Ok(from), Ok(to)) = (
            Coordinate::new(prev.lat, prev.lng),
            Coordinate::new(fix.lat, fix.lng),
        ) else {
            return 0.0;
        };

        #[allow(clippy::cast_precision_loss)]
        let elapsed_s = elapsed_ms as f64 / 1000.0;
        haversine_distance(from, to) / elapsed_s
    }

    /// Bearing in degrees, `[0, 360)`. Tries, in order: the device
    /// heading, the direction of travel when displacement since the
    /// previous fix is large enough to trust, the compass while
    /// effectively stationary, then whatever bearing was shown last.
    #[must_use]
    pub fn bearing_for(&self, fix: &PositionFix, speed_mps: f64) -> Option<f64> {
        if let Some(heading) = fix.heading_deg {
            if heading.is_finite() {
                return Some(normalize_bearing(heading));
            }
        }

        if let Some(prev) = &self.last_fix {
            if let (Ok(from), Ok(to)) = (
                Coordinate::new(prev.lat, prev.lng),
                Coordinate::new(fix.lat, fix.lng),
            ) {
                if haversine_distance(from, to) > BEARING_MIN_DISPLACEMENT_M {
                    return Some(initial_bearing(from, to));
                }
            }
        }

        if speed_mps < STATIONARY_SPEED_MPS {
            if let Some(compass) = self.compass_heading {
                return Some(compass);
            }
        }

        self.last_bearing
    }

    /// Folds one position fix into the session. Returns None when the
    /// fix does not carry a usable coordinate; the previous state is
    /// left untouched so a single bad fix cannot wipe the display.
    pub fn apply_fix(&mut self, fix: PositionFix) -> Option<TickOutcome> {
        let position = Coordinate::new(fix.lat, fix.lng).ok()?;

        let speed_mps = self.speed_for(&fix);
        let bearing = self.bearing_for(&fix, speed_mps);
        let camera = camera_for_speed(speed_mps);

        self.upcoming_step = self
            .active_route()
            .and_then(|route| nearest_step(route, position))
            .map(|(index, distance_m)| UpcomingStep { index, distance_m });

        let mut announce = None;
        if let Some(upcoming) = self.upcoming_step {
            if self.should_announce(upcoming.index, upcoming.distance_m) {
                self.last_announced_step = Some(upcoming.index);
                announce = Some(upcoming.index);
            }
        }

        self.last_fix = Some(fix);
        if bearing.is_some() {
            self.last_bearing = bearing;
        }
        self.live_speed_mps = speed_mps;

        Some(TickOutcome {
            position,
            speed_mps,
            bearing,
            camera,
            announce,
        })
    }

    // A step is announced once, inside the radius, and never after a
    // later step has already been announced. Backtracking past an old
    // maneuver stays silent.
    fn should_announce(&self, index: usize, distance_m: f64) -> bool {
        if distance_m >= ANNOUNCE_RADIUS_M {
            return false;
        }
        self.last_announced_step.map_or(true, |last| index > last)
    }
}

#[must_use]
pub fn camera_for_speed(speed_mps: f64) -> FollowCamera {
    if speed_mps > FAST_SPEED_CUTOFF_MPS {
        FollowCamera {
            zoom: FAST_FOLLOW_ZOOM,
            pitch: FAST_FOLLOW_PITCH,
        }
    } else if speed_mps > MEDIUM_SPEED_CUTOFF_MPS {
        FollowCamera {
            zoom: MEDIUM_FOLLOW_ZOOM,
            pitch: MEDIUM_FOLLOW_PITCH,
        }
    } else {
        FollowCamera {
            zoom: SLOW_FOLLOW_ZOOM,
            pitch: SLOW_FOLLOW_PITCH,
        }
    }
}

/// Index and distance of the step whose anchor is closest to the
/// traveller. Straight-line distance to anchors, not distance along
/// the route.
#[must_use]
pub fn nearest_step(route: &Route, position: Coordinate) -> Option<(usize, f64)> {
    route
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| (index, haversine_distance(position, step.anchor)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}
