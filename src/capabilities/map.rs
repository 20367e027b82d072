use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::event::Coordinate;

/// A pin on the map surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    pub id: String,
    pub position: Coordinate,
    pub label: String,
}

/// A camera movement the shell should perform with its map SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraTarget {
    pub center: Coordinate,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub duration_ms: u64,
}

/// Instructions for the shell-owned map view. All fire-and-forget; the
/// map never answers back through this capability, only through user
/// interaction events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapOperation {
    /// Replace the full marker set.
    SetMarkers { markers: Vec<MapMarker> },
    /// Draw the active polyline plus dimmed alternatives.
    DrawRoute {
        active: Vec<Coordinate>,
        alternatives: Vec<Vec<Coordinate>>,
    },
    ClearRoute,
    SetLiveMarker {
        position: Coordinate,
        bearing_deg: f64,
    },
    RemoveLiveMarker,
    EaseTo { camera: CameraTarget },
    FlyTo { camera: CameraTarget },
    FitBounds {
        south_west: Coordinate,
        north_east: Coordinate,
        padding_px: u32,
    },
}

impl Operation for MapOperation {
    type Output = ();
}

pub struct MapSurface<E> {
    context: CapabilityContext<MapOperation, E>,
}

impl<E> MapSurface<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<MapOperation, E>) -> Self {
        Self { context }
    }

    pub fn set_markers(&self, markers: Vec<MapMarker>) {
        self.notify(MapOperation::SetMarkers { markers });
    }

    pub fn draw_route(&self, active: Vec<Coordinate>, alternatives: Vec<Vec<Coordinate>>) {
        self.notify(MapOperation::DrawRoute {
            active,
            alternatives,
        });
    }

    pub fn clear_route(&self) {
        self.notify(MapOperation::ClearRoute);
    }

    pub fn set_live_marker(&self, position: Coordinate, bearing_deg: f64) {
        self.notify(MapOperation::SetLiveMarker {
            position,
            bearing_deg,
        });
    }

    pub fn remove_live_marker(&self) {
        self.notify(MapOperation::RemoveLiveMarker);
    }

    pub fn ease_to(&self, camera: CameraTarget) {
        self.notify(MapOperation::EaseTo { camera });
    }

    pub fn fly_to(&self, camera: CameraTarget) {
        self.notify(MapOperation::FlyTo { camera });
    }

    pub fn fit_bounds(&self, south_west: Coordinate, north_east: Coordinate, padding_px: u32) {
        self.notify(MapOperation::FitBounds {
            south_west,
            north_east,
            padding_px,
        });
    }

    fn notify(&self, operation: MapOperation) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(operation).await;
        });
    }
}

impl<Ev> Capability<Ev> for MapSurface<Ev> {
    type Operation = MapOperation;
    type MappedSelf<MappedEv> = MapSurface<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        MapSurface::new(self.context.map_event(f))
    }
}
