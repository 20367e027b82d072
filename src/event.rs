use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::capabilities::geolocation::GeolocationResult;
use crate::routing::OsrmResponse;
use crate::search::{GeocodingHit, SearchTarget};
use crate::store::{LocationDraft, LocationPatch};
use crate::AppConfig;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(LocationId);
typed_id!(GroupId);

// --- Validation errors ---

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("coordinate out of range: lat {0}, lng {1}")]
    InvalidCoordinate(f64, f64),
    #[error("a name is required")]
    EmptyName,
}

// --- Validated coordinate ---

/// A latitude/longitude pair that is known to be finite and in range.
/// Construction is the only place validation happens, so everything
/// downstream can treat the values as trustworthy.
#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        if lat.is_nan()
            || lat.is_infinite()
            || lng.is_nan()
            || lng.is_infinite()
            || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lng)
        {
            return Err(ValidationError::InvalidCoordinate(lat, lng));
        }
        Ok(Self { lat, lng })
    }

    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lng.to_bits() == other.lng.to_bits()
    }
}

impl Eq for Coordinate {}

// --- Events ---

/// Everything that can happen to the app, from the shell or from a
/// capability callback. Variants marked `serde(skip)` carry capability
/// results and are never constructed by the shell directly.
#[derive(Serialize, Deserialize)]
pub enum Event {
    // Lifecycle
    AppStarted {
        config: AppConfig,
    },
    #[serde(skip)]
    LocationsLoaded(Result<Option<Vec<u8>>, crux_kv::error::KeyValueError>),
    #[serde(skip)]
    GroupsLoaded(Result<Option<Vec<u8>>, crux_kv::error::KeyValueError>),
    #[serde(skip)]
    StorePersisted(Result<Option<Vec<u8>>, crux_kv::error::KeyValueError>),

    // Saved locations
    SaveLocation {
        draft: LocationDraft,
    },
    UpdateLocation {
        id: LocationId,
        patch: Box<LocationPatch>,
    },
    DeleteLocation {
        id: LocationId,
    },
    ImportLocations {
        records: serde_json::Value,
        group_id: Option<GroupId>,
    },

    // Groups
    CreateGroup {
        name: String,
    },
    RenameGroup {
        id: GroupId,
        name: String,
    },
    ToggleGroupCollapsed {
        id: GroupId,
    },
    DeleteGroup {
        id: GroupId,
    },
    AssignLocationToGroup {
        id: LocationId,
        group_id: Option<GroupId>,
    },

    // Map interaction
    MapClicked {
        lat: f64,
        lng: f64,
    },
    CancelDraftPin,
    MarkerSelected {
        id: LocationId,
    },
    ClearSelection,
    FocusLocation {
        id: LocationId,
    },

    // Search
    SearchQueryChanged {
        target: SearchTarget,
        query: String,
    },
    SearchDebounceElapsed {
        generation: u64,
    },
    #[serde(skip)]
    SearchResponded {
        generation: u64,
        response: Box<crux_http::Result<crux_http::Response<Vec<GeocodingHit>>>>,
    },
    SearchHitChosen {
        index: usize,
    },
    UseDeviceLocation {
        target: SearchTarget,
    },
    #[serde(skip)]
    DevicePositionFetched {
        target: SearchTarget,
        result: GeolocationResult,
    },

    // Routing
    SetRouteEndpoint {
        target: SearchTarget,
        lat: f64,
        lng: f64,
    },
    FetchRoute,
    #[serde(skip)]
    RouteFetched(Box<crux_http::Result<crux_http::Response<OsrmResponse>>>),
    SelectRoute {
        index: usize,
    },
    ClearRoute,

    // Live navigation
    StartNavigation,
    #[serde(skip)]
    PositionUpdated {
        generation: u64,
        result: GeolocationResult,
    },
    CompassUpdated {
        heading_deg: f64,
    },
    StopNavigation,

    // Transient surfaces
    DismissToast,
    DismissError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = LocationId::generate();
        let b = LocationId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_typed_id_display() {
        let id = GroupId::new("favorites");
        assert_eq!(id.to_string(), "favorites");
    }

    #[test]
    fn coordinate_accepts_valid_range() {
        assert!(Coordinate::new(0.0, 0.0).is_ok());
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn coordinate_rejects_out_of_range() {
        assert!(Coordinate::new(90.1, 0.0).is_err());
        assert!(Coordinate::new(-90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, 180.1).is_err());
        assert!(Coordinate::new(0.0, -180.1).is_err());
    }

    #[test]
    fn coordinate_rejects_nan() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn coordinate_rejects_infinite() {
        assert!(Coordinate::new(f64::INFINITY, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn coordinate_equality_is_bitwise() {
        let a = Coordinate::new(1.5, 2.5).unwrap();
        let b = Coordinate::new(1.5, 2.5).unwrap();
        let c = Coordinate::new(1.5, 2.6).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn event_size_is_reasonable() {
        // Events move through channels constantly; keep them small.
        assert!(std::mem::size_of::<Event>() <= 128);
    }
}
