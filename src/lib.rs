#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod event;
pub mod model;
pub mod navigation;
pub mod routing;
pub mod search;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::event::{Coordinate, ValidationError};

pub use app::{App, ViewModel};
pub use capabilities::{Capabilities, Effect};
pub use event::Event;
pub use model::Model;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const MPS_TO_KMH: f64 = 3.6;

pub const DEFAULT_MAP_ZOOM: f64 = 13.0;
pub const FOCUS_ZOOM: f64 = 16.0;
pub const CAMERA_EASE_MS: u64 = 1000;
pub const ROUTE_FIT_PADDING_PX: u32 = 48;

pub const ANNOUNCE_RADIUS_M: f64 = 50.0;
pub const BEARING_MIN_DISPLACEMENT_M: f64 = 2.0;
pub const STATIONARY_SPEED_MPS: f64 = 1.0;

pub const FAST_SPEED_CUTOFF_MPS: f64 = 15.0;
pub const MEDIUM_SPEED_CUTOFF_MPS: f64 = 8.0;
pub const FAST_FOLLOW_ZOOM: f64 = 15.0;
pub const FAST_FOLLOW_PITCH: f64 = 60.0;
pub const MEDIUM_FOLLOW_ZOOM: f64 = 16.5;
pub const MEDIUM_FOLLOW_PITCH: f64 = 55.0;
pub const SLOW_FOLLOW_ZOOM: f64 = 18.5;
pub const SLOW_FOLLOW_PITCH: f64 = 45.0;

pub const SEARCH_DEBOUNCE_MS: u64 = 300;
pub const SEARCH_RESULT_LIMIT: u32 = 5;

pub const LOCATIONS_STORAGE_KEY: &str = "waymark:locations";
pub const GROUPS_STORAGE_KEY: &str = "waymark:groups";

pub const DEFAULT_ROUTING_BASE_URL: &str = "https://router.project-osrm.org";
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Validation,
    NotFound,
    NoRoute,
    RoutingService,
    Storage,
    Serialization,
    Deserialization,
    Location,
    LocationPermissionDenied,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::NoRoute => "NO_ROUTE",
            Self::RoutingService => "ROUTING_SERVICE_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Location => "LOCATION_ERROR",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Timeout | Self::Storage | Self::Location => {
                ErrorSeverity::Transient
            }

            Self::Serialization | Self::Deserialization | Self::InvalidState | Self::Internal => {
                ErrorSeverity::Fatal
            }

            Self::Validation
            | Self::NotFound
            | Self::NoRoute
            | Self::RoutingService
            | Self::LocationPermissionDenied
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::Storage | Self::Location
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Please check your internet connection and try again.".into()
            }
            ErrorKind::Timeout => "The request timed out. Please try again.".into(),
            ErrorKind::Validation | ErrorKind::InvalidState => self.message.clone(),
            ErrorKind::NotFound => "The requested item could not be found.".into(),
            ErrorKind::NoRoute => "No route could be found between those points.".into(),
            ErrorKind::RoutingService => {
                "The routing service could not handle that request. Please try again later.".into()
            }
            ErrorKind::Storage => {
                "Unable to save your data locally. Recent changes may be lost.".into()
            }
            ErrorKind::Serialization | ErrorKind::Deserialization => {
                "A data error occurred. Please contact support if this persists.".into()
            }
            ErrorKind::Location => {
                "Unable to determine your location. Please check your GPS settings.".into()
            }
            ErrorKind::LocationPermissionDenied => {
                "Location access is required. Please enable location permissions in Settings."
                    .into()
            }
            ErrorKind::Internal | ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again.".into()
            }
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16, body: Option<&[u8]>) -> Self {
        let kind = match status {
            400 => ErrorKind::Validation,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        };

        let message = body
            .and_then(|b| serde_json::from_slice::<ApiErrorResponse>(b).ok())
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP error: {status}"));

        Self::new(kind, message)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        Self::new(ErrorKind::Validation, e.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

pub type AppResult<T> = Result<T, AppError>;

/// Great-circle distance in meters between two valid coordinates.
#[must_use]
pub fn haversine_distance(p1: Coordinate, p2: Coordinate) -> f64 {
    const EPSILON: f64 = 1e-10;

    if (p1.lat() - p2.lat()).abs() < EPSILON && (p1.lng() - p2.lng()).abs() < EPSILON {
        return 0.0;
    }

    let lat1_rad = p1.lat().to_radians();
    let lat2_rad = p2.lat().to_radians();
    let delta_lat = (p2.lat() - p1.lat()).to_radians();
    let delta_lng = (p2.lng() - p1.lng()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);

    let a = a.clamp(0.0, 1.0);

    let c = 2.0 * a.sqrt().asin();

    let result = EARTH_RADIUS_M * c;

    if result.is_finite() {
        result
    } else {
        f64::MAX
    }
}

/// Initial great-circle bearing from one coordinate to another, in degrees
/// clockwise from true north, normalized to `[0, 360)`.
#[must_use]
pub fn initial_bearing(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.lat().to_radians();
    let lat2 = to.lat().to_radians();
    let delta_lng = (to.lng() - from.lng()).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

    normalize_bearing(y.atan2(x).to_degrees())
}

#[must_use]
pub fn normalize_bearing(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    degrees.rem_euclid(360.0)
}

#[must_use]
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() || meters < 0.0 {
        return "Unknown".to_string();
    }

    if meters < 1000.0 {
        format!("{meters:.0} m")
    } else if meters < 10_000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{:.0} km", meters / 1000.0)
    }
}

#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "Unknown".to_string();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total_minutes = (seconds / 60.0).round() as u64;

    if total_minutes < 1 {
        return "< 1 min".to_string();
    }
    if total_minutes < 60 {
        return format!("{total_minutes} min");
    }

    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if minutes == 0 {
        format!("{hours} h")
    } else {
        format!("{hours} h {minutes} min")
    }
}

/// Shell-provided endpoints. Defaults point at the public demo services,
/// which are fine for development but rate-limited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_routing_base_url")]
    pub routing_base_url: String,
    #[serde(default = "default_geocoding_base_url")]
    pub geocoding_base_url: String,
}

fn default_routing_base_url() -> String {
    DEFAULT_ROUTING_BASE_URL.to_string()
}

fn default_geocoding_base_url() -> String {
    DEFAULT_GEOCODING_BASE_URL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            routing_base_url: default_routing_base_url(),
            geocoding_base_url: default_geocoding_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToastMessage {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl ToastMessage {
    #[must_use]
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
            duration_ms: kind.default_duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    #[must_use]
    pub const fn default_duration_ms(self) -> u64 {
        match self {
            Self::Info => 3000,
            Self::Success => 2000,
            Self::Warning => 4000,
            Self::Error => 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod distance_tests {
        use super::*;

        #[test]
        fn test_same_point_distance() {
            let p = Coordinate::new(51.5074, -0.1278).unwrap();
            assert_eq!(haversine_distance(p, p), 0.0);
        }

        #[test]
        fn test_london_paris_distance() {
            let london = Coordinate::new(51.5074, -0.1278).unwrap();
            let paris = Coordinate::new(48.8566, 2.3522).unwrap();
            let distance = haversine_distance(london, paris);
            assert!((distance - 343_500.0).abs() < 10_000.0);
        }

        #[test]
        fn test_antipodal_distance() {
            let p1 = Coordinate::new(0.0, 0.0).unwrap();
            let p2 = Coordinate::new(0.0, 180.0).unwrap();
            let distance = haversine_distance(p1, p2);
            let expected = std::f64::consts::PI * EARTH_RADIUS_M;
            assert!((distance - expected).abs() < 1000.0);
        }

        #[test]
        fn test_short_hop_is_metres() {
            let p1 = Coordinate::new(37.8199, -122.4783).unwrap();
            let p2 = Coordinate::new(37.8200, -122.4783).unwrap();
            let distance = haversine_distance(p1, p2);
            assert!(distance > 5.0 && distance < 20.0);
        }
    }

    mod bearing_tests {
        use super::*;

        #[test]
        fn test_due_north() {
            let from = Coordinate::new(0.0, 0.0).unwrap();
            let to = Coordinate::new(1.0, 0.0).unwrap();
            assert!((initial_bearing(from, to) - 0.0).abs() < 0.01);
        }

        #[test]
        fn test_due_east() {
            let from = Coordinate::new(0.0, 0.0).unwrap();
            let to = Coordinate::new(0.0, 1.0).unwrap();
            assert!((initial_bearing(from, to) - 90.0).abs() < 0.01);
        }

        #[test]
        fn test_south_and_west_quadrants() {
            let from = Coordinate::new(1.0, 1.0).unwrap();
            let south = Coordinate::new(0.0, 1.0).unwrap();
            let west = Coordinate::new(1.0, 0.0).unwrap();
            assert!((initial_bearing(from, south) - 180.0).abs() < 0.1);
            assert!((initial_bearing(from, west) - 270.0).abs() < 1.0);
        }

        #[test]
        fn test_normalize_bearing() {
            assert_eq!(normalize_bearing(0.0), 0.0);
            assert_eq!(normalize_bearing(360.0), 0.0);
            assert_eq!(normalize_bearing(-90.0), 270.0);
            assert_eq!(normalize_bearing(725.0), 5.0);
            assert_eq!(normalize_bearing(f64::NAN), 0.0);
        }
    }

    mod format_tests {
        use super::*;

        #[test]
        fn test_format_distance_meters() {
            assert_eq!(format_distance(0.0), "0 m");
            assert_eq!(format_distance(500.0), "500 m");
            assert_eq!(format_distance(999.0), "999 m");
        }

        #[test]
        fn test_format_distance_kilometers() {
            assert_eq!(format_distance(1000.0), "1.0 km");
            assert_eq!(format_distance(1500.0), "1.5 km");
            assert_eq!(format_distance(15000.0), "15 km");
            assert_eq!(format_distance(150_000.0), "150 km");
        }

        #[test]
        fn test_format_distance_invalid() {
            assert_eq!(format_distance(f64::NAN), "Unknown");
            assert_eq!(format_distance(f64::INFINITY), "Unknown");
            assert_eq!(format_distance(-100.0), "Unknown");
        }

        #[test]
        fn test_format_duration() {
            assert_eq!(format_duration(20.0), "< 1 min");
            assert_eq!(format_duration(90.0), "2 min");
            assert_eq!(format_duration(600.0), "10 min");
            assert_eq!(format_duration(3600.0), "1 h");
            assert_eq!(format_duration(5400.0), "1 h 30 min");
        }

        #[test]
        fn test_format_duration_invalid() {
            assert_eq!(format_duration(f64::NAN), "Unknown");
            assert_eq!(format_duration(-5.0), "Unknown");
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_error_codes() {
            assert_eq!(AppError::new(ErrorKind::Network, "x").code(), "NETWORK_ERROR");
            assert_eq!(AppError::new(ErrorKind::NoRoute, "x").code(), "NO_ROUTE");
            assert_eq!(AppError::new(ErrorKind::Storage, "x").code(), "STORAGE_ERROR");
        }

        #[test]
        fn test_validation_message_passes_through() {
            let error = AppError::new(ErrorKind::Validation, "A name is required");
            assert_eq!(error.user_facing_message(), "A name is required");
        }

        #[test]
        fn test_retryable_follows_kind_and_severity() {
            assert!(AppError::new(ErrorKind::Network, "x").is_retryable());
            assert!(!AppError::new(ErrorKind::Validation, "x").is_retryable());
            assert!(!AppError::new(ErrorKind::Network, "x")
                .with_severity(ErrorSeverity::Fatal)
                .is_retryable());
        }

        #[test]
        fn test_from_http_status() {
            let error = AppError::from_http_status(404, None);
            assert_eq!(error.kind, ErrorKind::NotFound);

            let error = AppError::from_http_status(503, None);
            assert_eq!(error.kind, ErrorKind::Internal);

            let body = br#"{"message": "too many coordinates"}"#;
            let error = AppError::from_http_status(400, Some(body));
            assert_eq!(error.kind, ErrorKind::Validation);
            assert_eq!(error.message, "too many coordinates");
        }

        #[test]
        fn test_display_includes_code() {
            let error = AppError::new(ErrorKind::Timeout, "route fetch").with_internal("10s limit");
            let rendered = error.to_string();
            assert!(rendered.contains("TIMEOUT"));
            assert!(rendered.contains("10s limit"));
        }
    }

    mod toast_tests {
        use super::*;

        #[test]
        fn test_toast_message_new() {
            let toast = ToastMessage::new("Saved", ToastKind::Success);
            assert_eq!(toast.message, "Saved");
            assert_eq!(toast.kind, ToastKind::Success);
            assert_eq!(toast.duration_ms, 2000);
        }

        #[test]
        fn test_toast_kind_duration() {
            assert_eq!(ToastKind::Info.default_duration_ms(), 3000);
            assert_eq!(ToastKind::Success.default_duration_ms(), 2000);
            assert_eq!(ToastKind::Warning.default_duration_ms(), 4000);
            assert_eq!(ToastKind::Error.default_duration_ms(), 5000);
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_config_defaults() {
            let config = AppConfig::default();
            assert_eq!(config.routing_base_url, DEFAULT_ROUTING_BASE_URL);
            assert_eq!(config.geocoding_base_url, DEFAULT_GEOCODING_BASE_URL);
        }

        #[test]
        fn test_config_defaults_fill_missing_fields() {
            let config: AppConfig = serde_json::from_str("{}").unwrap();
            assert_eq!(config, AppConfig::default());

            let config: AppConfig =
                serde_json::from_str(r#"{"routing_base_url": "https://osrm.example.com"}"#)
                    .unwrap();
            assert_eq!(config.routing_base_url, "https://osrm.example.com");
            assert_eq!(config.geocoding_base_url, DEFAULT_GEOCODING_BASE_URL);
        }
    }
}
