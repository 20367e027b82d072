use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::event::Coordinate;
use crate::{AppError, AppResult, ErrorKind};

// --- Wire format (OSRM route service) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsrmResponse {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub routes: Vec<OsrmRoute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsrmRoute {
    pub distance: f64,
    pub duration: f64,
    #[serde(default)]
    pub geometry: Option<geojson::Geometry>,
    #[serde(default)]
    pub legs: Vec<OsrmLeg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsrmLeg {
    #[serde(default)]
    pub steps: Vec<OsrmStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsrmStep {
    pub maneuver: OsrmManeuver,
    #[serde(default)]
    pub name: String,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsrmManeuver {
    #[serde(rename = "type")]
    pub maneuver_type: String,
    #[serde(default)]
    pub modifier: Option<String>,
    /// `[lng, lat]`, the GeoJSON axis order.
    pub location: [f64; 2],
}

// --- Domain model ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub distance_m: f64,
    pub duration_s: f64,
    pub geometry: Vec<Coordinate>,
    pub steps: Vec<RouteStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    pub distance_m: f64,
    pub icon: ManeuverIcon,
    pub anchor: Coordinate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverIcon {
    Pin,
    UTurn,
    Left,
    Right,
    Straight,
}

impl ManeuverIcon {
    /// Arrival wins over any modifier, u-turns win over plain turns.
    /// Expects the lowercase strings OSRM emits.
    #[must_use]
    pub fn classify(maneuver_type: &str, modifier: Option<&str>) -> Self {
        if maneuver_type == "arrive" {
            return Self::Pin;
        }

        let modifier = modifier.unwrap_or_default();
        if modifier.contains("uturn") {
            Self::UTurn
        } else if modifier.contains("left") {
            Self::Left
        } else if modifier.contains("right") {
            Self::Right
        } else {
            Self::Straight
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("no route found between the selected points")]
    NoRoute,
    #[error("routing service rejected the request ({code})")]
    Rejected { code: String, message: Option<String> },
    #[error("malformed routing response: {0}")]
    Malformed(String),
}

impl From<RoutingError> for AppError {
    fn from(e: RoutingError) -> Self {
        match &e {
            RoutingError::NoRoute => Self::new(ErrorKind::NoRoute, e.to_string()),
            RoutingError::Rejected { message, .. } => {
                let error = Self::new(ErrorKind::RoutingService, e.to_string());
                match message {
                    Some(message) => error.with_internal(message.clone()),
                    None => error,
                }
            }
            RoutingError::Malformed(_) => Self::new(ErrorKind::Deserialization, e.to_string()),
        }
    }
}

/// Converts a decoded OSRM payload into route candidates, in service
/// order. The service reports failures in-band through `code`, so this
/// is called whatever the HTTP status was.
pub fn routes_from_response(response: OsrmResponse) -> Result<Vec<Route>, RoutingError> {
    if response.code != "Ok" {
        return Err(match response.code.as_str() {
            "NoRoute" => RoutingError::NoRoute,
            _ => RoutingError::Rejected {
                code: response.code,
                message: response.message,
            },
        });
    }

    if response.routes.is_empty() {
        return Err(RoutingError::NoRoute);
    }

    response.routes.into_iter().map(Route::from_osrm).collect()
}

impl Route {
    fn from_osrm(route: OsrmRoute) -> Result<Self, RoutingError> {
        let geometry = polyline_coords(route.geometry.as_ref())?;
        let steps = route
            .legs
            .into_iter()
            .flat_map(|leg| leg.steps)
            .map(RouteStep::from_osrm)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            distance_m: route.distance,
            duration_s: route.duration,
            geometry,
            steps,
        })
    }
}

impl RouteStep {
    fn from_osrm(step: OsrmStep) -> Result<Self, RoutingError> {
        let [lng, lat] = step.maneuver.location;
        let anchor = Coordinate::new(lat, lng)
            .map_err(|e| RoutingError::Malformed(format!("step anchor: {e}")))?;

        let modifier = step.maneuver.modifier.as_deref();
        let icon = ManeuverIcon::classify(&step.maneuver.maneuver_type, modifier);
        let instruction = instruction_text(&step.maneuver.maneuver_type, modifier, &step.name);

        Ok(Self {
            instruction,
            distance_m: step.distance,
            icon,
            anchor,
        })
    }
}

fn polyline_coords(geometry: Option<&geojson::Geometry>) -> Result<Vec<Coordinate>, RoutingError> {
    let Some(geometry) = geometry else {
        return Err(RoutingError::Malformed("route has no geometry".to_string()));
    };

    let geojson::Value::LineString(points) = &geometry.value else {
        return Err(RoutingError::Malformed(
            "route geometry is not a LineString".to_string(),
        ));
    };

    points
        .iter()
        .map(|point| {
            let (Some(lng), Some(lat)) = (point.first(), point.get(1)) else {
                return Err(RoutingError::Malformed(
                    "geometry position is not a pair".to_string(),
                ));
            };
            Coordinate::new(*lat, *lng)
                .map_err(|e| RoutingError::Malformed(format!("geometry position: {e}")))
        })
        .collect()
}

fn instruction_text(maneuver_type: &str, modifier: Option<&str>, road: &str) -> String {
    if maneuver_type == "arrive" {
        return "Arrive at your destination".to_string();
    }

    let modifier = modifier.unwrap_or_default();

    let phrase = if maneuver_type == "depart" {
        "Head out".to_string()
    } else if modifier.contains("uturn") {
        "Make a U-turn".to_string()
    } else {
        let verb = match maneuver_type {
            "merge" => "Merge",
            "on ramp" => "Take the ramp",
            "off ramp" => "Take the exit",
            "fork" => "Keep",
            "roundabout" | "rotary" => "At the roundabout, go",
            "continue" | "new name" => "Continue",
            _ => "Turn",
        };
        if modifier.is_empty() {
            verb.to_string()
        } else {
            format!("{verb} {modifier}")
        }
    };

    let road = road.trim();
    if road.is_empty() {
        phrase
    } else {
        format!("{phrase} onto {road}")
    }
}

/// South-west and north-east corners of a polyline, for fitting the
/// camera. Returns None for an empty polyline.
#[must_use]
pub fn bounding_box(polyline: &[Coordinate]) -> Option<(Coordinate, Coordinate)> {
    let first = polyline.first()?;
    let mut min_lat = first.lat();
    let mut max_lat = first.lat();
    let mut min_lng = first.lng();
    let mut max_lng = first.lng();

    for point in &polyline[1..] {
        min_lat = min_lat.min(point.lat());
        max_lat = max_lat.max(point.lat());
        min_lng = min_lng.min(point.lng());
        max_lng = max_lng.max(point.lng());
    }

    Coordinate::new(min_lat, min_lng)
        .ok()
        .zip(Coordinate::new(max_lat, max_lng).ok())
}

/// Builds the OSRM route request for a start/destination pair. The
/// coordinate pairs ride in the path, `lng,lat` order, pairs separated
/// by a semicolon.
pub fn route_request_url(base: &str, start: Coordinate, dest: Coordinate) -> AppResult<Url> {
    let mut url = Url::parse(base).map_err(|e| {
        AppError::new(ErrorKind::Validation, format!("invalid routing endpoint: {e}"))
    })?;

    let coords = format!(
        "{},{};{},{}",
        start.lng(),
        start.lat(),
        dest.lng(),
        dest.lat()
    );

    url.path_segments_mut()
        .map_err(|()| AppError::new(ErrorKind::Validation, "routing endpoint cannot hold a path"))?
        .pop_if_empty()
        .extend(["route", "v1", "driving", coords.as_str()]);

    url.query_pairs_mut()
        .append_pair("alternatives", "true")
        .append_pair("steps", "true")
        .append_pair("geometries", "geojson")
        .append_pair("overview", "full");

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> OsrmResponse {
        serde_json::from_value(value).unwrap()
    }

    fn sample_ok_response() -> serde_json::Value {
        json!({
            "code": "Ok",
            "routes": [
                {
                    "distance": 1234.5,
                    "duration": 300.0,
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[-122.47, 37.80], [-122.46, 37.81], [-122.45, 37.82]]
                    },
                    "legs": [
                        {
                            "steps": [
                                {
                                    "distance": 500.0,
                                    "name": "Lincoln Blvd",
                                    "maneuver": {
                                        "type": "depart",
                                        "location": [-122.47, 37.80]
                                    }
                                },
                                {
                                    "distance": 600.0,
                                    "name": "Marina Blvd",
                                    "maneuver": {
                                        "type": "turn",
                                        "modifier": "slight left",
                                        "location": [-122.46, 37.81]
                                    }
                                },
                                {
                                    "distance": 0.0,
                                    "name": "",
                                    "maneuver": {
                                        "type": "arrive",
                                        "location": [-122.45, 37.82]
                                    }
                                }
                            ]
                        }
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_parses_routes_with_flattened_steps() {
        let routes = routes_from_response(decode(sample_ok_response())).unwrap();
        assert_eq!(routes.len(), 1);

        let route = &routes[0];
        assert_eq!(route.distance_m, 1234.5);
        assert_eq!(route.geometry.len(), 3);
        assert_eq!(route.geometry[0].lng(), -122.47);
        assert_eq!(route.geometry[0].lat(), 37.80);

        assert_eq!(route.steps.len(), 3);
        assert_eq!(route.steps[0].instruction, "Head out onto Lincoln Blvd");
        assert_eq!(route.steps[1].instruction, "Turn slight left onto Marina Blvd");
        assert_eq!(route.steps[1].icon, ManeuverIcon::Left);
        assert_eq!(route.steps[2].instruction, "Arrive at your destination");
        assert_eq!(route.steps[2].icon, ManeuverIcon::Pin);
    }

    #[test]
    fn test_no_route_code_maps_to_no_route() {
        let response = decode(json!({ "code": "NoRoute", "routes": [] }));
        assert_eq!(routes_from_response(response), Err(RoutingError::NoRoute));
    }

    #[test]
    fn test_ok_with_empty_routes_is_no_route() {
        let response = decode(json!({ "code": "Ok", "routes": [] }));
        assert_eq!(routes_from_response(response), Err(RoutingError::NoRoute));
    }

    #[test]
    fn test_other_codes_are_rejections() {
        let response = decode(json!({
            "code": "InvalidQuery",
            "message": "Query string malformed"
        }));
        let error = routes_from_response(response).unwrap_err();
        assert_eq!(
            error,
            RoutingError::Rejected {
                code: "InvalidQuery".to_string(),
                message: Some("Query string malformed".to_string()),
            }
        );

        let app_error = crate::AppError::from(error);
        assert_eq!(app_error.kind, crate::ErrorKind::RoutingService);
    }

    #[test]
    fn test_missing_geometry_is_malformed() {
        let response = decode(json!({
            "code": "Ok",
            "routes": [{ "distance": 1.0, "duration": 1.0 }]
        }));
        assert!(matches!(
            routes_from_response(response),
            Err(RoutingError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_linestring_geometry_is_malformed() {
        let response = decode(json!({
            "code": "Ok",
            "routes": [{
                "distance": 1.0,
                "duration": 1.0,
                "geometry": { "type": "Point", "coordinates": [1.0, 2.0] }
            }]
        }));
        assert!(matches!(
            routes_from_response(response),
            Err(RoutingError::Malformed(_))
        ));
    }

    mod icon_tests {
        use super::*;

        #[test]
        fn test_arrive_wins_over_modifier() {
            assert_eq!(ManeuverIcon::classify("arrive", Some("left")), ManeuverIcon::Pin);
        }

        #[test]
        fn test_uturn_wins_over_turn_direction() {
            assert_eq!(ManeuverIcon::classify("turn", Some("uturn")), ManeuverIcon::UTurn);
        }

        #[test]
        fn test_turn_directions() {
            assert_eq!(ManeuverIcon::classify("turn", Some("sharp left")), ManeuverIcon::Left);
            assert_eq!(ManeuverIcon::classify("turn", Some("slight right")), ManeuverIcon::Right);
            assert_eq!(ManeuverIcon::classify("fork", Some("right")), ManeuverIcon::Right);
        }

        #[test]
        fn test_everything_else_is_straight() {
            assert_eq!(ManeuverIcon::classify("continue", Some("straight")), ManeuverIcon::Straight);
            assert_eq!(ManeuverIcon::classify("merge", None), ManeuverIcon::Straight);
            assert_eq!(ManeuverIcon::classify("depart", None), ManeuverIcon::Straight);
        }
    }

    mod instruction_tests {
        use super::*;

        #[test]
        fn test_ramp_and_roundabout_phrasing() {
            assert_eq!(
                instruction_text("on ramp", Some("right"), "US 101"),
                "Take the ramp right onto US 101"
            );
            assert_eq!(
                instruction_text("roundabout", Some("straight"), "Main St"),
                "At the roundabout, go straight onto Main St"
            );
        }

        #[test]
        fn test_road_omitted_when_blank() {
            assert_eq!(instruction_text("turn", Some("left"), "  "), "Turn left");
            assert_eq!(instruction_text("continue", None, ""), "Continue");
        }

        #[test]
        fn test_uturn_phrasing() {
            assert_eq!(
                instruction_text("turn", Some("uturn"), "Mission St"),
                "Make a U-turn onto Mission St"
            );
        }
    }

    mod url_tests {
        use super::*;

        fn endpoints() -> (Coordinate, Coordinate) {
            (
                Coordinate::new(37.80, -122.47).unwrap(),
                Coordinate::new(37.82, -122.45).unwrap(),
            )
        }

        #[test]
        fn test_route_url_shape() {
            let (start, dest) = endpoints();
            let url = route_request_url("https://router.example.com", start, dest).unwrap();

            assert_eq!(url.host_str(), Some("router.example.com"));
            assert_eq!(url.path(), "/route/v1/driving/-122.47,37.8;-122.45,37.82");

            let query = url.query().unwrap();
            assert!(query.contains("alternatives=true"));
            assert!(query.contains("steps=true"));
            assert!(query.contains("geometries=geojson"));
            assert!(query.contains("overview=full"));
        }

        #[test]
        fn test_route_url_tolerates_trailing_slash() {
            let (start, dest) = endpoints();
            let url = route_request_url("https://router.example.com/", start, dest).unwrap();
            assert!(url.path().starts_with("/route/v1/driving/"));
        }

        #[test]
        fn test_route_url_rejects_garbage_base() {
            let (start, dest) = endpoints();
            assert!(route_request_url("not a url", start, dest).is_err());
        }
    }

    #[test]
    fn test_bounding_box() {
        let polyline = vec![
            Coordinate::new(37.80, -122.47).unwrap(),
            Coordinate::new(37.82, -122.45).unwrap(),
            Coordinate::new(37.81, -122.48).unwrap(),
        ];
        let (south_west, north_east) = bounding_box(&polyline).unwrap();
        assert_eq!(south_west.lat(), 37.80);
        assert_eq!(south_west.lng(), -122.48);
        assert_eq!(north_east.lat(), 37.82);
        assert_eq!(north_east.lng(), -122.45);

        assert!(bounding_box(&[]).is_none());
    }
}
