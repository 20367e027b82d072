use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::event::Coordinate;
use crate::{AppError, AppResult, ErrorKind, SEARCH_RESULT_LIMIT};

/// Which routing endpoint a search (or a chosen result) feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTarget {
    #[default]
    Start,
    Destination,
}

/// One raw hit from the geocoding service. Nominatim sends coordinates
/// as strings, so the numeric parse happens on conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodingHit {
    pub display_name: String,
    pub lat: String,
    pub lon: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub label: String,
    pub position: Coordinate,
}

impl SearchHit {
    fn from_geocoding(hit: GeocodingHit) -> Option<Self> {
        let lat = hit.lat.trim().parse::<f64>().ok()?;
        let lng = hit.lon.trim().parse::<f64>().ok()?;
        let position = Coordinate::new(lat, lng).ok()?;
        Some(Self {
            label: hit.display_name,
            position,
        })
    }
}

/// Converts raw geocoding hits, dropping anything whose coordinates do
/// not parse or are out of range.
pub fn hits_from_response(raw: Vec<GeocodingHit>) -> Vec<SearchHit> {
    let total = raw.len();
    let hits: Vec<SearchHit> = raw.into_iter().filter_map(SearchHit::from_geocoding).collect();

    if hits.len() < total {
        warn!(
            dropped = total - hits.len(),
            "dropped geocoding hits with unusable coordinates"
        );
    }
    hits
}

pub fn search_request_url(base: &str, query: &str) -> AppResult<Url> {
    let mut url = Url::parse(base).map_err(|e| {
        AppError::new(ErrorKind::Validation, format!("invalid geocoding endpoint: {e}"))
    })?;

    url.path_segments_mut()
        .map_err(|()| {
            AppError::new(ErrorKind::Validation, "geocoding endpoint cannot hold a path")
        })?
        .pop_if_empty()
        .push("search");

    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("format", "json")
        .append_pair("limit", &SEARCH_RESULT_LIMIT.to_string());

    Ok(url)
}

/// Live state of the search box. `generation` increments on every
/// keystroke; debounce timers and in-flight responses carry the
/// generation they were started for and are dropped when it no longer
/// matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub target: SearchTarget,
    pub query: String,
    pub generation: u64,
    pub results: Vec<SearchHit>,
}
