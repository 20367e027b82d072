use crux_kv::error::KeyValueError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capabilities::map::{CameraTarget, MapMarker};
use crate::capabilities::Capabilities;
use crate::event::{Coordinate, Event};
use crate::model::{AppPhase, BootState, Model};
use crate::routing::{self, ManeuverIcon, OsrmResponse};
use crate::search::{self, GeocodingHit, SearchTarget};
use crate::store::{Location, LocationStore};
use crate::{
    format_distance, format_duration, normalize_bearing, AppError, ErrorKind, ToastKind,
    ToastMessage, CAMERA_EASE_MS, DEFAULT_MAP_ZOOM, FOCUS_ZOOM, GROUPS_STORAGE_KEY,
    LOCATIONS_STORAGE_KEY, MPS_TO_KMH, ROUTE_FIT_PADDING_PX, SEARCH_DEBOUNCE_MS,
};

// --- View model ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationView {
    pub id: String,
    pub name: String,
    pub desc: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub hidden: bool,
}

impl From<&Location> for LocationView {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id.to_string(),
            name: location.name.clone(),
            desc: location.desc.clone(),
            lat: location.lat,
            lng: location.lng,
            hidden: location.hidden,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupView {
    pub id: String,
    pub name: String,
    pub collapsed: bool,
    pub locations: Vec<LocationView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultView {
    pub label: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchView {
    pub target: SearchTarget,
    pub query: String,
    pub results: Vec<SearchResultView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidateView {
    pub distance: String,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepView {
    pub instruction: String,
    pub distance: String,
    pub icon: ManeuverIcon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteView {
    pub active_index: usize,
    pub candidates: Vec<RouteCandidateView>,
    pub steps: Vec<StepView>,
}

/// Route planning state: the chosen endpoints and whatever candidates
/// the routing service has produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlanView {
    pub start: Option<Coordinate>,
    pub dest: Option<Coordinate>,
    pub pending: bool,
    pub route: Option<RouteView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationHudView {
    pub speed_kmh: f64,
    pub instruction: Option<String>,
    pub distance_to_next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastView {
    pub message: String,
    pub kind: ToastKind,
    pub duration_ms: u64,
}

impl From<&ToastMessage> for ToastView {
    fn from(toast: &ToastMessage) -> Self {
        Self {
            message: toast.message.clone(),
            kind: toast.kind,
            duration_ms: toast.duration_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFacingError {
    pub code: String,
    pub message: String,
    pub is_retryable: bool,
}

impl From<&AppError> for UserFacingError {
    fn from(error: &AppError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.user_facing_message(),
            is_retryable: error.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub phase: AppPhase,
    pub groups: Vec<GroupView>,
    pub uncategorized: Vec<LocationView>,
    pub selected: Option<LocationView>,
    pub draft_pin: Option<Coordinate>,
    pub search: SearchView,
    pub plan: RoutePlanView,
    pub navigation: Option<NavigationHudView>,
    pub toast: Option<ToastView>,
    pub error: Option<UserFacingError>,
}

// --- App ---

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Self::Event, model: &mut Self::Model, caps: &Self::Capabilities) {
        match event {
            // --- Lifecycle ---
            Event::AppStarted { config } => {
                info!("app started");
                model.config = config;
                model.phase = AppPhase::Loading;
                model.boot = BootState::default();
                caps.kv.get(LOCATIONS_STORAGE_KEY.to_string(), Event::LocationsLoaded);
                caps.kv.get(GROUPS_STORAGE_KEY.to_string(), Event::GroupsLoaded);
                caps.render.render();
            }

            Event::LocationsLoaded(result) => {
                let decoded = Self::decode_loaded(result, LOCATIONS_STORAGE_KEY, model);
                model.boot.locations = Some(decoded);
                if model.boot.is_complete() {
                    Self::finish_boot(model, caps);
                }
                caps.render.render();
            }

            Event::GroupsLoaded(result) => {
                let decoded = Self::decode_loaded(result, GROUPS_STORAGE_KEY, model);
                model.boot.groups = Some(decoded);
                if model.boot.is_complete() {
                    Self::finish_boot(model, caps);
                }
                caps.render.render();
            }

            Event::StorePersisted(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "write to key-value store failed");
                    model.show_toast("Couldn't save your latest change.", ToastKind::Error);
                    caps.render.render();
                }
            }

            // --- Saved locations ---
            Event::SaveLocation { draft } => {
                if draft.name.trim().is_empty() {
                    model.set_error(AppError::new(ErrorKind::Validation, "A name is required"));
                    caps.render.render();
                    return;
                }
                match Coordinate::new(draft.lat, draft.lng) {
                    Ok(_) => {
                        let name = model.store.add(draft).name.clone();
                        model.draft_pin = None;
                        model.show_toast(format!("Saved {name}"), ToastKind::Success);
                        Self::sync_markers(model, caps);
                        Self::persist_store(model, caps);
                    }
                    Err(e) => model.set_error(e.into()),
                }
                caps.render.render();
            }

            Event::UpdateLocation { id, patch } => {
                if model.store.update(&id, &patch) {
                    Self::sync_markers(model, caps);
                    Self::persist_store(model, caps);
                } else {
                    warn!(location = %id, "update for unknown location");
                }
                caps.render.render();
            }

            Event::DeleteLocation { id } => {
                if model.store.delete(&id) {
                    if model.selected_location.as_ref() == Some(&id) {
                        model.selected_location = None;
                    }
                    Self::sync_markers(model, caps);
                    Self::persist_store(model, caps);
                }
                caps.render.render();
            }

            Event::ImportLocations { records, group_id } => {
                if model.store.import(&records, group_id.as_ref()) {
                    model.show_toast("Locations imported", ToastKind::Success);
                    Self::sync_markers(model, caps);
                    Self::persist_store(model, caps);
                } else {
                    model.set_error(AppError::new(
                        ErrorKind::Validation,
                        "No locations could be imported from that data",
                    ));
                }
                caps.render.render();
            }

            // --- Groups ---
            Event::CreateGroup { name } => {
                if name.trim().is_empty() {
                    model.set_error(AppError::new(ErrorKind::Validation, "A group name is required"));
                } else {
                    model.store.add_group(name);
                    Self::persist_store(model, caps);
                }
                caps.render.render();
            }

            Event::RenameGroup { id, name } => {
                if name.trim().is_empty() {
                    model.set_error(AppError::new(ErrorKind::Validation, "A group name is required"));
                } else if model.store.rename_group(&id, &name) {
                    Self::persist_store(model, caps);
                } else {
                    warn!(group = %id, "rename for unknown group");
                }
                caps.render.render();
            }

            Event::ToggleGroupCollapsed { id } => {
                if model.store.toggle_group_collapsed(&id) {
                    Self::persist_store(model, caps);
                }
                caps.render.render();
            }

            Event::DeleteGroup { id } => {
                if model.store.delete_group(&id) {
                    let selection_gone = model
                        .selected_location
                        .as_ref()
                        .is_some_and(|id| model.store.location(id).is_none());
                    if selection_gone {
                        model.selected_location = None;
                    }
                    Self::sync_markers(model, caps);
                    Self::persist_store(model, caps);
                }
                caps.render.render();
            }

            Event::AssignLocationToGroup { id, group_id } => {
                if model.store.assign_to_group(&id, group_id) {
                    Self::persist_store(model, caps);
                } else {
                    model.set_error(AppError::new(
                        ErrorKind::NotFound,
                        "That location or group no longer exists",
                    ));
                }
                caps.render.render();
            }

            // --- Map interaction ---
            Event::MapClicked { lat, lng } => {
                match Coordinate::new(lat, lng) {
                    Ok(position) => {
                        model.draft_pin = Some(position);
                        model.selected_location = None;
                    }
                    Err(e) => warn!(error = %e, "ignoring out-of-range map click"),
                }
                caps.render.render();
            }

            Event::CancelDraftPin => {
                model.draft_pin = None;
                caps.render.render();
            }

            Event::MarkerSelected { id } => {
                if model.store.location(&id).is_some() {
                    model.selected_location = Some(id);
                    model.draft_pin = None;
                } else {
                    warn!(location = %id, "marker selected for unknown location");
                }
                caps.render.render();
            }

            Event::ClearSelection => {
                model.selected_location = None;
                caps.render.render();
            }

            Event::FocusLocation { id } => {
                let Some(location) = model.store.location(&id) else {
                    model.set_error(AppError::new(
                        ErrorKind::NotFound,
                        "That location no longer exists",
                    ));
                    caps.render.render();
                    return;
                };
                let position = Coordinate::new(location.lat, location.lng);
                match position {
                    Ok(center) => {
                        model.selected_location = Some(id);
                        caps.map.fly_to(CameraTarget {
                            center,
                            zoom: FOCUS_ZOOM,
                            pitch: 0.0,
                            bearing: 0.0,
                            duration_ms: CAMERA_EASE_MS,
                        });
                    }
                    Err(e) => warn!(error = %e, "stored location has invalid coordinates"),
                }
                caps.render.render();
            }

            // --- Search ---
            Event::SearchQueryChanged { target, query } => {
                model.search.target = target;
                model.search.query = query;
                model.search.generation += 1;

                if model.search.query.trim().is_empty() {
                    model.search.results.clear();
                } else {
                    let generation = model.search.generation;
                    caps.timer.after(SEARCH_DEBOUNCE_MS, move || Event::SearchDebounceElapsed {
                        generation,
                    });
                }
                caps.render.render();
            }

            Event::SearchDebounceElapsed { generation } => {
                if generation != model.search.generation {
                    debug!(generation, current = model.search.generation, "debounce superseded");
                    return;
                }
                let query = model.search.query.trim().to_string();
                if query.is_empty() {
                    return;
                }
                match search::search_request_url(&model.config.geocoding_base_url, &query) {
                    Ok(url) => {
                        debug!(%url, "fetching geocoding results");
                        caps.http
                            .get(url.as_str())
                            .expect_json::<Vec<GeocodingHit>>()
                            .send(move |response| Event::SearchResponded {
                                generation,
                                response: Box::new(response),
                            });
                    }
                    Err(e) => {
                        model.set_error(e);
                        caps.render.render();
                    }
                }
            }

            Event::SearchResponded { generation, response } => {
                if generation != model.search.generation {
                    debug!(generation, current = model.search.generation, "dropping stale search response");
                    return;
                }
                match *response {
                    Ok(mut http_response) if http_response.status().is_success() => {
                        let hits = http_response
                            .take_body()
                            .map(search::hits_from_response)
                            .unwrap_or_default();
                        debug!(hits = hits.len(), "search results updated");
                        model.search.results = hits;
                    }
                    Ok(http_response) => {
                        let status: u16 = http_response.status().into();
                        warn!(status, "geocoding request failed");
                        model.set_error(AppError::from_http_status(status, None));
                    }
                    Err(e) => {
                        warn!(error = %e, "geocoding request failed");
                        model.set_error(AppError::new(ErrorKind::Network, e.to_string()));
                    }
                }
                caps.render.render();
            }

            Event::SearchHitChosen { index } => {
                let Some(hit) = model.search.results.get(index).cloned() else {
                    warn!(index, "chose a search hit that no longer exists");
                    return;
                };
                let target = model.search.target;
                Self::set_endpoint(model, target, hit.position);
                model.search.query = hit.label;
                model.search.results.clear();
                caps.map.fly_to(CameraTarget {
                    center: hit.position,
                    zoom: FOCUS_ZOOM,
                    pitch: 0.0,
                    bearing: 0.0,
                    duration_ms: CAMERA_EASE_MS,
                });
                caps.render.render();
            }

            Event::UseDeviceLocation { target } => {
                caps.geolocation
                    .current_position(move |result| Event::DevicePositionFetched { target, result });
            }

            Event::DevicePositionFetched { target, result } => {
                match result {
                    Ok(fix) => match Coordinate::new(fix.lat, fix.lng) {
                        Ok(position) => {
                            Self::set_endpoint(model, target, position);
                            caps.map.fly_to(CameraTarget {
                                center: position,
                                zoom: FOCUS_ZOOM,
                                pitch: 0.0,
                                bearing: 0.0,
                                duration_ms: CAMERA_EASE_MS,
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "device reported an invalid position");
                            model.set_error(AppError::new(
                                ErrorKind::Location,
                                "Unable to determine your location",
                            ));
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "device position lookup failed");
                        model.set_error(e.into());
                    }
                }
                caps.render.render();
            }

            // --- Routing ---
            Event::SetRouteEndpoint { target, lat, lng } => {
                match Coordinate::new(lat, lng) {
                    Ok(position) => Self::set_endpoint(model, target, position),
                    Err(e) => model.set_error(e.into()),
                }
                caps.render.render();
            }

            Event::FetchRoute => {
                let (Some(start), Some(dest)) = (model.session.start, model.session.dest) else {
                    model.set_error(AppError::new(
                        ErrorKind::Validation,
                        "Set both a start and a destination first",
                    ));
                    caps.render.render();
                    return;
                };
                match routing::route_request_url(&model.config.routing_base_url, start, dest) {
                    Ok(url) => {
                        model.session.route_pending = true;
                        info!(%url, "fetching route candidates");
                        caps.http
                            .get(url.as_str())
                            .expect_json::<OsrmResponse>()
                            .send(|response| Event::RouteFetched(Box::new(response)));
                    }
                    Err(e) => model.set_error(e),
                }
                caps.render.render();
            }

            Event::RouteFetched(response) => {
                model.session.route_pending = false;
                match *response {
                    // OSRM reports failures in the body with a non-Ok
                    // code, usually alongside HTTP 400, so the body is
                    // decoded regardless of status.
                    Ok(mut http_response) => match http_response.take_body() {
                        Some(body) => match routing::routes_from_response(body) {
                            Ok(routes) => {
                                info!(candidates = routes.len(), "route candidates received");
                                model.session.install_routes(routes);
                                Self::draw_route(model, caps);
                            }
                            Err(e) => {
                                warn!(error = %e, "route request rejected");
                                model.set_error(e.into());
                            }
                        },
                        None => {
                            let status: u16 = http_response.status().into();
                            model.set_error(AppError::from_http_status(status, None));
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "route request failed");
                        model.set_error(AppError::new(ErrorKind::Network, e.to_string()));
                    }
                }
                caps.render.render();
            }

            Event::SelectRoute { index } => {
                if model.session.select_route(index) {
                    Self::draw_route(model, caps);
                    caps.render.render();
                } else {
                    warn!(index, "ignoring selection of unknown route candidate");
                }
            }

            Event::ClearRoute => {
                if model.session.is_navigating {
                    Self::halt_navigation(model, caps);
                }
                model.session.clear_routes();
                caps.map.clear_route();
                caps.render.render();
            }

            // --- Live navigation ---
            Event::StartNavigation => {
                if model.session.active_route().is_none() {
                    model.set_error(AppError::new(
                        ErrorKind::InvalidState,
                        "Fetch a route before starting navigation",
                    ));
                    caps.render.render();
                    return;
                }
                let generation = model.session.begin_navigation();
                info!(generation, "navigation started");
                caps.geolocation
                    .watch_position(move |result| Event::PositionUpdated { generation, result });
                caps.render.render();
            }

            Event::PositionUpdated { generation, result } => {
                if !model.session.is_navigating || generation != model.session.watch_generation {
                    debug!(generation, "dropping fix from a stale watch");
                    return;
                }
                match result {
                    Ok(fix) => {
                        let Some(tick) = model.session.apply_fix(fix) else {
                            warn!("dropping position fix with invalid coordinates");
                            return;
                        };

                        let bearing = tick.bearing.unwrap_or(0.0);
                        caps.map.set_live_marker(tick.position, bearing);
                        caps.map.ease_to(CameraTarget {
                            center: tick.position,
                            zoom: tick.camera.zoom,
                            pitch: tick.camera.pitch,
                            bearing,
                            duration_ms: CAMERA_EASE_MS,
                        });

                        if let Some(step_index) = tick.announce {
                            let instruction = model
                                .session
                                .active_route()
                                .and_then(|route| route.steps.get(step_index))
                                .map(|step| step.instruction.clone());
                            if let Some(instruction) = instruction {
                                info!(step = step_index, "announcing maneuver");
                                caps.announcer.speak(instruction.clone());
                                model.show_toast(instruction, ToastKind::Info);
                            }
                        }
                        caps.render.render();
                    }
                    Err(e) => {
                        // The watch stays alive; GPS errors are routinely
                        // followed by good fixes.
                        warn!(error = %e, "position watch error");
                        model.set_error(e.into());
                        caps.render.render();
                    }
                }
            }

            Event::CompassUpdated { heading_deg } => {
                // No render; the next position tick folds this in.
                if heading_deg.is_finite() {
                    model.session.compass_heading = Some(normalize_bearing(heading_deg));
                }
            }

            Event::StopNavigation => {
                if model.session.is_navigating {
                    Self::halt_navigation(model, caps);
                }
                caps.render.render();
            }

            // --- Transient surfaces ---
            Event::DismissToast => {
                model.clear_toast();
                caps.render.render();
            }

            Event::DismissError => {
                model.clear_error();
                caps.render.render();
            }
        }
    }

    fn view(&self, model: &Self::Model) -> Self::ViewModel {
        ViewModel {
            phase: model.phase,
            groups: Self::build_groups(model),
            uncategorized: model.store.uncategorized().map(LocationView::from).collect(),
            selected: model
                .selected_location
                .as_ref()
                .and_then(|id| model.store.location(id))
                .map(LocationView::from),
            draft_pin: model.draft_pin,
            search: Self::build_search(model),
            plan: Self::build_plan(model),
            navigation: Self::build_hud(model),
            toast: model.active_toast.as_ref().map(ToastView::from),
            error: model.active_error.as_ref().map(UserFacingError::from),
        }
    }
}

impl App {
    fn decode_loaded<T: serde::de::DeserializeOwned>(
        result: Result<Option<Vec<u8>>, KeyValueError>,
        key: &str,
        model: &mut Model,
    ) -> Vec<T> {
        match result {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!(key, error = %e, "persisted data is corrupt, starting fresh");
                    model.show_toast(
                        "Saved places could not be read and were reset.",
                        ToastKind::Warning,
                    );
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key, error = %e, "failed to read persisted data");
                model.show_toast("Saved places could not be loaded.", ToastKind::Warning);
                Vec::new()
            }
        }
    }

    fn finish_boot(model: &mut Model, caps: &Capabilities) {
        let locations = model.boot.locations.take().unwrap_or_default();
        let groups = model.boot.groups.take().unwrap_or_default();

        model.store = LocationStore::from_persisted(locations, groups);
        let seeded = model.store.seed_if_empty();
        model.phase = AppPhase::Ready;

        info!(
            locations = model.store.locations().len(),
            groups = model.store.groups().len(),
            seeded,
            "location store ready"
        );

        if seeded {
            Self::persist_store(model, caps);
        }
        Self::sync_markers(model, caps);
    }

    fn persist_store(model: &mut Model, caps: &Capabilities) {
        match model.store.locations_blob() {
            Ok(bytes) => {
                caps.kv
                    .set(LOCATIONS_STORAGE_KEY.to_string(), bytes, Event::StorePersisted);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize locations");
                model.set_error(AppError::new(
                    ErrorKind::Serialization,
                    "Could not save your places",
                ));
            }
        }
        match model.store.groups_blob() {
            Ok(bytes) => {
                caps.kv
                    .set(GROUPS_STORAGE_KEY.to_string(), bytes, Event::StorePersisted);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize groups");
                model.set_error(AppError::new(
                    ErrorKind::Serialization,
                    "Could not save your groups",
                ));
            }
        }
    }

    /// Replaces the map's marker set with every visible location that
    /// still carries a valid coordinate.
    fn sync_markers(model: &Model, caps: &Capabilities) {
        let markers = model
            .store
            .visible()
            .filter_map(|location| {
                let position = Coordinate::new(location.lat, location.lng).ok()?;
                Some(MapMarker {
                    id: location.id.to_string(),
                    position,
                    label: location.name.clone(),
                })
            })
            .collect();
        caps.map.set_markers(markers);
    }

    fn draw_route(model: &Model, caps: &Capabilities) {
        let Some(active_index) = model.session.active else {
            return;
        };
        let Some(active) = model.session.active_route() else {
            return;
        };

        let alternatives = model
            .session
            .routes
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != active_index)
            .map(|(_, route)| route.geometry.clone())
            .collect();

        caps.map.draw_route(active.geometry.clone(), alternatives);

        if let Some((south_west, north_east)) = routing::bounding_box(&active.geometry) {
            caps.map.fit_bounds(south_west, north_east, ROUTE_FIT_PADDING_PX);
        }
    }

    fn set_endpoint(model: &mut Model, target: SearchTarget, position: Coordinate) {
        match target {
            SearchTarget::Start => model.session.start = Some(position),
            SearchTarget::Destination => model.session.dest = Some(position),
        }
    }

    /// Tears down the live session: stops the GPS watch and speech,
    /// removes the live marker and relaxes the camera back to an
    /// overview of wherever the traveller got to.
    fn halt_navigation(model: &mut Model, caps: &Capabilities) {
        let resume_center = model
            .session
            .last_fix
            .and_then(|fix| Coordinate::new(fix.lat, fix.lng).ok())
            .or(model.session.dest)
            .or(model.session.start);

        model.session.end_navigation();
        info!("navigation stopped");

        caps.geolocation.clear_watch();
        caps.announcer.cancel();
        caps.map.remove_live_marker();

        if let Some(center) = resume_center {
            caps.map.ease_to(CameraTarget {
                center,
                zoom: DEFAULT_MAP_ZOOM,
                pitch: 0.0,
                bearing: 0.0,
                duration_ms: CAMERA_EASE_MS,
            });
        }
    }

    fn build_groups(model: &Model) -> Vec<GroupView> {
        model
            .store
            .groups()
            .iter()
            .map(|group| GroupView {
                id: group.id.to_string(),
                name: group.name.clone(),
                collapsed: group.collapsed,
                locations: model
                    .store
                    .members_of(&group.id)
                    .map(LocationView::from)
                    .collect(),
            })
            .collect()
    }

    fn build_search(model: &Model) -> SearchView {
        SearchView {
            target: model.search.target,
            query: model.search.query.clone(),
            results: model
                .search
                .results
                .iter()
                .map(|hit| SearchResultView {
                    label: hit.label.clone(),
                    lat: hit.position.lat(),
                    lng: hit.position.lng(),
                })
                .collect(),
        }
    }

    fn build_plan(model: &Model) -> RoutePlanView {
        let route = model.session.active.and_then(|active_index| {
            model.session.active_route().map(|active| RouteView {
                active_index,
                candidates: model
                    .session
                    .routes
                    .iter()
                    .map(|route| RouteCandidateView {
                        distance: format_distance(route.distance_m),
                        duration: format_duration(route.duration_s),
                    })
                    .collect(),
                steps: active
                    .steps
                    .iter()
                    .map(|step| StepView {
                        instruction: step.instruction.clone(),
                        distance: format_distance(step.distance_m),
                        icon: step.icon,
                    })
                    .collect(),
            })
        });

        RoutePlanView {
            start: model.session.start,
            dest: model.session.dest,
            pending: model.session.route_pending,
            route,
        }
    }

    fn build_hud(model: &Model) -> Option<NavigationHudView> {
        if !model.session.is_navigating {
            return None;
        }

        let (instruction, distance_to_next) = model
            .session
            .upcoming_step
            .and_then(|upcoming| {
                model
                    .session
                    .active_route()
                    .and_then(|route| route.steps.get(upcoming.index))
                    .map(|step| (step.instruction.clone(), format_distance(upcoming.distance_m)))
            })
            .unzip();

        Some(NavigationHudView {
            speed_kmh: (model.session.live_speed_mps * MPS_TO_KMH).round(),
            instruction,
            distance_to_next,
        })
    }
}
