use serde::{Deserialize, Serialize};

use crate::event::{Coordinate, LocationId};
use crate::navigation::NavigationSession;
use crate::search::SearchState;
use crate::store::{Group, Location, LocationStore};
use crate::{AppConfig, AppError, ToastKind, ToastMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppPhase {
    /// Waiting for both persisted collections to come back from the
    /// key-value store.
    #[default]
    Loading,
    Ready,
}

/// Staging area for the two persistence reads that race at startup.
/// `Some(vec![])` means "loaded, empty", which is why this is not two
/// bare Vecs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootState {
    pub locations: Option<Vec<Location>>,
    pub groups: Option<Vec<Group>>,
}

impl BootState {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.locations.is_some() && self.groups.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    pub phase: AppPhase,
    pub config: AppConfig,
    pub boot: BootState,
    pub store: LocationStore,
    pub session: NavigationSession,
    pub search: SearchState,
    pub selected_location: Option<LocationId>,
    pub draft_pin: Option<Coordinate>,
    pub active_toast: Option<ToastMessage>,
    pub active_error: Option<AppError>,
}

impl Model {
    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.active_toast = Some(ToastMessage::new(message, kind));
    }

    pub fn clear_toast(&mut self) {
        self.active_toast = None;
    }

    pub fn set_error(&mut self, error: AppError) {
        tracing::error!(code = error.code(), %error, "surfacing error");
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }
}
