pub mod announce;
pub mod geolocation;
pub mod map;
pub mod timer;

pub use self::announce::{AnnounceOperation, Announcer};
pub use self::geolocation::{
    Geolocation, GeolocationError, GeolocationOperation, GeolocationResult, PositionFix,
};
pub use self::map::{CameraTarget, MapMarker, MapOperation, MapSurface};
pub use self::timer::{Timer, TimerOperation};

use crux_core::render::Render;
use crux_http::Http;
// The Effect derive names each variant after the capability's type
// identifier, so alias these to get `Effect::Kv` / `Effect::Map`.
use crux_kv::KeyValue as Kv;

use self::map::MapSurface as Map;
use crate::app::App;
use crate::event::Event;

/// Everything the app can ask of the shell. The derive turns each
/// field into an [`Effect`] variant the shell dispatches on.
#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub kv: Kv<Event>,
    pub map: Map<Event>,
    pub geolocation: Geolocation<Event>,
    pub announcer: Announcer<Event>,
    pub timer: Timer<Event>,
}
