use crux_core::capability::{Capability, CapabilityContext, Operation};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AppError, ErrorKind};

/// One position report from the shell's location service. `lat`/`lng`
/// are unvalidated here; the core validates when it consumes the fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    #[serde(default)]
    pub speed_mps: Option<f64>,
    #[serde(default)]
    pub heading_deg: Option<f64>,
    pub timestamp_ms: u64,
}

/// Mirrors the W3C Geolocation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum GeolocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out waiting for a position")]
    Timeout,
}

impl From<GeolocationError> for AppError {
    fn from(e: GeolocationError) -> Self {
        let kind = match e {
            GeolocationError::PermissionDenied => ErrorKind::LocationPermissionDenied,
            GeolocationError::PositionUnavailable => ErrorKind::Location,
            GeolocationError::Timeout => ErrorKind::Timeout,
        };
        Self::new(kind, e.to_string())
    }
}

pub type GeolocationResult = Result<PositionFix, GeolocationError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeolocationOperation {
    GetPosition,
    WatchPosition,
    ClearWatch,
}

impl Operation for GeolocationOperation {
    type Output = GeolocationResult;
}

pub struct Geolocation<E> {
    context: CapabilityContext<GeolocationOperation, E>,
}

impl<E> Geolocation<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<GeolocationOperation, E>) -> Self {
        Self { context }
    }

    /// One-shot position request.
    pub fn current_position<F>(&self, make_event: F)
    where
        F: FnOnce(GeolocationResult) -> E + Send + Sync + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context
                .request_from_shell(GeolocationOperation::GetPosition)
                .await;
            context.update_app(make_event(result));
        });
    }

    /// Continuous position stream. The shell resolves the request once
    /// per fix until the watch is cleared, so `make_event` runs many
    /// times.
    pub fn watch_position<F>(&self, make_event: F)
    where
        F: Fn(GeolocationResult) -> E + Send + Sync + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let mut fixes = context.stream_from_shell(GeolocationOperation::WatchPosition);
            while let Some(result) = fixes.next().await {
                context.update_app(make_event(result));
            }
        });
    }

    pub fn clear_watch(&self) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(GeolocationOperation::ClearWatch).await;
        });
    }
}

impl<Ev> Capability<Ev> for Geolocation<Ev> {
    type Operation = GeolocationOperation;
    type MappedSelf<MappedEv> = Geolocation<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Geolocation::new(self.context.map_event(f))
    }
}
