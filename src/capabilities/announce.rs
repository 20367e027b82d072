use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

/// Spoken maneuver announcements, fulfilled by the platform's
/// text-to-speech service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnounceOperation {
    Speak { text: String },
    CancelSpeech,
}

impl Operation for AnnounceOperation {
    type Output = ();
}

pub struct Announcer<E> {
    context: CapabilityContext<AnnounceOperation, E>,
}

impl<E> Announcer<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<AnnounceOperation, E>) -> Self {
        Self { context }
    }

    pub fn speak(&self, text: impl Into<String>) {
        self.notify(AnnounceOperation::Speak { text: text.into() });
    }

    /// Stops any in-flight speech, for when navigation ends mid-sentence.
    pub fn cancel(&self) {
        self.notify(AnnounceOperation::CancelSpeech);
    }

    fn notify(&self, operation: AnnounceOperation) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(operation).await;
        });
    }
}

impl<Ev> Capability<Ev> for Announcer<Ev> {
    type Operation = AnnounceOperation;
    type MappedSelf<MappedEv> = Announcer<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Announcer::new(self.context.map_event(f))
    }
}
