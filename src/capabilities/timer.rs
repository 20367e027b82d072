use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

/// One-shot delay. The shell resolves the request after `millis` have
/// passed; there is no cancellation, stale firings are filtered by the
/// caller comparing generations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerOperation {
    pub millis: u64,
}

impl Operation for TimerOperation {
    type Output = ();
}

pub struct Timer<E> {
    context: CapabilityContext<TimerOperation, E>,
}

impl<E> Timer<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<TimerOperation, E>) -> Self {
        Self { context }
    }

    pub fn after<F>(&self, millis: u64, make_event: F)
    where
        F: FnOnce() -> E + Send + Sync + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.request_from_shell(TimerOperation { millis }).await;
            context.update_app(make_event());
        });
    }
}

impl<Ev> Capability<Ev> for Timer<Ev> {
    type Operation = TimerOperation;
    type MappedSelf<MappedEv> = Timer<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Timer::new(self.context.map_event(f))
    }
}
