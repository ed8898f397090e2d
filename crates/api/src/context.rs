use stockroom_core::ActorId;

/// Actor context for a request: the validated identity delivered by the
/// upstream auth layer.
///
/// This is immutable and must be present for all mutation/query routes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor_id: ActorId,
}

impl ActorContext {
    pub fn new(actor_id: ActorId) -> Self {
        Self { actor_id }
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }
}
