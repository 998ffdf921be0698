use alloc::boxed::Box;

use crate::error::EcsError;
use crate::manager::{EntityListener, EntityManager, ListenerId};
use crate::query::QueryId;

impl EntityManager {
    /// Registers `listener` on the archetypes matched by `query`, now and
    /// in the future.
    pub fn add_listener(
        &mut self,
        query: QueryId,
        listener: Box<dyn EntityListener>,
    ) -> Result<ListenerId, EcsError> {
        let info = self.queries.require(query)?;
        let id = self.listeners.insert(query, listener);
        for matched in info.matches() {
            self.archetypes.expect_mut(matched.archetype()).set_listener(
                id.index(),
                true,
                self.registry.bitfields(),
            );
        }
        Ok(id)
    }

    /// Unregisters a listener and returns it.
    pub fn remove_listener(&mut self, id: ListenerId) -> Option<Box<dyn EntityListener>> {
        let (_, listener) = self.listeners.remove(id)?;
        for arche in self.archetypes.iter_mut() {
            arche.set_listener(id.index(), false, self.registry.bitfields());
        }
        Some(listener)
    }
}
