use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::CandidateError;
use crate::store::Store;
use crate::types::candidate::CandidateEvent;
use crate::types::ids::CandidateId;

/// In-memory candidate store backed by a sharded concurrent map.
///
/// `DashMap::get_mut` holds the entry's shard write lock for the life
/// of the guard, which is exactly the per-id atomicity `Store::update`
/// requires; entries on other shards stay untouched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<CandidateId, CandidateEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Store for MemoryStore {
    fn insert(&self, event: CandidateEvent) -> Result<(), CandidateError> {
        match self.entries.entry(event.id.clone()) {
            Entry::Occupied(_) => Err(CandidateError::InvalidInput {
                message: format!("candidate {} already exists", event.id),
            }),
            Entry::Vacant(slot) => {
                slot.insert(event);
                Ok(())
            }
        }
    }

    fn get(&self, id: &CandidateId) -> Option<CandidateEvent> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    fn update<T>(
        &self,
        id: &CandidateId,
        f: impl FnOnce(&mut CandidateEvent) -> Result<T, CandidateError>,
    ) -> Result<T, CandidateError> {
        let Some(mut entry) = self.entries.get_mut(id) else {
            return Err(CandidateError::NotFound);
        };
        f(entry.value_mut())
    }

    fn active(&self) -> Vec<CandidateEvent> {
        let mut events: Vec<CandidateEvent> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().state.is_terminal())
            .map(|entry| entry.value().clone())
            .collect();
        events.sort_by_key(|event| event.created_at);
        events
    }

    fn all(&self) -> Vec<CandidateEvent> {
        let mut events: Vec<CandidateEvent> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        events.sort_by_key(|event| event.created_at);
        events
    }

    fn remove(&self, id: &CandidateId) -> Option<CandidateEvent> {
        self.entries.remove(id).map(|(_, event)| event)
    }
}
