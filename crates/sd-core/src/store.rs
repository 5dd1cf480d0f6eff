use crate::error::CandidateError;
use crate::types::candidate::CandidateEvent;
use crate::types::ids::CandidateId;

/// Storage for candidate events.
///
/// The contract that makes decisions exactly-once lives here: `update`
/// runs its closure while holding that candidate's entry lock, so the
/// read-check-write inside the closure is atomic per id. Implementations
/// must not serialize updates of unrelated ids behind one global lock.
pub trait Store: Send + Sync + 'static {
    /// Inserts a new candidate. Fails if the id is already present.
    fn insert(&self, event: CandidateEvent) -> Result<(), CandidateError>;

    /// Snapshot of one candidate, if present.
    fn get(&self, id: &CandidateId) -> Option<CandidateEvent>;

    /// Runs `f` on the stored candidate under its entry lock and
    /// returns whatever `f` returns. `Err(NotFound)` if the id is
    /// absent.
    fn update<T>(
        &self,
        id: &CandidateId,
        f: impl FnOnce(&mut CandidateEvent) -> Result<T, CandidateError>,
    ) -> Result<T, CandidateError>;

    /// All candidates still awaiting a decision (`Pending` or
    /// `Notified`), oldest first.
    fn active(&self) -> Vec<CandidateEvent>;

    /// Snapshot of everything in the store, oldest first.
    fn all(&self) -> Vec<CandidateEvent>;

    /// Removes a candidate, returning it if it was present.
    fn remove(&self, id: &CandidateId) -> Option<CandidateEvent>;
}
