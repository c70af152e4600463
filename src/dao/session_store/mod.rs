mod memory;

pub use self::memory::InMemorySessionStore;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::{dao::storage::StorageResult, state::game::GameSession};

/// Abstraction over the persistence layer for live game sessions.
///
/// The store performs no optimistic concurrency check; callers serialize
/// read-modify-write cycles per session themselves.
pub trait SessionStore: Send + Sync {
    /// Fetch an unexpired session by id.
    fn get(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameSession>>>;
    /// Case-insensitive lookup through the unique join-code index.
    fn find_by_join_code(&self, code: &str)
    -> BoxFuture<'static, StorageResult<Option<GameSession>>>;
    /// Store a brand-new session. Fails with `StorageError::Conflict` when its
    /// join code belongs to another unexpired session.
    fn insert(&self, session: GameSession) -> BoxFuture<'static, StorageResult<()>>;
    /// Overwrite an existing session.
    fn save(&self, session: GameSession) -> BoxFuture<'static, StorageResult<()>>;
    /// Sessions whose current round has a running countdown.
    fn list_active(&self) -> BoxFuture<'static, StorageResult<Vec<GameSession>>>;
}
