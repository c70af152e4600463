use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::{self, BoxFuture};
use tracing::debug;
use uuid::Uuid;

use crate::{
    dao::{
        session_store::SessionStore,
        storage::{StorageError, StorageResult},
    },
    state::game::GameSession,
};

struct StoredSession {
    session: GameSession,
    expires_at: Instant,
}

struct Inner {
    sessions: DashMap<Uuid, StoredSession>,
    join_codes: DashMap<String, Uuid>,
    retention: Duration,
}

/// Process-local session store. Sessions expire `retention` after insertion.
#[derive(Clone)]
pub struct InMemorySessionStore {
    inner: Arc<Inner>,
}

impl InMemorySessionStore {
    /// Empty store keeping sessions for `retention`.
    pub fn new(retention: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: DashMap::new(),
                join_codes: DashMap::new(),
                retention,
            }),
        }
    }

    /// Remove every expired session and its join code, returning how many went away.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<Uuid> = self
            .inner
            .sessions
            .iter()
            .filter(|entry| entry.expires_at <= now)
            .map(|entry| *entry.key())
            .collect();
        for id in &expired {
            self.remove(*id);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "purged expired sessions");
        }
        expired.len()
    }

    fn live(&self, id: Uuid) -> Option<GameSession> {
        let now = Instant::now();
        let (session, expired) = {
            let entry = self.inner.sessions.get(&id)?;
            (entry.session.clone(), entry.expires_at <= now)
        };
        if expired {
            self.remove(id);
            return None;
        }
        Some(session)
    }

    fn remove(&self, id: Uuid) {
        if let Some((_, stored)) = self.inner.sessions.remove(&id) {
            self.inner
                .join_codes
                .remove_if(&stored.session.join_code, |_, owner| *owner == id);
        }
    }

    fn claim_join_code(&self, code: &str, id: Uuid) -> StorageResult<()> {
        match self.inner.join_codes.entry(code.to_string()) {
            Entry::Occupied(mut occupied) => {
                let owner = *occupied.get();
                let owner_alive = owner != id
                    && self
                        .inner
                        .sessions
                        .get(&owner)
                        .is_some_and(|stored| stored.expires_at > Instant::now());
                if owner_alive {
                    return Err(StorageError::Conflict(format!(
                        "join code `{code}` already in use"
                    )));
                }
                occupied.insert(id);
                Ok(())
            }
            Entry::Vacant(vacant) => {
                vacant.insert(id);
                Ok(())
            }
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameSession>>> {
        Box::pin(future::ready(Ok(self.live(id))))
    }

    fn find_by_join_code(
        &self,
        code: &str,
    ) -> BoxFuture<'static, StorageResult<Option<GameSession>>> {
        let code = code.trim().to_ascii_uppercase();
        let id = self.inner.join_codes.get(&code).map(|entry| *entry.value());
        let session = id.and_then(|id| self.live(id));
        Box::pin(future::ready(Ok(session)))
    }

    fn insert(&self, session: GameSession) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.claim_join_code(&session.join_code, session.id).map(|()| {
            let expires_at = Instant::now() + self.inner.retention;
            self.inner
                .sessions
                .insert(session.id, StoredSession { session, expires_at });
        });
        Box::pin(future::ready(result))
    }

    fn save(&self, session: GameSession) -> BoxFuture<'static, StorageResult<()>> {
        let id = session.id;
        match self.inner.sessions.get_mut(&id) {
            Some(mut stored) => stored.session = session,
            None => {
                let result = self.claim_join_code(&session.join_code, id).map(|()| {
                    let expires_at = Instant::now() + self.inner.retention;
                    self.inner
                        .sessions
                        .insert(id, StoredSession { session, expires_at });
                });
                return Box::pin(future::ready(result));
            }
        }
        Box::pin(future::ready(Ok(())))
    }

    fn list_active(&self) -> BoxFuture<'static, StorageResult<Vec<GameSession>>> {
        let now = Instant::now();
        let active = self
            .inner
            .sessions
            .iter()
            .filter(|entry| entry.expires_at > now && entry.session.has_running_timer())
            .map(|entry| entry.session.clone())
            .collect();
        Box::pin(future::ready(Ok(active)))
    }
}
