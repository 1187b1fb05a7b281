use std::sync::Arc;

use tracing::warn;

use caixa_core::{LocalCache, Provenance, Session};

/// Single-slot session snapshot over the process-local cache.
///
/// Used as a fast path at process start: when the snapshot's user matches the
/// freshly authenticated identity it is returned without a resolution round
/// trip. The trade-off is explicit: a snapshot's permissions may be stale
/// relative to the grant store until the next full resolution, which is why
/// reads come back tagged with [`Provenance::Cache`].
pub struct SessionCache {
    cache: Arc<dyn LocalCache>,
    key: String,
}

impl SessionCache {
    pub fn new(cache: Arc<dyn LocalCache>, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
        }
    }

    /// Write-through snapshot of a composed session.
    pub fn write(&self, session: &Session) {
        match serde_json::to_string(session) {
            Ok(json) => self.cache.set(&self.key, &json),
            // snapshot failure degrades to a miss on the next read
            Err(err) => warn!(error = %err, "session snapshot failed"),
        }
    }

    /// The cached snapshot, if any. A corrupt snapshot is a miss (and is
    /// removed), never an error.
    pub fn read(&self) -> Option<Session> {
        let raw = self.cache.get(&self.key)?;
        match serde_json::from_str::<Session>(&raw) {
            Ok(mut session) => {
                session.provenance = Provenance::Cache;
                Some(session)
            }
            Err(err) => {
                warn!(error = %err, "discarding corrupt session snapshot");
                self.cache.remove(&self.key);
                None
            }
        }
    }

    pub fn clear(&self) {
        self.cache.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caixa_core::{NewUserProfile, User, UserId};
    use caixa_memory::MemoryLocalCache;

    fn session() -> Session {
        let user = User::new(
            UserId::from("u1"),
            "a@x.com",
            NewUserProfile::new("Ana"),
        );
        Session::compose(user, None, None, Provenance::Cache)
    }

    fn cache() -> SessionCache {
        SessionCache::new(Arc::new(MemoryLocalCache::new()), "session")
    }

    #[test]
    fn read_returns_what_was_written_until_cleared() {
        let cache = cache();
        let session = session();

        cache.write(&session);
        assert_eq!(cache.read(), Some(session.clone()));
        // stable across repeated reads
        assert_eq!(cache.read(), Some(session));

        cache.clear();
        assert_eq!(cache.read(), None);
    }

    #[test]
    fn corrupt_snapshot_is_a_miss_and_is_removed() {
        let backing = Arc::new(MemoryLocalCache::new());
        let cache = SessionCache::new(backing.clone(), "session");

        backing.set("session", "{not json");
        assert_eq!(cache.read(), None);
        assert_eq!(backing.get("session"), None);
    }

    #[test]
    fn read_tags_provenance_as_cache() {
        let cache = cache();
        let mut session = session();
        session.provenance = Provenance::Resolved;

        cache.write(&session);
        let read = cache.read().unwrap();
        assert_eq!(read.provenance, Provenance::Cache);
    }
}
