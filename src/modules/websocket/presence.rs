/// Presence
///
/// Live user → connection mapping, owned by the WebSocket server actor, plus the
/// Redis-backed `last_seen` timestamps recorded when a user's final session closes.
///
/// Redis key schema:
/// - `last_seen:{user_id}` → RFC 3339 timestamp of the last disconnect
use std::collections::HashMap;

use actix::Recipient;
use deadpool_redis::redis::{self, AsyncCommands};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error;

use super::message::ServerMessage;

const LAST_SEEN_PREFIX: &str = "last_seen:";

/// One live socket of a user.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub session_id: Uuid,
    pub recipient: Recipient<ServerMessage>,
}

/// Outcome of removing a session from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub user_id: Uuid,
    /// The user has no live session left.
    pub went_offline: bool,
}

/// Registry of live connections. Only the server actor touches it, so
/// implementations need no interior locking.
pub trait PresenceRegistry {
    /// Returns `true` when this is the user's first live session.
    fn register(&mut self, user_id: Uuid, handle: ConnectionHandle) -> bool;

    /// `None` for a session that was never registered.
    fn unregister(&mut self, session_id: &Uuid) -> Option<Departure>;

    fn resolve(&self, user_id: &Uuid) -> Vec<ConnectionHandle>;

    fn online_users(&self) -> Vec<Uuid>;

    fn is_online(&self, user_id: &Uuid) -> bool {
        !self.resolve(user_id).is_empty()
    }
}

/// In-process registry supporting several sessions per user (phone, desktop, ...).
#[derive(Default)]
pub struct LocalPresenceRegistry {
    users: HashMap<Uuid, Vec<ConnectionHandle>>,
    sessions: HashMap<Uuid, Uuid>,
}

impl LocalPresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresenceRegistry for LocalPresenceRegistry {
    fn register(&mut self, user_id: Uuid, handle: ConnectionHandle) -> bool {
        if let Some(previous) = self.sessions.insert(handle.session_id, user_id) {
            // Re-registration of a session under a new user.
            if previous != user_id {
                self.remove_handle(&previous, &handle.session_id);
            }
        }

        let handles = self.users.entry(user_id).or_default();
        let first = handles.is_empty();
        handles.retain(|h| h.session_id != handle.session_id);
        handles.push(handle);
        first
    }

    fn unregister(&mut self, session_id: &Uuid) -> Option<Departure> {
        let user_id = self.sessions.remove(session_id)?;
        let went_offline = self.remove_handle(&user_id, session_id);
        Some(Departure { user_id, went_offline })
    }

    fn resolve(&self, user_id: &Uuid) -> Vec<ConnectionHandle> {
        self.users.get(user_id).cloned().unwrap_or_default()
    }

    fn online_users(&self) -> Vec<Uuid> {
        self.users.keys().copied().collect()
    }
}

impl LocalPresenceRegistry {
    /// Returns `true` if the user has no handles left.
    fn remove_handle(&mut self, user_id: &Uuid, session_id: &Uuid) -> bool {
        let Some(handles) = self.users.get_mut(user_id) else {
            return true;
        };
        handles.retain(|h| h.session_id != *session_id);
        if handles.is_empty() {
            self.users.remove(user_id);
            return true;
        }
        false
    }
}

/// Last-seen timestamps survive restarts, unlike the live registry.
#[async_trait::async_trait]
pub trait LastSeenStore: Send + Sync {
    async fn record(
        &self,
        user_id: Uuid,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), error::SystemError>;

    /// One entry per id, in the same order.
    async fn get_many(&self, user_ids: &[Uuid]) -> Result<Vec<Option<String>>, error::SystemError>;
}

#[derive(Clone)]
pub struct RedisLastSeenStore {
    pool: deadpool_redis::Pool,
}

impl RedisLastSeenStore {
    pub fn new(pool: deadpool_redis::Pool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LastSeenStore for RedisLastSeenStore {
    async fn record(
        &self,
        user_id: Uuid,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), error::SystemError> {
        let mut conn = self.pool.get().await?;
        let key = format!("{LAST_SEEN_PREFIX}{user_id}");
        conn.set::<_, _, ()>(&key, at.to_rfc3339()).await?;
        Ok(())
    }

    async fn get_many(&self, user_ids: &[Uuid]) -> Result<Vec<Option<String>>, error::SystemError> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = self.pool.get().await?;

        // Single round-trip for the whole batch
        let mut pipe = redis::pipe();
        for user_id in user_ids {
            pipe.get(format!("{LAST_SEEN_PREFIX}{user_id}"));
        }
        let values: Vec<Option<String>> = pipe.query_async(&mut *conn).await?;

        Ok(values)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceInfo {
    pub user_id: Uuid,
    pub is_online: bool,
    pub last_seen: Option<String>,
}

/// Merges the live online set with stored last-seen values. Online users report no
/// `last_seen`.
pub fn merge_presence(
    user_ids: &[Uuid],
    online: &[Uuid],
    last_seen: Vec<Option<String>>,
) -> Vec<PresenceInfo> {
    user_ids
        .iter()
        .zip(last_seen.into_iter().chain(std::iter::repeat(None)))
        .map(|(user_id, last_seen)| {
            let is_online = online.contains(user_id);
            PresenceInfo {
                user_id: *user_id,
                is_online,
                last_seen: if is_online { None } else { last_seen },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::support::FakeClient;
    use actix::Actor;

    fn handle() -> ConnectionHandle {
        let client = FakeClient::default().start();
        ConnectionHandle { session_id: Uuid::now_v7(), recipient: client.recipient() }
    }

    #[actix_web::test]
    async fn test_first_and_last_session_transitions() {
        let mut registry = LocalPresenceRegistry::new();
        let user = Uuid::now_v7();
        let phone = handle();
        let desktop = handle();
        let (phone_id, desktop_id) = (phone.session_id, desktop.session_id);

        assert!(registry.register(user, phone));
        assert!(!registry.register(user, desktop));
        assert_eq!(registry.resolve(&user).len(), 2);

        assert_eq!(
            registry.unregister(&phone_id),
            Some(Departure { user_id: user, went_offline: false })
        );
        assert!(registry.is_online(&user));

        assert_eq!(
            registry.unregister(&desktop_id),
            Some(Departure { user_id: user, went_offline: true })
        );
        assert!(!registry.is_online(&user));
        assert!(registry.online_users().is_empty());
    }

    #[actix_web::test]
    async fn test_unknown_session_is_noop() {
        let mut registry = LocalPresenceRegistry::new();
        let user = Uuid::now_v7();
        registry.register(user, handle());

        assert_eq!(registry.unregister(&Uuid::now_v7()), None);
        assert_eq!(registry.online_users(), vec![user]);
    }

    #[actix_web::test]
    async fn test_resolve_offline_user_is_empty() {
        let registry = LocalPresenceRegistry::new();
        assert!(registry.resolve(&Uuid::now_v7()).is_empty());
    }

    #[test]
    fn test_merge_presence_hides_last_seen_for_online_users() {
        let online_user = Uuid::now_v7();
        let offline_user = Uuid::now_v7();
        let never_seen = Uuid::now_v7();

        let merged = merge_presence(
            &[online_user, offline_user, never_seen],
            &[online_user],
            vec![Some("stale".into()), Some("2026-01-01T00:00:00+00:00".into()), None],
        );

        assert_eq!(merged[0], PresenceInfo { user_id: online_user, is_online: true, last_seen: None });
        assert_eq!(merged[1].last_seen.as_deref(), Some("2026-01-01T00:00:00+00:00"));
        assert!(!merged[2].is_online);
        assert_eq!(merged[2].last_seen, None);
    }
}
