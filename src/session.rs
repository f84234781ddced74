use anyhow::{Context, Result};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::models::User;
use crate::store::{LocalStore, AUTH_TOKEN_KEY, USER_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    LoggedOut,
    /// The API answered 401 and the stored credentials were dropped.
    Expired,
}

struct Inner {
    store: LocalStore,
    token: Option<String>,
    user: Option<User>,
    subscribers: Vec<Sender<SessionEvent>>,
}

/// Auth state shared by the HTTP client and the UI layer.
///
/// Hydrated once from the local store; every mutation writes through to the
/// store and notifies subscribers, so nothing else touches the auth keys.
pub struct Session {
    inner: Mutex<Inner>,
}

impl Session {
    pub fn hydrate(store: LocalStore) -> Result<Self> {
        let token = store.get(AUTH_TOKEN_KEY)?;
        let raw_user = store.get(USER_KEY)?;

        let user = match raw_user {
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Cached user is unreadable, clearing session: {}", e);
                    store.remove(USER_KEY)?;
                    store.remove(AUTH_TOKEN_KEY)?;
                    return Ok(Self::from_parts(store, None, None));
                }
            },
            None => None,
        };

        debug!(authenticated = token.is_some(), "Session hydrated");
        Ok(Self::from_parts(store, token, user))
    }

    fn from_parts(store: LocalStore, token: Option<String>, user: Option<User>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                store,
                token,
                user,
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().token.is_some()
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = channel();
        self.lock().subscribers.push(tx);
        rx
    }

    pub fn sign_in(&self, access: &str, user: Option<User>) -> Result<()> {
        let mut inner = self.lock();
        inner.store.set(AUTH_TOKEN_KEY, access)?;
        match &user {
            Some(u) => {
                let raw = serde_json::to_string(u).context("Failed to serialize user")?;
                inner.store.set(USER_KEY, &raw)?;
            }
            None => inner.store.remove(USER_KEY)?,
        }
        inner.token = Some(access.to_string());
        inner.user = user;
        Self::emit(&mut inner, SessionEvent::SignedIn);
        Ok(())
    }

    pub fn update_user(&self, user: User) -> Result<()> {
        let mut inner = self.lock();
        let raw = serde_json::to_string(&user).context("Failed to serialize user")?;
        inner.store.set(USER_KEY, &raw)?;
        inner.user = Some(user);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.clear(SessionEvent::LoggedOut)
    }

    pub fn expire(&self) -> Result<()> {
        self.clear(SessionEvent::Expired)
    }

    fn clear(&self, event: SessionEvent) -> Result<()> {
        let mut inner = self.lock();
        inner.store.remove(AUTH_TOKEN_KEY)?;
        inner.store.remove(USER_KEY)?;
        inner.token = None;
        inner.user = None;
        Self::emit(&mut inner, event);
        Ok(())
    }

    fn emit(inner: &mut Inner, event: SessionEvent) {
        // Drop subscribers whose receiver is gone
        inner.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    /// Runs `f` against the backing store, for non-auth keys.
    pub fn with_store<R>(&self, f: impl FnOnce(&LocalStore) -> R) -> R {
        let inner = self.lock();
        f(&inner.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        serde_json::from_value(serde_json::json!({"email": email, "role": "professional"})).unwrap()
    }

    #[test]
    fn test_hydrate_empty_store() {
        let session = Session::hydrate(LocalStore::open_in_memory().unwrap()).unwrap();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[test]
    fn test_hydrate_restores_token_and_user() {
        let store = LocalStore::open_in_memory().unwrap();
        store.set(AUTH_TOKEN_KEY, "tok").unwrap();
        store.set(USER_KEY, r#"{"email":"pilot@example.com"}"#).unwrap();

        let session = Session::hydrate(store).unwrap();
        assert_eq!(session.token().as_deref(), Some("tok"));
        assert_eq!(session.user().unwrap().email, "pilot@example.com");
    }

    #[test]
    fn test_hydrate_clears_corrupt_user() {
        let store = LocalStore::open_in_memory().unwrap();
        store.set(AUTH_TOKEN_KEY, "tok").unwrap();
        store.set(USER_KEY, "{not json").unwrap();

        let session = Session::hydrate(store).unwrap();
        assert!(!session.is_authenticated());
        session.with_store(|s| {
            assert_eq!(s.get(AUTH_TOKEN_KEY).unwrap(), None);
            assert_eq!(s.get(USER_KEY).unwrap(), None);
        });
    }

    #[test]
    fn test_sign_in_persists_and_notifies() {
        let session = Session::hydrate(LocalStore::open_in_memory().unwrap()).unwrap();
        let events = session.subscribe();

        session.sign_in("tok", Some(user("a@b.co"))).unwrap();
        assert_eq!(events.try_recv(), Ok(SessionEvent::SignedIn));
        session.with_store(|s| {
            assert_eq!(s.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("tok"));
            assert!(s.get(USER_KEY).unwrap().unwrap().contains("a@b.co"));
        });
    }

    #[test]
    fn test_expire_clears_and_emits_expired() {
        let session = Session::hydrate(LocalStore::open_in_memory().unwrap()).unwrap();
        session.sign_in("tok", Some(user("a@b.co"))).unwrap();
        let events = session.subscribe();

        session.expire().unwrap();
        assert_eq!(events.try_recv(), Ok(SessionEvent::Expired));
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        session.with_store(|s| assert!(s.keys().unwrap().is_empty()));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let session = Session::hydrate(LocalStore::open_in_memory().unwrap()).unwrap();
        drop(session.subscribe());
        let live = session.subscribe();
        session.logout().unwrap();
        assert_eq!(live.try_recv(), Ok(SessionEvent::LoggedOut));
        assert_eq!(session.lock().subscribers.len(), 1);
    }
}
