//! Authentication session state and its observable store.
//!
//! The session is mutated only through [`SessionAction`]s dispatched on a
//! [`SessionStore`]. Each dispatch applies synchronously and then notifies
//! subscribers once, in subscription order. Persistence is just another
//! subscriber (see [`persist_to`]); storage failures are logged and
//! swallowed so they never interfere with a transition.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::Storage;

/// Storage key holding the serialized session.
pub const SESSION_KEY: &str = "auth";

/// Identity of the logged-in user, as far as the client knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: Option<i64>,
    pub username: Option<String>,
}

impl User {
    /// Reads a user from loosely-typed JSON; wrongly typed fields become `None`.
    pub fn from_json(value: &Value) -> Option<User> {
        let map = value.as_object()?;
        Some(User {
            id: map.get("id").and_then(Value::as_i64),
            username: map
                .get("username")
                .and_then(Value::as_str)
                .map(ToString::to_string),
        })
    }
}

/// Current authentication state.
///
/// The session counts as authenticated exactly when `access` is set. `user`
/// may be absent even then, when the access token carried no usable identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub user: Option<User>,
}

/// The transitions a session can go through.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    LoginSuccess {
        access: String,
        refresh: Option<String>,
        user: Option<User>,
    },
    RegisterSuccess {
        user: Option<User>,
    },
    RefreshSuccess {
        access: String,
    },
    Logout,
    /// Replaces the whole session from persisted JSON; non-objects are ignored.
    Hydrate(Value),
}

impl SessionAction {
    pub fn name(&self) -> &'static str {
        match self {
            SessionAction::LoginSuccess { .. } => "login_success",
            SessionAction::RegisterSuccess { .. } => "register_success",
            SessionAction::RefreshSuccess { .. } => "refresh_success",
            SessionAction::Logout => "logout",
            SessionAction::Hydrate(_) => "hydrate",
        }
    }
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access.is_some()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().and_then(|u| u.id)
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.username.as_deref())
    }

    /// Returns true if this session may edit or delete a resource owned by
    /// `author_id`. A client-side gate only; the API enforces its own check.
    pub fn is_author_of(&self, author_id: i64) -> bool {
        self.is_authenticated() && self.user_id() == Some(author_id)
    }

    /// Returns the state after applying `action`.
    #[must_use]
    pub fn apply(&self, action: SessionAction) -> Session {
        match action {
            SessionAction::LoginSuccess {
                access,
                refresh,
                user,
            } => Session {
                access: Some(access),
                refresh,
                user,
            },
            SessionAction::RegisterSuccess { user } => Session {
                user,
                ..self.clone()
            },
            SessionAction::RefreshSuccess { access } => Session {
                access: Some(access),
                ..self.clone()
            },
            SessionAction::Logout => Session::default(),
            SessionAction::Hydrate(Value::Object(map)) => Session::from_persisted(&map),
            SessionAction::Hydrate(_) => self.clone(),
        }
    }

    fn from_persisted(map: &Map<String, Value>) -> Session {
        let string_field = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .map(ToString::to_string)
        };
        Session {
            access: string_field("access"),
            refresh: string_field("refresh"),
            user: map.get("user").and_then(User::from_json),
        }
    }
}

/// Handle returned by [`SessionStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Session) + Send>;

/// Observable container owning the session.
#[derive(Default)]
pub struct SessionStore {
    state: Session,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.state.is_authenticated())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl SessionStore {
    /// Creates a store holding the empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from persisted state and wires persistence.
    ///
    /// Hydration happens before the persistence subscriber is attached, so
    /// restoring a session does not rewrite it. Missing, unreadable or
    /// malformed state leaves the store empty.
    pub fn bootstrap(storage: Arc<dyn Storage>) -> Self {
        let mut store = Self::new();
        if let Some(saved) = load_session(storage.as_ref()) {
            store.dispatch(SessionAction::Hydrate(saved));
        }
        store.subscribe(persist_to(storage));
        store
    }

    pub fn state(&self) -> &Session {
        &self.state
    }

    /// Applies `action`, then notifies every subscriber once.
    pub fn dispatch(&mut self, action: SessionAction) -> &Session {
        tracing::debug!(action = action.name(), "session transition");
        self.state = self.state.apply(action);
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&self.state);
        }
        &self.state
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&Session) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Removes a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }
}

/// Serializes the session under [`SESSION_KEY`].
///
/// # Errors
/// Returns an error if serialization or the storage write fails.
pub fn save_session(storage: &dyn Storage, session: &Session) -> Result<()> {
    let json = serde_json::to_string(session).context("Failed to serialize session")?;
    storage.set_item(SESSION_KEY, &json)
}

/// Reads the persisted session, if any, as raw JSON.
///
/// Unreadable or malformed state is logged and treated as absent.
pub fn load_session(storage: &dyn Storage) -> Option<Value> {
    let raw = match storage.get_item(SESSION_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "failed to read persisted session");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed persisted session");
            None
        }
    }
}

/// Subscriber writing every new state to `storage`, best-effort.
pub fn persist_to(storage: Arc<dyn Storage>) -> impl FnMut(&Session) + Send + 'static {
    move |session: &Session| {
        if let Err(e) = save_session(storage.as_ref(), session) {
            tracing::warn!(error = %format!("{e:#}"), "failed to persist session");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStorage;

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            anyhow::bail!("storage unavailable")
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            anyhow::bail!("quota exceeded")
        }
        fn remove_item(&self, _key: &str) -> Result<()> {
            anyhow::bail!("storage unavailable")
        }
    }

    fn login(access: &str, refresh: Option<&str>, id: i64, username: &str) -> SessionAction {
        SessionAction::LoginSuccess {
            access: access.to_string(),
            refresh: refresh.map(ToString::to_string),
            user: Some(User {
                id: Some(id),
                username: Some(username.to_string()),
            }),
        }
    }

    fn expected_login() -> Session {
        Session {
            access: Some("a".to_string()),
            refresh: Some("r".to_string()),
            user: Some(User {
                id: Some(1),
                username: Some("x".to_string()),
            }),
        }
    }

    #[test]
    fn test_login_then_logout() {
        let mut store = SessionStore::new();
        store.dispatch(login("a", Some("r"), 1, "x"));
        assert_eq!(store.state(), &expected_login());
        assert!(store.state().is_authenticated());

        store.dispatch(SessionAction::Logout);
        assert_eq!(store.state(), &Session::default());
        assert!(!store.state().is_authenticated());
    }

    #[test]
    fn test_register_replaces_only_user() {
        let mut store = SessionStore::new();
        store.dispatch(login("a", Some("r"), 1, "x"));
        store.dispatch(SessionAction::RegisterSuccess {
            user: Some(User {
                id: Some(2),
                username: Some("y".to_string()),
            }),
        });
        let state = store.state();
        assert_eq!(state.access.as_deref(), Some("a"));
        assert_eq!(state.refresh.as_deref(), Some("r"));
        assert_eq!(state.user_id(), Some(2));
    }

    #[test]
    fn test_refresh_replaces_only_access() {
        let mut store = SessionStore::new();
        store.dispatch(login("a", Some("r"), 1, "x"));
        store.dispatch(SessionAction::RefreshSuccess {
            access: "b".to_string(),
        });
        let state = store.state();
        assert_eq!(state.access.as_deref(), Some("b"));
        assert_eq!(state.refresh.as_deref(), Some("r"));
        assert_eq!(state.username(), Some("x"));
    }

    #[test]
    fn test_hydrate_non_object_is_ignored() {
        let mut store = SessionStore::new();
        store.dispatch(login("a", Some("r"), 1, "x"));

        store.dispatch(SessionAction::Hydrate(Value::Null));
        assert_eq!(store.state(), &expected_login());

        store.dispatch(SessionAction::Hydrate(json!("garbage")));
        assert_eq!(store.state(), &expected_login());

        store.dispatch(SessionAction::Hydrate(json!([1, 2])));
        assert_eq!(store.state(), &expected_login());
    }

    #[test]
    fn test_hydrate_partial_object_defaults_to_none() {
        let mut store = SessionStore::new();
        store.dispatch(login("a", Some("r"), 1, "x"));
        store.dispatch(SessionAction::Hydrate(json!({"access": "z"})));
        assert_eq!(
            store.state(),
            &Session {
                access: Some("z".to_string()),
                refresh: None,
                user: None,
            }
        );
    }

    #[test]
    fn test_hydrate_wrong_types_become_none() {
        let session = Session::default().apply(SessionAction::Hydrate(json!({
            "access": 5,
            "refresh": "r",
            "user": {"id": "seven", "username": "amy"}
        })));
        assert_eq!(session.access, None);
        assert_eq!(session.refresh.as_deref(), Some("r"));
        assert_eq!(
            session.user,
            Some(User {
                id: None,
                username: Some("amy".to_string()),
            })
        );
    }

    #[test]
    fn test_subscribers_notified_once_per_dispatch_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut store = SessionStore::new();

        let first = Arc::clone(&seen);
        store.subscribe(move |s| first.lock().unwrap().push(("first", s.access.clone())));
        let second = Arc::clone(&seen);
        store.subscribe(move |s| second.lock().unwrap().push(("second", s.access.clone())));

        store.dispatch(login("a", None, 1, "x"));
        store.dispatch(SessionAction::Hydrate(Value::Null));
        store.dispatch(SessionAction::Logout);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("first", Some("a".to_string())),
                ("second", Some("a".to_string())),
                ("first", Some("a".to_string())),
                ("second", Some("a".to_string())),
                ("first", None),
                ("second", None),
            ]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let count = Arc::new(Mutex::new(0));
        let mut store = SessionStore::new();
        let counter = Arc::clone(&count);
        let id = store.subscribe(move |_| *counter.lock().unwrap() += 1);

        store.dispatch(SessionAction::Logout);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.dispatch(SessionAction::Logout);

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_persistence_round_trip() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

        let mut store = SessionStore::bootstrap(Arc::clone(&storage));
        assert_eq!(store.state(), &Session::default());
        store.dispatch(login("a", Some("r"), 1, "x"));

        let restored = SessionStore::bootstrap(Arc::clone(&storage));
        assert_eq!(restored.state(), &expected_login());
    }

    #[test]
    fn test_logout_is_persisted() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut store = SessionStore::bootstrap(Arc::clone(&storage));
        store.dispatch(login("a", Some("r"), 1, "x"));
        store.dispatch(SessionAction::Logout);

        let raw = storage.get_item(SESSION_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!({"access": null, "refresh": null, "user": null}));

        let restored = SessionStore::bootstrap(storage);
        assert!(!restored.state().is_authenticated());
    }

    #[test]
    fn test_bootstrap_with_malformed_state_stays_empty() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set_item(SESSION_KEY, "{not json").unwrap();
        let store = SessionStore::bootstrap(Arc::clone(&storage));
        assert_eq!(store.state(), &Session::default());

        storage.set_item(SESSION_KEY, "42").unwrap();
        let store = SessionStore::bootstrap(storage);
        assert_eq!(store.state(), &Session::default());
    }

    #[test]
    fn test_broken_storage_never_interrupts_transitions() {
        let storage: Arc<dyn Storage> = Arc::new(BrokenStorage);
        let mut store = SessionStore::bootstrap(storage);
        assert_eq!(store.state(), &Session::default());

        store.dispatch(login("a", Some("r"), 1, "x"));
        assert_eq!(store.state(), &expected_login());
    }

    #[test]
    fn test_is_author_of() {
        let session = Session::default().apply(login("a", None, 4, "amy"));
        assert!(session.is_author_of(4));
        assert!(!session.is_author_of(5));

        let registered_only = Session::default().apply(SessionAction::RegisterSuccess {
            user: Some(User {
                id: Some(4),
                username: None,
            }),
        });
        assert!(!registered_only.is_author_of(4));
    }
}
