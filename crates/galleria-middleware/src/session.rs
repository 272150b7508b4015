//! Cookie-backed server-side sessions.
//!
//! The session cookie carries only an opaque [`SessionId`]; the data lives in
//! a [`SessionStore`]. A [`Session`] handle is loaded once per request by
//! [`SessionManager::load`], shared between the request context and the
//! dispatch engine, and written back by [`SessionManager::persist`] after
//! the middleware chain finishes.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::cookie::{Cookies, SameSite, SetCookie};

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "galleria.sid";

/// Errors raised by session stores.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backing store failed.
    #[error("session store error: {0}")]
    Store(String),
}

/// Opaque session identifier carried in the cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a random session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Data kept for a browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// Authenticated user, if any.
    pub user_id: Option<String>,
    /// Tenant the user is currently working in.
    pub current_tenant_id: Option<String>,
    /// Pending OAuth `state` for the login round trip.
    pub oauth_state: Option<String>,
    /// Where to send the user after login.
    pub return_to: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    id: Option<SessionId>,
    replaced: Option<SessionId>,
    data: SessionData,
    dirty: bool,
    destroyed: bool,
}

/// Shared handle to the current request's session.
///
/// Cloning the handle shares the same state.
///
/// # Example
///
/// ```
/// use galleria_middleware::Session;
///
/// let session = Session::new();
/// session.update(|data| data.return_to = Some("/dashboard".to_string()));
///
/// assert!(session.is_dirty());
/// assert_eq!(session.take_return_to().as_deref(), Some("/dashboard"));
/// assert_eq!(session.data().return_to, None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

impl Session {
    /// Creates an empty session with no id yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle for data loaded from a store.
    #[must_use]
    pub fn loaded(id: SessionId, data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                id: Some(id),
                replaced: None,
                data,
                dirty: false,
                destroyed: false,
            })),
        }
    }

    /// Returns the session id, if the session has been stored before.
    #[must_use]
    pub fn id(&self) -> Option<SessionId> {
        self.inner.lock().id
    }

    /// Returns a snapshot of the session data.
    #[must_use]
    pub fn data(&self) -> SessionData {
        self.inner.lock().data.clone()
    }

    /// Returns the authenticated user id.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.inner.lock().data.user_id.clone()
    }

    /// Returns the current tenant id.
    #[must_use]
    pub fn current_tenant_id(&self) -> Option<String> {
        self.inner.lock().data.current_tenant_id.clone()
    }

    /// Mutates the session data and marks it for saving.
    pub fn update<T>(&self, f: impl FnOnce(&mut SessionData) -> T) -> T {
        let mut state = self.inner.lock();
        state.dirty = true;
        f(&mut state.data)
    }

    /// Removes and returns the post-login return path.
    pub fn take_return_to(&self) -> Option<String> {
        self.update(|data| data.return_to.take())
    }

    /// Removes and returns the pending OAuth state.
    pub fn take_oauth_state(&self) -> Option<String> {
        self.update(|data| data.oauth_state.take())
    }

    /// Moves the data to a new id on the next persist.
    ///
    /// The old id is deleted from the store and a new cookie is issued.
    /// Call this when the session gains privileges, e.g. at login.
    pub fn regenerate_id(&self) {
        let mut state = self.inner.lock();
        if let Some(id) = state.id.take() {
            state.replaced.get_or_insert(id);
        }
        state.dirty = true;
    }

    /// Clears all data and deletes the session on persist.
    pub fn destroy(&self) {
        let mut state = self.inner.lock();
        state.data = SessionData::default();
        state.destroyed = true;
        state.dirty = false;
    }

    /// Returns `true` if the data changed since it was loaded.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }

    /// Returns `true` if [`Session::destroy`] was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.lock().destroyed
    }

    fn assign_id(&self) -> (SessionId, bool) {
        let mut state = self.inner.lock();
        match state.id {
            Some(id) => (id, false),
            None => {
                let id = SessionId::generate();
                state.id = Some(id);
                (id, true)
            }
        }
    }

    fn take_replaced(&self) -> Option<SessionId> {
        self.inner.lock().replaced.take()
    }

    fn mark_clean(&self) {
        self.inner.lock().dirty = false;
    }
}

/// Storage for session data.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Loads the data for `id`, or `None` if unknown or expired.
    async fn load(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError>;

    /// Stores the data for `id`.
    async fn save(&self, id: &SessionId, data: &SessionData) -> Result<(), SessionError>;

    /// Deletes `id`.
    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError>;
}

#[derive(Debug)]
struct StoredSession {
    data: SessionData,
    touched: Instant,
}

/// Longest gap between sweeps of expired sessions.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// In-process session store with idle expiry.
///
/// Expired sessions are removed when they are loaded and by a sweep that
/// [`SessionStore::save`] runs at most once per sweep interval, so sessions
/// whose cookie never comes back do not accumulate.
#[derive(Debug)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<SessionId, StoredSession>>,
    idle_timeout: Duration,
    last_sweep: Mutex<Instant>,
}

impl MemorySessionStore {
    /// Creates a store whose sessions expire after `idle_timeout` without use.
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            idle_timeout,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Returns the number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every session idle for longer than the timeout.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        let timeout = self.idle_timeout;
        entries.retain(|_, stored| stored.touched.elapsed() <= timeout);
        before - entries.len()
    }

    fn sweep_if_due(&self) {
        {
            let mut last = self.last_sweep.lock();
            if last.elapsed() < self.idle_timeout.min(MAX_SWEEP_INTERVAL) {
                return;
            }
            *last = Instant::now();
        }

        let purged = self.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "purged expired sessions");
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60 * 24))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<SessionData>, SessionError> {
        let mut entries = self.entries.write();
        let expired = match entries.get_mut(id) {
            None => return Ok(None),
            Some(stored) if stored.touched.elapsed() > self.idle_timeout => true,
            Some(stored) => {
                stored.touched = Instant::now();
                return Ok(Some(stored.data.clone()));
            }
        };
        if expired {
            entries.remove(id);
        }
        Ok(None)
    }

    async fn save(&self, id: &SessionId, data: &SessionData) -> Result<(), SessionError> {
        self.sweep_if_due();
        self.entries.write().insert(
            *id,
            StoredSession {
                data: data.clone(),
                touched: Instant::now(),
            },
        );
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), SessionError> {
        self.entries.write().remove(id);
        Ok(())
    }
}

/// Session cookie settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cookie name.
    pub cookie_name: String,
    /// Whether to set the `Secure` attribute.
    pub secure: bool,
    /// Cookie `Max-Age`.
    pub max_age: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secure: false,
            max_age: Duration::from_secs(60 * 60 * 24),
        }
    }
}

/// Loads and persists sessions around each request.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager over `store`.
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Creates a manager over a fresh [`MemorySessionStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        let config = SessionConfig::default();
        let store = MemorySessionStore::new(config.max_age);
        Self::new(Arc::new(store), config)
    }

    /// Returns the cookie settings.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Loads the session named by the request's cookie.
    ///
    /// Unknown ids, expired sessions and store failures all yield a fresh
    /// session; failures are logged.
    pub async fn load(&self, headers: &HeaderMap) -> Session {
        let cookies = Cookies::from_headers(headers);
        let Some(id) = cookies
            .get(&self.config.cookie_name)
            .and_then(|raw| raw.parse::<SessionId>().ok())
        else {
            return Session::new();
        };

        match self.store.load(&id).await {
            Ok(Some(data)) => Session::loaded(id, data),
            Ok(None) => Session::new(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load session, starting a new one");
                Session::new()
            }
        }
    }

    /// Writes the session back to the store.
    ///
    /// Returns the `Set-Cookie` value to send, if the cookie must change.
    pub async fn persist(&self, session: &Session) -> Result<Option<HeaderValue>, SessionError> {
        if session.is_destroyed() {
            let ids: Vec<SessionId> = session.id().into_iter().chain(session.take_replaced()).collect();
            if ids.is_empty() {
                return Ok(None);
            }
            for id in &ids {
                self.store.destroy(id).await?;
            }
            let cookie = SetCookie::remove(&self.config.cookie_name).path("/");
            return Ok(header_value(&cookie));
        }

        if !session.is_dirty() {
            return Ok(None);
        }

        let (id, is_new) = session.assign_id();
        self.store.save(&id, &session.data()).await?;
        if let Some(old) = session.take_replaced() {
            self.store.destroy(&old).await?;
        }
        session.mark_clean();

        if is_new {
            let cookie = SetCookie::new(&self.config.cookie_name, id.to_string())
                .path("/")
                .http_only(true)
                .secure(self.config.secure)
                .same_site(SameSite::Lax)
                .max_age(self.config.max_age);
            Ok(header_value(&cookie))
        } else {
            Ok(None)
        }
    }
}

fn header_value(cookie: &SetCookie) -> Option<HeaderValue> {
    HeaderValue::from_str(&cookie.to_header_value()).ok()
}
