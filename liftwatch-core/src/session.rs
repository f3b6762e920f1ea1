//! Client session state machine
//!
//! Two states, Anonymous and Authenticated, plus a transient `loading`
//! flag that is only raised around token verification. Invariant: an
//! authenticated state always carries both a user and a token, and leaving
//! it drops all three in a single state replacement.
//!
//! Every change is published on a `watch` channel (see [`Session::subscribe`]).

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::watch;

use crate::auth::AuthService;
use crate::client::{ApiClient, ApiError, ClientEvent};
use crate::jwt;
use crate::protocol::{Credentials, ROLE_ADMIN, ROLE_USER, User};
use crate::routes::Route;
use crate::storage::{StorageError, TokenStore};

/// Snapshot of the session record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub token: Option<String>,
    pub loading: bool,
}

impl SessionState {
    fn authenticated(user: User, token: String) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            token: Some(token),
            loading: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Empty when signed out
    pub fn username(&self) -> &str {
        self.user.as_ref().map(|u| u.username.as_str()).unwrap_or_default()
    }

    /// `"user"` when signed out
    pub fn role(&self) -> &str {
        self.user.as_ref().map(|u| u.role.as_str()).unwrap_or(ROLE_USER)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == ROLE_ADMIN
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// The process's session handle
///
/// Built once from an [`ApiClient`] and passed to whatever needs it.
pub struct Session {
    auth: AuthService,
    tokens: Arc<TokenStore>,
    events: broadcast::Receiver<ClientEvent>,
    state: watch::Sender<SessionState>,
    verify_on_startup: bool,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        let tokens = Arc::clone(api.tokens());
        let events = api.subscribe();
        let (state, _) = watch::channel(SessionState::default());

        Self {
            auth: AuthService::new(api),
            tokens,
            events,
            state,
            verify_on_startup: true,
        }
    }

    /// Whether [`Session::restore`] checks the restored token with the server
    pub fn with_verify_on_startup(mut self, verify: bool) -> Self {
        self.verify_on_startup = verify;
        self
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// Current state (cloned)
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Enter Authenticated and persist token and user
    pub fn login(&self, user: User, token: String) -> Result<(), StorageError> {
        self.tokens.set(&token)?;
        self.tokens.set_user(Some(&user))?;

        tracing::info!("Session authenticated as {}", user.username);
        self.state.send_replace(SessionState::authenticated(user, token));
        Ok(())
    }

    /// Sign in with credentials and enter Authenticated on success
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<User, ApiError> {
        let response = self.auth.login(credentials).await?;

        match (response.success, response.data) {
            (true, Some(data)) => {
                self.login(data.user.clone(), data.token)?;
                Ok(data.user)
            }
            (_, _) => Err(ApiError::Rejected {
                message: response.message.unwrap_or_else(|| "login failed".to_string()),
            }),
        }
    }

    /// Always ends Anonymous with an empty store; server errors are logged only
    pub async fn logout(&self) {
        if let Err(e) = self.auth.logout().await {
            tracing::warn!("Logout request failed: {}", e);
        }
        self.clear_state();
    }

    /// Restore a persisted session without contacting the server
    ///
    /// Requires both token and user. A JWT whose `exp` has already passed is
    /// discarded instead of restored.
    pub fn initialize_from_storage(&self) -> Result<bool, StorageError> {
        let token = self.tokens.get()?;
        let user = self.tokens.get_user()?;

        let (Some(token), Some(user)) = (token, user) else {
            return Ok(false);
        };

        if jwt::is_expired(&token) {
            tracing::info!("Stored token has expired, discarding session");
            self.tokens.clear_all()?;
            return Ok(false);
        }

        tracing::debug!("Restored session for {}", user.username);
        self.state.send_replace(SessionState::authenticated(user, token));
        Ok(true)
    }

    /// Startup restore, followed by verification when configured
    pub async fn restore(&self) -> Result<bool, StorageError> {
        if !self.initialize_from_storage()? {
            return Ok(false);
        }

        if self.verify_on_startup {
            return Ok(self.verify_token().await);
        }

        Ok(true)
    }

    /// Ask the server whether the held token is still valid
    ///
    /// Without a token this returns false and sends nothing. Any failure
    /// ends Anonymous. `loading` is cleared on every path.
    pub async fn verify_token(&self) -> bool {
        if self.state.borrow().token.is_none() {
            return false;
        }

        self.state.send_modify(|s| s.loading = true);

        let valid = match self.auth.verify_token().await {
            Ok(response) => match (response.success, response.data) {
                (true, Some(data)) => {
                    if let Err(e) = self.tokens.set_user(Some(&data.user)) {
                        tracing::warn!("Failed to persist refreshed user: {}", e);
                    }
                    self.state.send_modify(|s| {
                        if s.token.is_some() {
                            s.user = Some(data.user);
                        }
                    });
                    true
                }
                _ => {
                    tracing::warn!(
                        "Token verification rejected: {}",
                        response.message.as_deref().unwrap_or("no message")
                    );
                    self.clear_state();
                    false
                }
            },
            Err(e) => {
                tracing::warn!("Token verification failed: {}", e);
                self.clear_state();
                false
            }
        };

        self.state.send_modify(|s| s.loading = false);
        valid
    }

    /// False when Anonymous, otherwise [`Session::verify_token`]
    pub async fn check_auth_status(&self) -> bool {
        if !self.state.borrow().is_authenticated {
            return false;
        }
        self.verify_token().await
    }

    /// Apply pending HTTP-layer events
    ///
    /// Returns the route to redirect to when the server invalidated the
    /// credential.
    pub fn poll_events(&mut self) -> Option<Route> {
        let mut redirect = None;

        loop {
            match self.events.try_recv() {
                Ok(ClientEvent::Unauthenticated) => {
                    self.clear_state();
                    redirect = Some(Route::SignIn);
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("Skipped {} client events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        redirect
    }

    fn clear_state(&self) {
        self.state.send_replace(SessionState::default());

        if let Err(e) = self.tokens.clear_all() {
            tracing::warn!("Failed to clear token store: {}", e);
        }
        tracing::info!("Session cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::storage::{KeyValueStore, MemoryStore, TOKEN_KEY, USER_KEY};

    /// Client pointed at a port nothing listens on
    fn offline_session() -> (Session, Arc<TokenStore>) {
        let tokens = Arc::new(TokenStore::in_memory());
        let config = ClientConfig {
            api_base_url: "http://127.0.0.1:9/api".to_string(),
            timeout_secs: 2,
            ..ClientConfig::default()
        };
        let api = ApiClient::new(&config, Arc::clone(&tokens)).unwrap();
        (Session::new(api), tokens)
    }

    fn admin() -> User {
        User {
            id: 1,
            username: "root".to_string(),
            role: "admin".to_string(),
        }
    }

    #[test]
    fn test_derived_fields_when_anonymous() {
        let state = SessionState::default();
        assert!(!state.is_authenticated());
        assert_eq!(state.username(), "");
        assert_eq!(state.role(), "user");
        assert!(!state.is_admin());
        assert_eq!(state.user_id(), None);
    }

    #[test]
    fn test_login_persists_and_publishes() {
        let (session, tokens) = offline_session();
        let mut watcher = session.subscribe();

        session.login(admin(), "tok".to_string()).unwrap();

        let state = session.state();
        assert!(state.is_authenticated());
        assert!(state.is_admin());
        assert_eq!(state.user_id(), Some(1));
        assert_eq!(tokens.get().unwrap().as_deref(), Some("tok"));
        assert!(session.auth().is_logged_in().unwrap());

        assert!(watcher.has_changed().unwrap());
        assert_eq!(watcher.borrow_and_update().username(), "root");
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_request_fails() {
        let (session, tokens) = offline_session();
        session.login(admin(), "tok".to_string()).unwrap();

        session.logout().await;

        let state = session.state();
        assert_eq!(state, SessionState::default());
        assert_eq!(tokens.get().unwrap(), None);
        assert_eq!(tokens.get_user().unwrap(), None);
        assert!(!session.auth().is_logged_in().unwrap());
    }

    #[test]
    fn test_initialize_from_empty_storage() {
        let (session, _) = offline_session();
        assert!(!session.initialize_from_storage().unwrap());
        assert!(!session.state().is_authenticated());
    }

    #[test]
    fn test_initialize_requires_token_and_user() {
        let (session, tokens) = offline_session();
        tokens.set("lonely-token").unwrap();

        assert!(!session.initialize_from_storage().unwrap());
        assert!(!session.state().is_authenticated());
    }

    #[test]
    fn test_initialize_from_populated_storage() {
        let (session, tokens) = offline_session();
        tokens.set("persisted").unwrap();
        tokens.set_user(Some(&admin())).unwrap();

        assert!(session.initialize_from_storage().unwrap());

        let state = session.state();
        assert!(state.is_authenticated());
        assert_eq!(state.user, Some(admin()));
        assert_eq!(state.token.as_deref(), Some("persisted"));
        assert!(!state.loading);
    }

    #[test]
    fn test_initialize_discards_expired_jwt() {
        let (session, tokens) = offline_session();

        let user = admin();
        let claims = jwt::Claims {
            user_id: user.id,
            username: user.username,
            role: user.role,
            exp: 1_000,
            iat: 500,
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(&jwt::generate_secret()),
        )
        .unwrap();

        tokens.set(&token).unwrap();
        tokens.set_user(Some(&admin())).unwrap();

        assert!(!session.initialize_from_storage().unwrap());
        assert!(!session.state().is_authenticated());
        assert_eq!(tokens.get().unwrap(), None);
    }

    #[test]
    fn test_initialize_propagates_corrupt_user() {
        let backend = MemoryStore::new();
        backend.set(TOKEN_KEY, "tok").unwrap();
        backend.set(USER_KEY, "{oops").unwrap();
        let tokens = Arc::new(TokenStore::new(backend));
        let api = ApiClient::new(&ClientConfig::default(), tokens).unwrap();
        let session = Session::new(api);

        assert!(matches!(
            session.initialize_from_storage(),
            Err(StorageError::CorruptUser(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_without_token_is_noop() {
        let (session, _) = offline_session();
        let mut watcher = session.subscribe();

        assert!(!session.verify_token().await);
        assert!(!watcher.has_changed().unwrap());
        assert!(!session.check_auth_status().await);
    }

    #[tokio::test]
    async fn test_verify_network_failure_degrades_to_anonymous() {
        let (session, tokens) = offline_session();
        session.login(admin(), "tok".to_string()).unwrap();

        assert!(!session.verify_token().await);

        let state = session.state();
        assert!(!state.is_authenticated());
        assert!(!state.loading);
        assert_eq!(tokens.get().unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_without_verification() {
        let (session, tokens) = offline_session();
        let session = session.with_verify_on_startup(false);
        tokens.set("tok").unwrap();
        tokens.set_user(Some(&admin())).unwrap();

        assert!(session.restore().await.unwrap());
        assert!(session.state().is_authenticated());
    }

    #[test]
    fn test_poll_events_without_events() {
        let (mut session, _) = offline_session();
        assert_eq!(session.poll_events(), None);
    }
}
