//! Session store.
//!
//! Holds the authenticated identity and bearer token, and persists them to a
//! JSON file under a fixed name so a session survives restarts. Every other
//! component reads the token through this store only.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use saffron_core::Email;

use crate::api::ApiError;
use crate::models::{Identity, Session, SessionToken};

/// Fixed file name for the persisted session inside the state directory.
pub const SESSION_FILE: &str = "session.json";

/// Errors that can occur during authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The backend rejected the attempt (bad credentials, duplicate
    /// account). Carries the backend's human-readable message.
    #[error("{0}")]
    Rejected(String),

    /// The request never produced a usable response.
    #[error("authentication request failed: {0}")]
    Transport(ApiError),
}

/// Login input.
#[derive(Debug)]
pub struct Credentials {
    /// Account email.
    pub email: Email,
    /// Account password. Only ever sent to the login endpoint, never stored.
    pub password: SecretString,
}

impl Credentials {
    /// Build credentials from an email and a password.
    pub fn new(email: Email, password: impl Into<String>) -> Self {
        Self {
            email,
            password: SecretString::from(password.into()),
        }
    }
}

/// Registration input.
#[derive(Debug)]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: Email,
    /// Account password. Only ever sent to the register endpoint.
    pub password: SecretString,
}

impl Registration {
    /// Build a registration profile.
    pub fn new(name: impl Into<String>, email: Email, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email,
            password: SecretString::from(password.into()),
        }
    }
}

/// A successful authentication result from the backend.
#[derive(Debug)]
pub struct AuthSuccess {
    /// The authenticated identity.
    pub identity: Identity,
    /// The issued bearer token.
    pub token: SessionToken,
}

/// Backend endpoints the session store drives.
pub trait AuthApi {
    /// Exchange credentials for an identity and token.
    async fn login(&self, credentials: &Credentials) -> Result<AuthSuccess, ApiError>;

    /// Create an account and sign it in.
    async fn register(&self, registration: &Registration) -> Result<AuthSuccess, ApiError>;

    /// Invalidate the token server-side.
    async fn logout(&self, token: &SessionToken) -> Result<(), ApiError>;
}

/// On-disk shape of a persisted session.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
    identity: Identity,
}

/// The authenticated-identity store.
///
/// `open` restores any previously persisted session; a corrupt or unreadable
/// file is discarded with a warning rather than surfaced as an error.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    current: Option<Session>,
}

impl SessionStore {
    /// Open the store, restoring a persisted session from `state_dir` if one
    /// exists.
    pub async fn open(state_dir: impl Into<PathBuf>) -> Self {
        let path = state_dir.into().join(SESSION_FILE);
        let current = load_persisted(&path).await;
        if current.is_some() {
            tracing::debug!(path = %path.display(), "restored persisted session");
        }
        Self { path, current }
    }

    /// The current session, if signed in.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// The current bearer token, if signed in.
    #[must_use]
    pub fn token(&self) -> Option<&SessionToken> {
        self.current.as_ref().map(|s| &s.token)
    }

    /// Whether the signed-in identity may manage the catalog.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current.as_ref().is_some_and(Session::is_admin)
    }

    /// Sign in. On success the session is stored and persisted; on failure
    /// any prior session is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] with the backend's message for
    /// refused credentials, [`AuthError::Transport`] otherwise.
    pub async fn login(
        &mut self,
        api: &impl AuthApi,
        credentials: &Credentials,
    ) -> Result<&Session, AuthError> {
        let outcome = api.login(credentials).await.map_err(classify)?;
        Ok(self.install(outcome).await)
    }

    /// Register a new account and sign it in. Same failure semantics as
    /// [`SessionStore::login`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] with the backend's message for
    /// refused registrations, [`AuthError::Transport`] otherwise.
    pub async fn register(
        &mut self,
        api: &impl AuthApi,
        registration: &Registration,
    ) -> Result<&Session, AuthError> {
        let outcome = api.register(registration).await.map_err(classify)?;
        Ok(self.install(outcome).await)
    }

    /// Sign out.
    ///
    /// The backend is notified best-effort; local state and the persisted
    /// file are always cleared.
    pub async fn logout(&mut self, api: &impl AuthApi) {
        if let Some(session) = self.current.take() {
            if let Err(error) = api.logout(&session.token).await {
                tracing::warn!(%error, "backend logout failed; clearing local session anyway");
            }
        }
        remove_persisted(&self.path).await;
    }

    async fn install(&mut self, outcome: AuthSuccess) -> &Session {
        let session = Session {
            identity: outcome.identity,
            token: outcome.token,
        };
        persist(&self.path, &session).await;
        self.current.insert(session)
    }
}

fn classify(error: ApiError) -> AuthError {
    match error {
        ApiError::Unauthorized(message) => AuthError::Rejected(message),
        ApiError::Backend { status, message } if status < 500 => AuthError::Rejected(message),
        other => AuthError::Transport(other),
    }
}

async fn load_persisted(path: &Path) -> Option<Session> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(error) => {
            tracing::warn!(%error, path = %path.display(), "could not read session file");
            return None;
        }
    };

    match serde_json::from_slice::<PersistedSession>(&bytes) {
        Ok(persisted) => Some(Session {
            identity: persisted.identity,
            token: SessionToken::new(persisted.token),
        }),
        Err(error) => {
            tracing::warn!(%error, path = %path.display(), "discarding corrupt session file");
            None
        }
    }
}

/// Persistence is best-effort: a session that cannot be written is still
/// usable for the life of the process.
async fn persist(path: &Path, session: &Session) {
    let persisted = PersistedSession {
        token: session.token.expose().to_owned(),
        identity: session.identity.clone(),
    };

    let result = async {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(&persisted)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(path, json).await
    }
    .await;

    if let Err(error) = result {
        tracing::warn!(%error, path = %path.display(), "could not persist session");
    }
}

async fn remove_persisted(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => {
            tracing::warn!(%error, path = %path.display(), "could not remove session file");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use saffron_core::{Role, UserId};

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::new("u1"),
            name: "Priya".to_string(),
            email: Email::parse("priya@example.com").unwrap(),
            role,
        }
    }

    /// Auth stub with canned responses.
    struct FixedAuth {
        login: Result<(Identity, &'static str), ApiError>,
    }

    impl AuthApi for FixedAuth {
        async fn login(&self, _credentials: &Credentials) -> Result<AuthSuccess, ApiError> {
            match &self.login {
                Ok((identity, token)) => Ok(AuthSuccess {
                    identity: identity.clone(),
                    token: SessionToken::new(*token),
                }),
                Err(ApiError::Unauthorized(m)) => Err(ApiError::Unauthorized(m.clone())),
                Err(ApiError::Backend { status, message }) => Err(ApiError::Backend {
                    status: *status,
                    message: message.clone(),
                }),
                Err(_) => unreachable!("stub only configured with Unauthorized/Backend"),
            }
        }

        async fn register(&self, _registration: &Registration) -> Result<AuthSuccess, ApiError> {
            self.login(&Credentials::new(
                Email::parse("x@example.com").unwrap(),
                "pw",
            ))
            .await
        }

        async fn logout(&self, _token: &SessionToken) -> Result<(), ApiError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_login_persists_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let api = FixedAuth {
            login: Ok((identity(Role::Customer), "tok-abc")),
        };

        let mut store = SessionStore::open(dir.path()).await;
        assert!(store.session().is_none());

        let credentials = Credentials::new(Email::parse("priya@example.com").unwrap(), "pw");
        let session = store.login(&api, &credentials).await.unwrap();
        assert_eq!(session.token.expose(), "tok-abc");

        // A fresh store over the same directory restores the session.
        let reopened = SessionStore::open(dir.path()).await;
        assert_eq!(
            reopened.token().map(SessionToken::expose),
            Some("tok-abc")
        );
    }

    #[tokio::test]
    async fn test_failed_login_leaves_prior_session_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let good = FixedAuth {
            login: Ok((identity(Role::Customer), "tok-1")),
        };
        let bad = FixedAuth {
            login: Err(ApiError::Unauthorized("Invalid credentials".to_string())),
        };

        let mut store = SessionStore::open(dir.path()).await;
        let credentials = Credentials::new(Email::parse("priya@example.com").unwrap(), "pw");
        store.login(&good, &credentials).await.unwrap();

        let err = store.login(&bad, &credentials).await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(ref m) if m == "Invalid credentials"));
        assert_eq!(store.token().map(SessionToken::expose), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_server_fault_is_transport_not_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let api = FixedAuth {
            login: Err(ApiError::Backend {
                status: 503,
                message: "unavailable".to_string(),
            }),
        };

        let mut store = SessionStore::open(dir.path()).await;
        let credentials = Credentials::new(Email::parse("priya@example.com").unwrap(), "pw");
        let err = store.login(&api, &credentials).await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_state_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let api = FixedAuth {
            login: Ok((identity(Role::Admin), "tok-admin")),
        };

        let mut store = SessionStore::open(dir.path()).await;
        let credentials = Credentials::new(Email::parse("priya@example.com").unwrap(), "pw");
        store.login(&api, &credentials).await.unwrap();
        assert!(store.is_admin());

        store.logout(&api).await;
        assert!(store.session().is_none());
        assert!(!store.is_admin());
        assert!(!dir.path().join(SESSION_FILE).exists());
    }

    #[tokio::test]
    async fn test_corrupt_session_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(SESSION_FILE), b"{not json")
            .await
            .unwrap();

        let store = SessionStore::open(dir.path()).await;
        assert!(store.session().is_none());
    }
}
