use std::sync::Arc;

use shared::protocol::UserSummary;
use tracing::{info, warn};
use url::Url;

use crate::{api::Backend, token_store::TokenStore};

pub const TOKEN_QUERY_PARAM: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// `?token=` on the entry URL.
    UrlToken,
    StoredToken,
    CookieSession,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Authenticated {
        user: UserSummary,
        source: AuthSource,
    },
    Anonymous,
}

impl SessionState {
    pub fn user(&self) -> Option<&UserSummary> {
        match self {
            SessionState::Authenticated { user, .. } => Some(user),
            SessionState::Anonymous => None,
        }
    }
}

/// Decides once per start-up who the user is: URL token, then stored token,
/// then the server-side cookie session.
pub struct SessionGate {
    backend: Backend,
    tokens: Arc<dyn TokenStore>,
    state: Option<SessionState>,
    cleaned_url: Option<Url>,
}

impl SessionGate {
    pub fn new(backend: Backend, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            backend,
            tokens,
            state: None,
            cleaned_url: None,
        }
    }

    pub async fn initialize(&mut self, entry_url: Option<&Url>) -> &SessionState {
        if self.state.is_none() {
            let state = self.resolve(entry_url).await;
            match &state {
                SessionState::Authenticated { user, source } => {
                    info!(username = %user.username, source = ?source, "auth: session established");
                }
                SessionState::Anonymous => info!("auth: no session"),
            }
            self.state = Some(state);
        }
        self.state.get_or_insert(SessionState::Anonymous)
    }

    async fn resolve(&mut self, entry_url: Option<&Url>) -> SessionState {
        if let Some(url) = entry_url {
            if let Some(token) = token_from_url(url) {
                self.cleaned_url = Some(strip_token(url));
                let verified = self.backend.verify_token(&token).await;
                if let (true, Some(user)) = (verified.valid, verified.user) {
                    if let Err(err) = self.tokens.save(&token) {
                        warn!(error = %err, "auth: failed to persist url token");
                    }
                    return SessionState::Authenticated {
                        user,
                        source: AuthSource::UrlToken,
                    };
                }
                warn!("auth: url token rejected");
            }
        }

        match self.tokens.load() {
            Ok(Some(token)) => {
                let verified = self.backend.verify_token(&token).await;
                if let (true, Some(user)) = (verified.valid, verified.user) {
                    return SessionState::Authenticated {
                        user,
                        source: AuthSource::StoredToken,
                    };
                }
                info!("auth: stored token no longer valid, clearing");
                if let Err(err) = self.tokens.clear() {
                    warn!(error = %err, "auth: failed to clear stored token");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "auth: failed to read stored token"),
        }

        match self.backend.session_user().await {
            Ok(Some(user)) => SessionState::Authenticated {
                user,
                source: AuthSource::CookieSession,
            },
            Ok(None) => SessionState::Anonymous,
            Err(err) => {
                info!(error = %err, "auth: cookie session probe failed");
                SessionState::Anonymous
            }
        }
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn user(&self) -> Option<&UserSummary> {
        self.state.as_ref().and_then(SessionState::user)
    }

    /// Signed in with a paid account.
    pub fn is_authenticated(&self) -> bool {
        self.user().is_some_and(|user| user.is_paid)
    }

    /// Entry URL with the consumed `token` parameter removed.
    pub fn cleaned_url(&self) -> Option<&Url> {
        self.cleaned_url.as_ref()
    }

    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.tokens.clear()?;
        self.state = Some(SessionState::Anonymous);
        info!("auth: logged out");
        Ok(())
    }
}

pub fn token_from_url(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key == TOKEN_QUERY_PARAM && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

pub fn strip_token(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != TOKEN_QUERY_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    let mut cleaned = url.clone();
    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}
