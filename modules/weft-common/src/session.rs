/// Per-request session context, passed explicitly into every call against an
/// external interface instead of being read from ambient global state.
#[derive(Debug, Clone)]
pub struct Session {
    /// Identifier of the acting user (for audit fields on writes).
    pub actor: String,
    /// Bearer token for providers that require one. The geocoding provider
    /// identifies the client by User-Agent only and ignores this.
    pub token: Option<String>,
}

impl Session {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Value for an Authorization header, when a token is present.
    pub fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }
}
