use shared::domain::DisplayName;
use thiserror::Error;
use url::Url;

pub const USERNAME_QUERY_KEY: &str = "username";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("missing `username` query parameter")]
    MissingUsername,
}

/// Everything one chat page knows about itself. Built once at load and
/// handed to every component that needs the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    identity: DisplayName,
    server_url: Url,
}

impl SessionContext {
    pub fn new(identity: DisplayName, server_url: Url) -> Self {
        Self {
            identity,
            server_url,
        }
    }

    pub fn identity(&self) -> &DisplayName {
        &self.identity
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    pub fn is_own(&self, username: &str) -> bool {
        self.identity == *username
    }
}

/// Reads the display name from the chat page location. The server origin is
/// taken from the same location.
pub fn resolve_identity(location: &Url) -> Result<SessionContext, IdentityError> {
    let username = location
        .query_pairs()
        .find(|(key, _)| key == USERNAME_QUERY_KEY)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .ok_or(IdentityError::MissingUsername)?;

    let mut server_url = location.clone();
    server_url.set_path("/");
    server_url.set_query(None);
    server_url.set_fragment(None);

    Ok(SessionContext::new(DisplayName::new(username), server_url))
}

#[cfg(test)]
#[path = "tests/identity_tests.rs"]
mod tests;
