use shared::domain::DisplayName;
use url::{form_urlencoded, Url};

pub const ENTRY_PATH: &str = "/";
pub const CHAT_PATH: &str = "/chat";

/// Screen transitions between the entry (login) screen and the chat screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Entry,
    Chat { username: DisplayName },
}

impl Navigation {
    pub fn path(&self) -> String {
        match self {
            Self::Entry => ENTRY_PATH.to_string(),
            Self::Chat { username } => {
                let encoded: String =
                    form_urlencoded::byte_serialize(username.as_str().as_bytes()).collect();
                format!("{CHAT_PATH}?username={encoded}")
            }
        }
    }

    /// Absolute location of the target screen on the given server.
    pub fn resolve(&self, origin: &Url) -> Result<Url, url::ParseError> {
        origin.join(&self.path())
    }
}
