use std::fmt;

use serde::{Deserialize, Serialize};

/// Display name chosen on the entry screen. The chat core treats it as an
/// opaque, already validated string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for DisplayName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unconnected,
    Connecting,
    Joined,
    Rejected,
    Disconnected,
}

impl ConnectionState {
    /// Rejected and disconnected sessions are never reused by the same page.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Disconnected)
    }
}

/// Wire names are produced by [`MessageKind::as_str`] and read back with
/// [`MessageKind::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Normal,
    Movie,
    AiChat,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Movie => "movie",
            Self::AiChat => "ai_chat",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "normal" => Some(Self::Normal),
            "movie" => Some(Self::Movie),
            "ai_chat" => Some(Self::AiChat),
            _ => None,
        }
    }
}
