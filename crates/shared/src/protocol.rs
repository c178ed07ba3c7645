use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    domain::{DisplayName, MessageKind},
    error::ProtocolError,
};

/// Events emitted by the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientRequest {
    JoinRoom { username: DisplayName },
    SendMessage { message: String, timestamp: String },
    LeaveRoom,
}

impl ClientRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::SendMessage { .. } => "send_message",
            Self::LeaveRoom => "leave_room",
        }
    }

    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|source| ProtocolError::Encode {
            event: self.name().to_string(),
            source,
        })
    }

    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::MalformedFrame)
    }
}

/// One text frame on the socket: `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUsers {
    pub online_users: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRejected {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub username: String,
}

/// Events pushed by the chat server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    JoinSuccess(OnlineUsers),
    JoinError(JoinRejected),
    NewMessage(WireMessage),
    UserJoined(Presence),
    UserLeft(Presence),
    UpdateUsers(OnlineUsers),
    /// Any event name this client does not understand.
    Unknown { name: String },
}

impl ServerEvent {
    pub fn name(&self) -> &str {
        match self {
            Self::JoinSuccess(_) => "join_success",
            Self::JoinError(_) => "join_error",
            Self::NewMessage(_) => "new_message",
            Self::UserJoined(_) => "user_joined",
            Self::UserLeft(_) => "user_left",
            Self::UpdateUsers(_) => "update_users",
            Self::Unknown { name } => name,
        }
    }

    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_str(frame).map_err(ProtocolError::MalformedFrame)?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let Envelope { event, data } = envelope;
        let decoded = match event.as_str() {
            "join_success" => Self::JoinSuccess(payload(&event, data)?),
            "join_error" => Self::JoinError(payload(&event, data)?),
            "new_message" => Self::NewMessage(payload(&event, data)?),
            "user_joined" => Self::UserJoined(payload(&event, data)?),
            "user_left" => Self::UserLeft(payload(&event, data)?),
            "update_users" => Self::UpdateUsers(payload(&event, data)?),
            _ => Self::Unknown {
                name: event.clone(),
            },
        };
        Ok(decoded)
    }

    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        let encode_err = |source| ProtocolError::Encode {
            event: self.name().to_string(),
            source,
        };
        let data = match self {
            Self::JoinSuccess(users) | Self::UpdateUsers(users) => serde_json::to_value(users),
            Self::JoinError(rejected) => serde_json::to_value(rejected),
            Self::NewMessage(message) => serde_json::to_value(message),
            Self::UserJoined(presence) | Self::UserLeft(presence) => {
                serde_json::to_value(presence)
            }
            Self::Unknown { .. } => Ok(Value::Null),
        }
        .map_err(encode_err)?;

        serde_json::to_string(&Envelope {
            event: self.name().to_string(),
            data,
        })
        .map_err(encode_err)
    }
}

fn payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::InvalidPayload {
        event: event.to_string(),
        source,
    })
}

/// Message record exactly as it travels on the wire. Variant fields are
/// optional here and validated when converting into [`MessageRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

// `null` text fields decode as empty strings.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Normal,
    Movie { movie_url: String },
    AiChat { ai_message: String, ai_reply: String },
}

impl MessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Normal => MessageKind::Normal,
            Self::Movie { .. } => MessageKind::Movie,
            Self::AiChat { .. } => MessageKind::AiChat,
        }
    }
}

/// A validated chat entry. Immutable once rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub username: String,
    pub message: String,
    pub body: MessageBody,
    pub timestamp: Option<String>,
}

impl MessageRecord {
    pub fn normal(username: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            message: message.into(),
            body: MessageBody::Normal,
            timestamp: None,
        }
    }

    pub fn movie(
        username: impl Into<String>,
        message: impl Into<String>,
        movie_url: impl Into<String>,
    ) -> Self {
        Self {
            body: MessageBody::Movie {
                movie_url: movie_url.into(),
            },
            ..Self::normal(username, message)
        }
    }

    pub fn ai_chat(
        username: impl Into<String>,
        message: impl Into<String>,
        ai_message: impl Into<String>,
        ai_reply: impl Into<String>,
    ) -> Self {
        Self {
            body: MessageBody::AiChat {
                ai_message: ai_message.into(),
                ai_reply: ai_reply.into(),
            },
            ..Self::normal(username, message)
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = non_empty(Some(timestamp.into()));
        self
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    /// Keeps sender, text and timestamp of a record whose variant fields
    /// could not be validated, rendering it as a plain message.
    pub fn degraded(wire: WireMessage) -> Self {
        Self {
            username: wire.username,
            message: wire.message,
            body: MessageBody::Normal,
            timestamp: non_empty(wire.timestamp),
        }
    }
}

impl TryFrom<WireMessage> for MessageRecord {
    type Error = ProtocolError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let kind = MessageKind::parse(&wire.kind)
            .ok_or_else(|| ProtocolError::UnknownMessageType(wire.kind.clone()))?;
        let body = match kind {
            MessageKind::Normal => MessageBody::Normal,
            MessageKind::Movie => MessageBody::Movie {
                movie_url: required(kind, "movie_url", wire.movie_url)?,
            },
            MessageKind::AiChat => MessageBody::AiChat {
                ai_message: required(kind, "ai_message", wire.ai_message)?,
                ai_reply: required(kind, "ai_reply", wire.ai_reply)?,
            },
        };

        Ok(Self {
            username: wire.username,
            message: wire.message,
            body,
            timestamp: non_empty(wire.timestamp),
        })
    }
}

impl From<MessageRecord> for WireMessage {
    fn from(record: MessageRecord) -> Self {
        let mut wire = WireMessage {
            username: record.username,
            kind: record.body.kind().as_str().to_string(),
            message: record.message,
            timestamp: record.timestamp,
            ..WireMessage::default()
        };
        match record.body {
            MessageBody::Normal => {}
            MessageBody::Movie { movie_url } => wire.movie_url = Some(movie_url),
            MessageBody::AiChat {
                ai_message,
                ai_reply,
            } => {
                wire.ai_message = Some(ai_message);
                wire.ai_reply = Some(ai_reply);
            }
        }
        wire
    }
}

fn required(
    kind: MessageKind,
    field: &'static str,
    value: Option<String>,
) -> Result<String, ProtocolError> {
    value.ok_or(ProtocolError::MissingField { kind, field })
}

// Servers send an empty string when the sender supplied no timestamp.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Entry of `GET /api/servers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSummary {
    pub name: String,
    pub url: String,
}

/// Response of `GET /api/check_username`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameCheckResponse {
    pub exists: bool,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
