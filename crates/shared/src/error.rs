use thiserror::Error;

use crate::domain::MessageKind;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),
    #[error("invalid payload for event `{event}`: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode event `{event}`: {source}")]
    Encode {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} message is missing required field `{field}`", kind.as_str())]
    MissingField {
        kind: MessageKind,
        field: &'static str,
    },
    #[error("unknown message type `{0}`")]
    UnknownMessageType(String),
}
