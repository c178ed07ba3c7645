//! Client side of the chat room: identity, connection lifecycle, inbound
//! event routing, rendering and the compose field, plus the entry screen
//! collaborator.

pub mod config;
pub mod identity;
pub mod input;
pub mod login;
pub mod navigation;
pub mod page;
pub mod render;
pub mod roster;
pub mod router;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use config::{load_settings, ClientSettings};
pub use identity::{resolve_identity, SessionContext};
pub use login::{HttpLoginApi, LoginClient};
pub use navigation::Navigation;
pub use page::{ChatPage, PageLoad, PageObserver, UiAction};
pub use transport::WsConnector;
