use std::sync::Arc;

use shared::{domain::ConnectionState, protocol::ClientRequest};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    identity::SessionContext,
    transport::{Transport, TransportConnector, TransportError, TransportEvent},
};

/// Owns the single connection of a chat page and its lifecycle.
///
/// `unconnected -> connecting -> joined` on the happy path. `rejected` and
/// `disconnected` are terminal; nothing reconnects.
pub struct TransportSession {
    context: SessionContext,
    connector: Arc<dyn TransportConnector>,
    transport: Option<Box<dyn Transport>>,
    state: ConnectionState,
    link_up: bool,
    join_sent: bool,
    closing: bool,
}

impl TransportSession {
    pub fn new(context: SessionContext, connector: Arc<dyn TransportConnector>) -> Self {
        Self {
            context,
            connector,
            transport: None,
            state: ConnectionState::Unconnected,
            link_up: false,
            join_sent: false,
            closing: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// True while the underlying transport reports an open link.
    pub fn is_link_up(&self) -> bool {
        self.link_up && self.transport.is_some()
    }

    pub fn join_sent(&self) -> bool {
        self.join_sent
    }

    /// A close was requested and the transport has not confirmed it yet.
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub fn connect(&mut self, events: mpsc::Sender<TransportEvent>) -> Result<(), TransportError> {
        if self.state != ConnectionState::Unconnected {
            warn!(state = ?self.state, "connect ignored: session already started");
            return Ok(());
        }

        match self.connector.open(self.context.server_url(), events) {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = ConnectionState::Connecting;
                info!(
                    server = %self.context.server_url(),
                    username = %self.context.identity(),
                    "connecting to chat server"
                );
                Ok(())
            }
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                Err(err)
            }
        }
    }

    /// Transport-level connect: request to join with the session identity.
    pub fn on_transport_connected(&mut self) {
        if self.state != ConnectionState::Connecting {
            warn!(state = ?self.state, "transport connected outside of connecting state");
            return;
        }
        self.link_up = true;
        let join = ClientRequest::JoinRoom {
            username: self.context.identity().clone(),
        };
        self.join_sent = self.send(&join);
    }

    pub fn on_join_success(&mut self) {
        match self.state {
            ConnectionState::Connecting => {
                self.state = ConnectionState::Joined;
                info!(username = %self.context.identity(), "joined chat room");
            }
            ConnectionState::Joined => debug!("duplicate join_success ignored"),
            other => warn!(state = ?other, "join_success ignored"),
        }
    }

    pub fn on_join_error(&mut self) {
        if self.state != ConnectionState::Connecting {
            warn!(state = ?self.state, "join_error ignored");
            return;
        }
        self.state = ConnectionState::Rejected;
        self.teardown();
    }

    pub fn on_transport_disconnected(&mut self) {
        self.link_up = false;
        self.closing = false;
        self.transport = None;
        if !self.state.is_terminal() {
            self.state = ConnectionState::Disconnected;
        }
    }

    /// Transmits one event. Events are dropped, not queued, while the link is
    /// down.
    pub fn send(&mut self, request: &ClientRequest) -> bool {
        let Some(transport) = self.transport.as_ref().filter(|_| self.link_up) else {
            debug!(event = request.name(), state = ?self.state, "dropping outbound event: transport is down");
            return false;
        };

        let frame = match request.to_frame() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(event = request.name(), "failed to encode outbound event: {err}");
                return false;
            }
        };

        match transport.send_text(frame) {
            Ok(()) => {
                debug!(event = request.name(), "outbound event sent");
                true
            }
            Err(err) => {
                warn!(event = request.name(), "outbound event dropped: {err}");
                false
            }
        }
    }

    /// Best-effort leave notice, then close. Used for logout and unload.
    pub fn disconnect(&mut self) {
        if self.is_link_up() {
            self.send(&ClientRequest::LeaveRoom);
        }
        self.teardown();
        if !self.state.is_terminal() {
            self.state = ConnectionState::Disconnected;
        }
    }

    fn teardown(&mut self) {
        self.link_up = false;
        if let Some(transport) = self.transport.take() {
            match transport.close() {
                Ok(()) => self.closing = true,
                Err(err) => debug!("transport close skipped: {err}"),
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
